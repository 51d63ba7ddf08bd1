//! Session aggregator.
//!
//! Turns finalized segments into shot records and dispatches each shot's
//! critique as an independent task. The detection path only ever takes the
//! session lock for the short insert; critique tasks take it once, when they
//! settle, and match the result back by shot ID.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn, Instrument};

use crate::config::SessionConfig;
use crate::logging::SessionLogger;
use crate::retry::{retry_async, RetryOutcome, RetryPolicy};
use hoopcam_critique::{CritiqueError, CritiqueRequest, CritiqueResponse, CritiqueService};
use hoopcam_detect::SegmentCapture;
use hoopcam_models::{CritiqueStatus, Session, ShotId, ShotRecord};

/// Session state shared between the detection path and critique tasks.
pub type SharedSession = Arc<Mutex<Session>>;

/// Lock a session, recovering the data if a critique task panicked.
pub fn lock_session(session: &Mutex<Session>) -> MutexGuard<'_, Session> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

/// How a critique call ended.
#[derive(Debug, Clone, PartialEq)]
pub enum CritiqueOutcome {
    Resolved(CritiqueResponse),
    Failed { reason: String, attempts: u32 },
    TimedOut { after: Duration },
}

impl CritiqueOutcome {
    fn from_attempt(
        attempt: Result<RetryOutcome<CritiqueResponse, CritiqueError>, tokio::time::error::Elapsed>,
        after: Duration,
    ) -> Self {
        match attempt {
            Ok(RetryOutcome::Success { value, .. }) => CritiqueOutcome::Resolved(value),
            Ok(RetryOutcome::Failed { error, attempts }) => CritiqueOutcome::Failed {
                reason: error.to_string(),
                attempts,
            },
            Err(_) => CritiqueOutcome::TimedOut { after },
        }
    }
}

/// Write a critique outcome into its shot record, at most once.
///
/// Returns the label counted under `hoopcam_critiques_total`.
pub fn apply_outcome(session: &mut Session, shot_id: ShotId, outcome: CritiqueOutcome) -> &'static str {
    let session_id = session.session_id.clone();
    let closed = !session.is_active();

    let (written, label) = match outcome {
        CritiqueOutcome::Resolved(response) => {
            if response.shot_id != shot_id {
                warn!(
                    session_id = %session_id,
                    shot_id = shot_id.value(),
                    response_shot_id = response.shot_id.value(),
                    "Critique response carried a different shot ID, keeping the request's"
                );
            }
            (
                session.resolve_critique(shot_id, response.critique_text, response.outcome),
                CritiqueStatus::Resolved.as_str(),
            )
        }
        CritiqueOutcome::Failed { reason, attempts } => {
            warn!(
                session_id = %session_id,
                shot_id = shot_id.value(),
                attempts,
                reason = %reason,
                "Critique failed"
            );
            let status = CritiqueStatus::Failed { reason };
            let label = status.as_str();
            (session.fail_critique(shot_id, status), label)
        }
        CritiqueOutcome::TimedOut { after } => {
            warn!(
                session_id = %session_id,
                shot_id = shot_id.value(),
                timeout_secs = after.as_secs_f64(),
                "Critique timed out"
            );
            let status = CritiqueStatus::TimedOut {
                after_secs: after.as_secs(),
            };
            let label = status.as_str();
            (session.fail_critique(shot_id, status), label)
        }
    };

    if !written {
        warn!(
            session_id = %session_id,
            shot_id = shot_id.value(),
            "Critique result ignored: shot unknown or already settled"
        );
        return "ignored";
    }

    if closed {
        info!(
            session_id = %session_id,
            shot_id = shot_id.value(),
            status = label,
            "Late critique attached to closed session"
        );
    } else {
        debug!(session_id = %session_id, shot_id = shot_id.value(), status = label, "Critique settled");
    }
    label
}

/// Per-session shot bookkeeping and critique dispatch.
pub struct SessionAggregator {
    session: SharedSession,
    service: Arc<dyn CritiqueService>,
    runtime: Handle,
    critique_timeout: Duration,
    retry: RetryPolicy,
    tasks: Vec<JoinHandle<()>>,
    logger: SessionLogger,
}

impl SessionAggregator {
    /// Aggregator for one session, dispatching critiques on `runtime`.
    pub fn new(
        session: SharedSession,
        service: Arc<dyn CritiqueService>,
        runtime: Handle,
        config: &SessionConfig,
    ) -> Self {
        let logger = SessionLogger::new(&lock_session(&session).session_id, "critique");
        Self {
            session,
            service,
            runtime,
            critique_timeout: config.critique_timeout,
            retry: RetryPolicy::from_config(config),
            tasks: Vec::new(),
            logger,
        }
    }

    /// Shared session state.
    pub fn session(&self) -> &SharedSession {
        &self.session
    }

    /// Record a finalized segment as the next shot and dispatch its critique.
    pub fn record_shot(&mut self, capture: SegmentCapture) -> ShotId {
        let request = {
            let mut session = lock_session(&self.session);
            let shot_id = session.next_shot_id();
            let summary = capture.summary.clone();
            let segment = Arc::new(capture.into_segment(shot_id));
            let record = ShotRecord::new(shot_id, segment.to_ref(), summary.clone());
            session.insert(record, Arc::clone(&segment));

            CritiqueRequest {
                session_id: session.session_id.clone(),
                shot_id,
                segment,
                summary,
            }
        };

        let shot_id = request.shot_id;
        self.logger.log_shot(
            shot_id,
            &format!(
                "recorded {} frames, {}",
                request.segment.frame_count(),
                request.summary.describe()
            ),
        );
        self.dispatch(request);
        shot_id
    }

    fn dispatch(&mut self, request: CritiqueRequest) {
        let session: Weak<Mutex<Session>> = Arc::downgrade(&self.session);
        let service = Arc::clone(&self.service);
        let policy = self.retry.clone();
        let timeout = self.critique_timeout;
        let shot_id = request.shot_id;

        debug!(
            session_id = %self.logger.session_id(),
            shot_id = shot_id.value(),
            service = service.name(),
            "Dispatching critique"
        );

        let span = self.logger.create_span();
        let task = async move {
            let attempt = retry_async(
                &policy,
                "critique",
                || service.critique(request.clone()),
                CritiqueError::is_retryable,
            );
            let outcome =
                CritiqueOutcome::from_attempt(tokio::time::timeout(timeout, attempt).await, timeout);

            let Some(session) = session.upgrade() else {
                warn!(
                    shot_id = shot_id.value(),
                    "Critique arrived after the session was released, discarded"
                );
                metrics::counter!("hoopcam_critiques_total", "status" => "discarded").increment(1);
                return;
            };
            let label = apply_outcome(&mut lock_session(&session), shot_id, outcome);
            metrics::counter!("hoopcam_critiques_total", "status" => label).increment(1);
        };

        self.tasks.push(self.runtime.spawn(task.instrument(span)));
    }

    /// Critique tasks not yet finished.
    pub fn outstanding(&self) -> usize {
        self.tasks.iter().filter(|t| !t.is_finished()).count()
    }

    /// Hand over the outstanding critique tasks.
    pub fn into_tasks(self) -> Vec<JoinHandle<()>> {
        self.tasks
    }
}
