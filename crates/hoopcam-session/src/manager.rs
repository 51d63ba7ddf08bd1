//! Session lifecycle.
//!
//! At most one session is active per manager. Starting a session builds a
//! fresh detection pipeline and aggregator, so nothing carries over from the
//! previous session. Ending one finishes the pipeline, closes the session and
//! hands back a [`ClosedSession`] whose critiques may still be in flight.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::aggregator::{lock_session, SessionAggregator, SharedSession};
use crate::config::SessionConfig;
use crate::error::{SessionError, SessionResult};
use crate::logging::SessionLogger;
use hoopcam_critique::{CritiqueError, CritiqueService};
use hoopcam_detect::{FrameOutcome, Observation, ShotPipeline};
use hoopcam_models::{Frame, Session, SessionId, SessionSummary, ShotEvent, ShotId, ShotPhase};

/// What feeding one frame (or interruption) did.
#[derive(Debug, Default)]
pub struct FrameReport {
    pub phase: ShotPhase,
    pub events: Vec<ShotEvent>,
    /// Shots recorded because a segment finalized on this frame
    pub shots: Vec<ShotId>,
}

struct ActiveSession {
    session: SharedSession,
    session_id: SessionId,
    pipeline: ShotPipeline,
    aggregator: SessionAggregator,
    logger: SessionLogger,
    frames: u64,
}

impl ActiveSession {
    fn absorb(&mut self, outcome: FrameOutcome) -> FrameReport {
        let shots = outcome
            .captures
            .into_iter()
            .map(|capture| self.aggregator.record_shot(capture))
            .collect();
        FrameReport {
            phase: outcome.phase,
            events: outcome.events,
            shots,
        }
    }
}

/// Owns the active session and its detection path.
pub struct SessionManager {
    config: SessionConfig,
    service: Arc<dyn CritiqueService>,
    runtime: Handle,
    active: Option<ActiveSession>,
    last_closed: Option<SharedSession>,
}

impl SessionManager {
    /// Create a manager that spawns critique tasks on the current Tokio runtime.
    pub fn new(config: SessionConfig, service: Arc<dyn CritiqueService>) -> SessionResult<Self> {
        let runtime = Handle::try_current()
            .map_err(|e| SessionError::config(format!("no Tokio runtime available: {}", e)))?;
        Self::with_runtime(config, service, runtime)
    }

    /// Manager dispatching critiques on an existing runtime.
    pub fn with_runtime(
        config: SessionConfig,
        service: Arc<dyn CritiqueService>,
        runtime: Handle,
    ) -> SessionResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            service,
            runtime,
            active: None,
            last_closed: None,
        })
    }

    /// Active configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Whether a session is open.
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// ID of the open session.
    pub fn active_session_id(&self) -> Option<&SessionId> {
        self.active.as_ref().map(|a| &a.session_id)
    }

    /// Most recently closed session, retained so late critiques can attach.
    pub fn last_closed(&self) -> Option<SharedSession> {
        self.last_closed.clone()
    }

    /// Start a new session. Rejected while another session is active.
    pub fn start_session(&mut self) -> SessionResult<SessionId> {
        if let Some(active) = &self.active {
            warn!(session_id = %active.session_id, "Rejected start: session already active");
            return Err(SessionError::SessionAlreadyActive(active.session_id.clone()));
        }

        let session_id = SessionId::new();
        let pipeline = ShotPipeline::new(self.config.detection.clone())?;
        let session: SharedSession = Arc::new(std::sync::Mutex::new(Session::new(session_id.clone())));
        let aggregator = SessionAggregator::new(
            Arc::clone(&session),
            Arc::clone(&self.service),
            self.runtime.clone(),
            &self.config,
        );
        let logger = SessionLogger::new(&session_id, "detection");
        logger.log_start(&format!(
            "critique via {}, timeout {:?}",
            self.service.name(),
            self.config.critique_timeout
        ));

        self.active = Some(ActiveSession {
            session,
            session_id: session_id.clone(),
            pipeline,
            aggregator,
            logger,
            frames: 0,
        });
        Ok(session_id)
    }

    fn active_mut(&mut self) -> SessionResult<&mut ActiveSession> {
        self.active.as_mut().ok_or(SessionError::NoActiveSession)
    }

    /// Feed one frame through the detection path. Never waits on critiques.
    pub fn process_frame(
        &mut self,
        frame: Frame,
        observation: Observation,
    ) -> SessionResult<FrameReport> {
        let active = self.active_mut()?;
        active.frames += 1;
        let outcome = active.pipeline.process(frame, observation);
        for event in &outcome.events {
            debug!(
                session_id = %active.session_id,
                kind = ?event.kind,
                timestamp = event.timestamp,
                "Shot event"
            );
        }
        Ok(active.absorb(outcome))
    }

    /// Report an explicit stream interruption (camera disconnect).
    pub fn interrupt(&mut self, timestamp: f64) -> SessionResult<FrameReport> {
        let active = self.active_mut()?;
        active
            .logger
            .log_warning(&format!("stream interrupted at {:.3}s", timestamp));
        let outcome = active.pipeline.interrupt(timestamp);
        Ok(active.absorb(outcome))
    }

    /// End the active session.
    ///
    /// Finishes the detection path (closing a shot in progress), closes the
    /// session and returns it. Outstanding critiques keep running.
    pub fn end_session(&mut self) -> SessionResult<ClosedSession> {
        let mut active = self.active.take().ok_or(SessionError::NoActiveSession)?;

        let outcome = active.pipeline.finish();
        let tail = active.absorb(outcome);
        if !tail.shots.is_empty() {
            debug!(session_id = %active.session_id, shots = tail.shots.len(), "Shots closed at stream end");
        }

        let (shots, awaiting) = {
            let mut session = lock_session(&active.session);
            session.close();
            (session.shot_count(), session.awaiting_critique().len())
        };
        active.logger.log_completion(&format!(
            "{} frames, {} shots, {} critiques outstanding",
            active.frames, shots, awaiting
        ));

        self.last_closed = Some(Arc::clone(&active.session));
        Ok(ClosedSession {
            session: active.session,
            tasks: active.aggregator.into_tasks(),
            service: Arc::clone(&self.service),
            logger: active.logger.for_operation("report"),
        })
    }
}

/// A session that has ended. Critique tasks may still be running.
pub struct ClosedSession {
    session: SharedSession,
    tasks: Vec<JoinHandle<()>>,
    service: Arc<dyn CritiqueService>,
    logger: SessionLogger,
}

impl ClosedSession {
    /// ID of the closed session.
    pub fn session_id(&self) -> SessionId {
        lock_session(&self.session).session_id.clone()
    }

    /// Shared session state.
    pub fn shared(&self) -> &SharedSession {
        &self.session
    }

    /// Snapshot of the session report as of now.
    pub fn summary(&self) -> SessionSummary {
        lock_session(&self.session).summary()
    }

    /// Critique tasks not yet joined.
    pub fn outstanding(&self) -> usize {
        self.tasks.iter().filter(|t| !t.is_finished()).count()
    }

    /// Wait up to `timeout` for outstanding critiques and return the shots
    /// still awaiting one. A zero timeout abandons them; either way unfinished
    /// calls keep running in the background and attach when they land.
    pub async fn wait_for_critiques(&mut self, timeout: Duration) -> Vec<ShotId> {
        if !timeout.is_zero() && !self.tasks.is_empty() {
            let all = join_all(self.tasks.iter_mut());
            match tokio::time::timeout(timeout, all).await {
                Ok(results) => {
                    for result in results.into_iter().filter_map(Result::err) {
                        self.logger.log_error(&format!("critique task failed: {}", result));
                    }
                }
                Err(_) => self
                    .logger
                    .log_warning(&format!("stopped waiting for critiques after {:?}", timeout)),
            }
        }
        self.tasks.retain(|t| !t.is_finished());

        let awaiting = lock_session(&self.session).awaiting_critique();
        if !awaiting.is_empty() {
            info!(
                session_id = %self.logger.session_id(),
                awaiting = awaiting.len(),
                "Reporting with critiques outstanding"
            );
        }
        awaiting
    }

    /// Ask the critique service for an overall coaching summary of the
    /// resolved critiques and store it on the session.
    ///
    /// Returns `None` when no shot has a critique yet.
    pub async fn request_coaching_summary(&self, timeout: Duration) -> SessionResult<Option<String>> {
        let critiques = lock_session(&self.session).critiques();
        if critiques.is_empty() {
            return Ok(None);
        }

        let text = tokio::time::timeout(timeout, self.service.summarize_session(&critiques))
            .await
            .map_err(|_| CritiqueError::Timeout(timeout.as_secs()))??;

        lock_session(&self.session).coaching_summary = Some(text.clone());
        self.logger
            .log_progress(&format!("coaching summary over {} critiques", critiques.len()));
        Ok(Some(text))
    }
}
