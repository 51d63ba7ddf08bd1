//! Structured session logging.
//!
//! Lifecycle lines carry the session ID and the operation in progress so a
//! whole training session can be filtered out of interleaved logs.

use tracing::{error, info, warn, Span};

use hoopcam_models::{SessionId, ShotId};

/// Logger bound to one session and operation.
#[derive(Debug, Clone)]
pub struct SessionLogger {
    session_id: String,
    operation: String,
}

impl SessionLogger {
    /// Logger for one session operation.
    pub fn new(session_id: &SessionId, operation: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            operation: operation.to_string(),
        }
    }

    /// Same session, different operation.
    pub fn for_operation(&self, operation: &str) -> Self {
        Self {
            session_id: self.session_id.clone(),
            operation: operation.to_string(),
        }
    }

    /// Log the start of the operation.
    pub fn log_start(&self, message: &str) {
        info!(
            session_id = %self.session_id,
            operation = %self.operation,
            "Session started: {}", message
        );
    }

    /// Log an intermediate step.
    pub fn log_progress(&self, message: &str) {
        info!(
            session_id = %self.session_id,
            operation = %self.operation,
            "Session progress: {}", message
        );
    }

    /// Progress line about a single shot.
    pub fn log_shot(&self, shot_id: ShotId, message: &str) {
        info!(
            session_id = %self.session_id,
            operation = %self.operation,
            shot_id = shot_id.value(),
            "Shot {}: {}", shot_id, message
        );
    }

    /// Log a recoverable problem.
    pub fn log_warning(&self, message: &str) {
        warn!(
            session_id = %self.session_id,
            operation = %self.operation,
            "Session warning: {}", message
        );
    }

    /// Log a failure.
    pub fn log_error(&self, message: &str) {
        error!(
            session_id = %self.session_id,
            operation = %self.operation,
            "Session error: {}", message
        );
    }

    /// Log successful completion.
    pub fn log_completion(&self, message: &str) {
        info!(
            session_id = %self.session_id,
            operation = %self.operation,
            "Session completed: {}", message
        );
    }

    /// Session this logger reports for.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Operation name attached to every entry.
    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Span carrying the session ID and operation.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "session",
            session_id = %self.session_id,
            operation = %self.operation
        )
    }
}
