//! Session error types.

use thiserror::Error;

use hoopcam_critique::CritiqueError;
use hoopcam_detect::DetectError;
use hoopcam_models::SessionId;

pub type SessionResult<T> = Result<T, SessionError>;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session {0} is already active")]
    SessionAlreadyActive(SessionId),

    #[error("No active session")]
    NoActiveSession,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid frame input: {0}")]
    InvalidInput(String),

    #[error("Detection error: {0}")]
    Detect(#[from] DetectError),

    #[error("Critique error: {0}")]
    Critique(#[from] CritiqueError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SessionError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an input parse error.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Caller errors are rejected outright and never retried.
    pub fn is_caller_error(&self) -> bool {
        matches!(self, Self::SessionAlreadyActive(_) | Self::NoActiveSession)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_already_active_names_session() {
        let id = SessionId::from_string("abc");
        let err = SessionError::SessionAlreadyActive(id);
        assert_eq!(err.to_string(), "Session abc is already active");
        assert!(err.is_caller_error());
    }

    #[test]
    fn test_detect_error_converts() {
        let err: SessionError = DetectError::invalid_config("fps must be positive").into();
        assert!(matches!(err, SessionError::Detect(_)));
        assert!(!err.is_caller_error());
    }
}
