//! Error types for the detection path.
//!
//! Nothing here is fatal to a session: every variant degrades to skipping
//! the current frame's contribution.

use hoopcam_models::BodyPart;
use thiserror::Error;

/// Result type for detection operations.
pub type DetectResult<T> = Result<T, DetectError>;

/// Errors that can occur while turning frames into shot events.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DetectError {
    #[error("Landmark missing: {part} (confidence {confidence:.2})")]
    LandmarkMissing { part: BodyPart, confidence: f64 },

    #[error("Insufficient history: {have} of {need} frames since last gap")]
    InsufficientHistory { have: usize, need: usize },

    #[error("Stream interrupted: {gap_secs:.3}s without a valid sample")]
    StreamInterrupted { gap_secs: f64 },

    #[error("Non-monotonic timestamp: {current:.4}s after {previous:.4}s")]
    NonMonotonicTimestamp { previous: f64, current: f64 },

    #[error("Invalid detection config: {0}")]
    InvalidConfig(String),
}

impl DetectError {
    /// Create a missing-landmark error.
    pub fn landmark_missing(part: BodyPart, confidence: f64) -> Self {
        Self::LandmarkMissing { part, confidence }
    }

    /// Create an invalid-config error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Expected warm-up condition rather than a failure.
    pub fn is_transient(&self) -> bool {
        matches!(self, DetectError::InsufficientHistory { .. })
    }

    /// Per-frame failures the pipeline absorbs as a gap or skipped frame.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, DetectError::InvalidConfig(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let missing = DetectError::landmark_missing(BodyPart::RightWrist, 0.2);
        assert!(missing.is_recoverable());
        assert!(!missing.is_transient());
        assert_eq!(missing.to_string(), "Landmark missing: right_wrist (confidence 0.20)");

        let warmup = DetectError::InsufficientHistory { have: 1, need: 3 };
        assert!(warmup.is_transient());

        assert!(!DetectError::invalid_config("bad").is_recoverable());
    }
}
