//! Critique error types.

use thiserror::Error;

pub type CritiqueResult<T> = Result<T, CritiqueError>;

#[derive(Debug, Error)]
pub enum CritiqueError {
    #[error("Critique timed out after {0}s")]
    Timeout(u64),

    #[error("Critique failed: {0}")]
    Failed(String),

    #[error("Critique API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid critique response: {0}")]
    InvalidResponse(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CritiqueError {
    /// Create a generic failure.
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an unparseable-response error.
    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// Check if a retry could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            CritiqueError::Timeout(_) | CritiqueError::Failed(_) | CritiqueError::Http(_) => true,
            CritiqueError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(CritiqueError::Timeout(20).is_retryable());
        assert!(CritiqueError::failed("connection reset").is_retryable());
        assert!(CritiqueError::Api {
            status: 503,
            message: "overloaded".into()
        }
        .is_retryable());
        assert!(CritiqueError::Api {
            status: 429,
            message: "slow down".into()
        }
        .is_retryable());
        assert!(!CritiqueError::Api {
            status: 400,
            message: "bad request".into()
        }
        .is_retryable());
        assert!(!CritiqueError::config("missing key").is_retryable());
        assert!(!CritiqueError::invalid_response("no text").is_retryable());
    }
}
