//! Session configuration.

use std::path::Path;
use std::time::Duration;

use crate::error::{SessionError, SessionResult};
use hoopcam_detect::DetectionConfig;

/// Shortest critique timeout accepted from the environment.
pub const MIN_CRITIQUE_TIMEOUT_SECS: u64 = 10;
/// Longest critique timeout accepted from the environment.
pub const MAX_CRITIQUE_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    // =========================================================================
    // Critique dispatch
    // =========================================================================
    /// Wall-clock bound on one shot's critique, retries included
    pub critique_timeout: Duration,

    /// Retries after the first failed critique attempt
    pub critique_retries: u32,

    /// Base delay for exponential backoff between attempts
    pub retry_base_delay: Duration,

    /// Cap on a single backoff delay
    pub retry_max_delay: Duration,

    // =========================================================================
    // Session end
    // =========================================================================
    /// How long session-end reporting waits for outstanding critiques
    pub drain_timeout: Duration,

    /// Bound on the end-of-session coaching summary call
    pub summary_timeout: Duration,

    // =========================================================================
    // Detection
    // =========================================================================
    pub detection: DetectionConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            critique_timeout: Duration::from_secs(20),
            critique_retries: 2,
            retry_base_delay: Duration::from_millis(500),
            retry_max_delay: Duration::from_secs(5),
            drain_timeout: Duration::from_secs(30),
            summary_timeout: Duration::from_secs(30),
            detection: DetectionConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Load from environment variables, falling back to defaults.
    pub fn from_env() -> SessionResult<Self> {
        let defaults = Self::default();

        let critique_timeout_secs = std::env::var("HOOPCAM_CRITIQUE_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(clamp_critique_timeout)
            .unwrap_or(defaults.critique_timeout.as_secs());

        let critique_retries = std::env::var("HOOPCAM_CRITIQUE_RETRIES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.critique_retries);

        let retry_base_delay_ms = std::env::var("HOOPCAM_RETRY_BASE_DELAY_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.retry_base_delay.as_millis() as u64);

        let drain_timeout_secs = std::env::var("HOOPCAM_DRAIN_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.drain_timeout.as_secs());

        let detection = DetectionConfig::from_env()?;

        Ok(Self {
            critique_timeout: Duration::from_secs(critique_timeout_secs),
            critique_retries,
            retry_base_delay: Duration::from_millis(retry_base_delay_ms),
            drain_timeout: Duration::from_secs(drain_timeout_secs),
            detection,
            ..defaults
        })
    }

    /// Replace detection thresholds from a JSON file.
    pub fn with_detection_file(mut self, path: impl AsRef<Path>) -> SessionResult<Self> {
        self.detection = DetectionConfig::from_json_file(path)?;
        Ok(self)
    }

    /// Replace the detection config.
    pub fn with_detection(mut self, detection: DetectionConfig) -> Self {
        self.detection = detection;
        self
    }

    /// Set the critique timeout as given. Environment values are clamped,
    /// this is not.
    pub fn with_critique_timeout(mut self, timeout: Duration) -> Self {
        self.critique_timeout = timeout;
        self
    }

    /// Set retry count and base backoff.
    pub fn with_retries(mut self, retries: u32, base_delay: Duration) -> Self {
        self.critique_retries = retries;
        self.retry_base_delay = base_delay;
        self
    }

    /// Set how long close waits for critiques.
    pub fn with_drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    /// Check the session and detection settings.
    pub fn validate(&self) -> SessionResult<()> {
        if self.critique_timeout.is_zero() {
            return Err(SessionError::config("critique timeout must be positive"));
        }
        if self.retry_max_delay < self.retry_base_delay {
            return Err(SessionError::config(
                "retry max delay must not be below the base delay",
            ));
        }
        self.detection.validate()?;
        Ok(())
    }
}

/// Keep an operator-supplied timeout inside the supported range.
pub fn clamp_critique_timeout(secs: u64) -> u64 {
    secs.clamp(MIN_CRITIQUE_TIMEOUT_SECS, MAX_CRITIQUE_TIMEOUT_SECS)
}
