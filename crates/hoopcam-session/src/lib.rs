//! Training session orchestration for HoopCam.
//!
//! This crate provides:
//! - `SessionManager`: one active session at a time, fresh detection state per session
//! - `SessionAggregator`: shot records and off-path critique dispatch
//! - Critique timeouts and bounded retries
//! - JSON Lines frame input for the `hoopcam` binary

pub mod aggregator;
pub mod config;
pub mod error;
pub mod input;
pub mod logging;
pub mod manager;
pub mod retry;

pub use aggregator::{apply_outcome, lock_session, CritiqueOutcome, SessionAggregator, SharedSession};
pub use config::{clamp_critique_timeout, SessionConfig};
pub use error::{SessionError, SessionResult};
pub use input::{parse_line, FrameInput, FrameLine};
pub use logging::SessionLogger;
pub use manager::{ClosedSession, FrameReport, SessionManager};
pub use retry::{retry_async, RetryOutcome, RetryPolicy};
