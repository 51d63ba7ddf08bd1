//! Shared data models for HoopCam.
//!
//! This crate provides Serde-serializable types for:
//! - Pose keypoints and video frames
//! - Derived motion features and shot events
//! - Captured shot segments
//! - Shot records, sessions and session summaries

pub mod feature;
pub mod frame;
pub mod keypoint;
pub mod segment;
pub mod session;
pub mod shot;
pub mod timestamp;

// Re-export common types
pub use feature::{FeatureSample, FeatureSummary};
pub use frame::Frame;
pub use keypoint::{ArmSide, BodyPart, Keypoint, KeypointRecord};
pub use segment::{Segment, SegmentRef};
pub use session::{Session, SessionId, SessionSummary};
pub use shot::{
    CritiqueStatus, ShotEvent, ShotEventKind, ShotId, ShotOutcome, ShotPhase, ShotRecord,
};
pub use timestamp::{format_range, format_seconds, frame_interval};
