#![deny(unreachable_patterns)]
//! Streaming basketball shot detection.
//!
//! This crate provides the single-threaded detection path:
//! - Landmark adapter (raw pose output to fixed-shape keypoint records)
//! - Motion feature extraction (elbow angle, wrist velocity, extension)
//! - Shot state machine with thresholds, hysteresis and refractory timing
//! - Pre-roll ring buffer and segment recorder
//! - `ShotPipeline` composing all of the above per frame

pub mod config;
pub mod error;
pub mod features;
pub mod landmarks;
pub mod pipeline;
pub mod recorder;
pub mod state_machine;
pub mod synthetic;

pub use config::{DetectionConfig, ShootingSide};
pub use error::{DetectError, DetectResult};
pub use features::{calculate_elbow_angle, FeatureExtractor};
pub use landmarks::{LandmarkAdapter, RawLandmark, RawPose};
pub use pipeline::{FrameOutcome, Observation, ShotPipeline};
pub use recorder::{SegmentCapture, SegmentRecorder};
pub use state_machine::{
    transition, FeatureWindow, MachineInput, ShotState, ShotStateMachine, Transition,
};
