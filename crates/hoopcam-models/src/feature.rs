//! Derived motion features.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{ArmSide, KeypointRecord};

/// Scalar motion signals derived for one frame.
///
/// Timestamps are monotonically increasing across a stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FeatureSample {
    /// Index of the originating video frame
    pub frame_index: u64,
    /// Video timestamp in seconds
    pub timestamp: f64,
    /// Shooting arm
    pub side: ArmSide,
    /// Interior elbow angle in degrees (180 = straight)
    pub elbow_angle: f64,
    /// Upward wrist velocity in body-scale units per second
    pub wrist_velocity: f64,
    /// Wrist-to-shoulder distance divided by body scale
    pub extension: f64,
    /// Height of the wrist above the shoulder, in body-scale units
    pub wrist_height: f64,
    /// Body-scale reference used for normalization (normalized image units)
    pub body_scale: f64,
    /// Keypoints the sample was derived from
    pub keypoints: Arc<KeypointRecord>,
}

/// Feature highlights of one detected shot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FeatureSummary {
    /// Shooting arm
    pub side: ArmSide,
    /// Release (shot start) timestamp in seconds
    pub release_time: f64,
    /// Shot end timestamp in seconds
    pub end_time: f64,
    /// End minus release, in seconds
    pub duration_secs: f64,
    /// Elbow angle at the release sample (degrees)
    pub release_elbow_angle: f64,
    /// Deepest elbow bend during the windup (degrees)
    pub min_windup_elbow_angle: f64,
    /// Peak upward wrist velocity
    pub peak_wrist_velocity: f64,
    /// Peak extension score
    pub peak_extension: f64,
}

impl FeatureSummary {
    /// Short human-readable description for prompts and logs.
    pub fn describe(&self) -> String {
        format!(
            "{} arm, release elbow {:.0}°, deepest load {:.0}°, peak wrist speed {:.2}/s, peak extension {:.2}, duration {:.2}s",
            self.side,
            self.release_elbow_angle,
            self.min_windup_elbow_angle,
            self.peak_wrist_velocity,
            self.peak_extension,
            self.duration_secs
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_mentions_key_numbers() {
        let summary = FeatureSummary {
            side: ArmSide::Right,
            release_time: 5.0,
            end_time: 5.8,
            duration_secs: 0.8,
            release_elbow_angle: 95.0,
            min_windup_elbow_angle: 45.0,
            peak_wrist_velocity: 3.0,
            peak_extension: 2.3,
        };
        let text = summary.describe();
        assert!(text.starts_with("right arm"));
        assert!(text.contains("45°"));
        assert!(text.contains("0.80s"));
    }
}
