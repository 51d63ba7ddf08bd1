//! Landmark adapter.
//!
//! Converts the raw landmark list of a pose estimator (MediaPipe Pose
//! layout) into a fixed-shape [`KeypointRecord`] for the tracked arm.
//! Frames where the shooting arm cannot be resolved with enough confidence
//! are reported as [`DetectError::LandmarkMissing`]; the pipeline turns
//! those into low-confidence markers rather than failing.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::trace;

use crate::config::{DetectionConfig, ShootingSide};
use crate::error::{DetectError, DetectResult};
use hoopcam_models::{ArmSide, BodyPart, Keypoint, KeypointRecord};

/// One landmark as emitted by the pose estimator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawLandmark {
    /// Pose-model landmark index
    pub index: u32,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub z: f64,
    /// Visibility / presence score (0.0-1.0)
    #[serde(alias = "visibility")]
    pub confidence: f64,
}

impl RawLandmark {
    /// Landmark at normalized image coordinates.
    pub fn new(index: u32, x: f64, y: f64, confidence: f64) -> Self {
        Self {
            index,
            x,
            y,
            z: 0.0,
            confidence,
        }
    }
}

/// Raw pose estimator output for one frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawPose {
    pub landmarks: Vec<RawLandmark>,
}

impl RawPose {
    /// Pose from estimator landmarks, in any order.
    pub fn new(landmarks: Vec<RawLandmark>) -> Self {
        Self { landmarks }
    }

    /// Highest-confidence landmark for a body part.
    fn find(&self, part: BodyPart) -> Option<&RawLandmark> {
        let index = part.mediapipe_index();
        self.landmarks
            .iter()
            .filter(|l| l.index == index)
            .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
    }
}

/// Maps raw landmarks to keypoint records for the shooting arm.
#[derive(Debug, Clone)]
pub struct LandmarkAdapter {
    min_confidence: f64,
    side: ShootingSide,
}

impl LandmarkAdapter {
    /// Adapter with a confidence floor and arm preference.
    pub fn new(min_confidence: f64, side: ShootingSide) -> Self {
        Self {
            min_confidence,
            side,
        }
    }

    /// Adapter configured from a detection config.
    pub fn from_config(config: &DetectionConfig) -> Self {
        Self::new(config.min_landmark_confidence, config.shooting_side)
    }

    /// Build a keypoint record for one frame.
    ///
    /// In `Auto` mode the right arm is preferred and the left arm is used
    /// when any right-arm landmark is below the confidence threshold. The
    /// reported error names the weakest landmark of the first candidate.
    pub fn adapt(
        &self,
        frame_index: u64,
        timestamp: f64,
        pose: &RawPose,
    ) -> DetectResult<KeypointRecord> {
        let mut first_error = None;

        for &side in self.side.candidates() {
            match self.check_side(pose, side) {
                Ok(()) => {
                    return Ok(KeypointRecord {
                        frame_index,
                        timestamp,
                        side,
                        points: self.confident_points(pose),
                    });
                }
                Err(e) => {
                    trace!(frame_index, side = %side, error = %e, "Arm not resolved");
                    first_error.get_or_insert(e);
                }
            }
        }

        Err(first_error.unwrap_or(DetectError::LandmarkMissing {
            part: ArmSide::Right.wrist(),
            confidence: 0.0,
        }))
    }

    fn check_side(&self, pose: &RawPose, side: ArmSide) -> DetectResult<()> {
        let weakest = side
            .required_parts()
            .into_iter()
            .map(|part| (part, pose.find(part).map(|l| l.confidence).unwrap_or(0.0)))
            .min_by(|a, b| a.1.total_cmp(&b.1));

        match weakest {
            Some((part, confidence)) if confidence < self.min_confidence => {
                Err(DetectError::landmark_missing(part, confidence))
            }
            _ => Ok(()),
        }
    }

    fn confident_points(&self, pose: &RawPose) -> BTreeMap<BodyPart, Keypoint> {
        BodyPart::ALL
            .into_iter()
            .filter_map(|part| {
                pose.find(part)
                    .filter(|l| l.confidence >= self.min_confidence)
                    .map(|l| {
                        (
                            part,
                            Keypoint {
                                x: l.x,
                                y: l.y,
                                z: l.z,
                                confidence: l.confidence,
                            },
                        )
                    })
            })
            .collect()
    }
}
