//! Pose keypoint models.
//!
//! Indices follow the MediaPipe Pose 33-landmark layout; only the landmarks
//! used for shooting-form analysis are named.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Tracked anatomical landmark.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum BodyPart {
    Nose,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftHip,
    RightHip,
}

impl BodyPart {
    /// All named parts, in MediaPipe index order.
    pub const ALL: [BodyPart; 9] = [
        BodyPart::Nose,
        BodyPart::LeftShoulder,
        BodyPart::RightShoulder,
        BodyPart::LeftElbow,
        BodyPart::RightElbow,
        BodyPart::LeftWrist,
        BodyPart::RightWrist,
        BodyPart::LeftHip,
        BodyPart::RightHip,
    ];

    /// MediaPipe Pose landmark index.
    pub fn mediapipe_index(&self) -> u32 {
        match self {
            BodyPart::Nose => 0,
            BodyPart::LeftShoulder => 11,
            BodyPart::RightShoulder => 12,
            BodyPart::LeftElbow => 13,
            BodyPart::RightElbow => 14,
            BodyPart::LeftWrist => 15,
            BodyPart::RightWrist => 16,
            BodyPart::LeftHip => 23,
            BodyPart::RightHip => 24,
        }
    }

    /// Look up a part by MediaPipe landmark index.
    pub fn from_mediapipe_index(index: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.mediapipe_index() == index)
    }

    /// Snake-case name used in logs and JSON.
    pub fn as_str(&self) -> &'static str {
        match self {
            BodyPart::Nose => "nose",
            BodyPart::LeftShoulder => "left_shoulder",
            BodyPart::RightShoulder => "right_shoulder",
            BodyPart::LeftElbow => "left_elbow",
            BodyPart::RightElbow => "right_elbow",
            BodyPart::LeftWrist => "left_wrist",
            BodyPart::RightWrist => "right_wrist",
            BodyPart::LeftHip => "left_hip",
            BodyPart::RightHip => "right_hip",
        }
    }
}

impl fmt::Display for BodyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Side of the shooting arm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ArmSide {
    Left,
    Right,
}

impl ArmSide {
    /// Wrist on this side.
    pub fn wrist(&self) -> BodyPart {
        match self {
            ArmSide::Left => BodyPart::LeftWrist,
            ArmSide::Right => BodyPart::RightWrist,
        }
    }

    /// Elbow on this side.
    pub fn elbow(&self) -> BodyPart {
        match self {
            ArmSide::Left => BodyPart::LeftElbow,
            ArmSide::Right => BodyPart::RightElbow,
        }
    }

    /// Shoulder on this side.
    pub fn shoulder(&self) -> BodyPart {
        match self {
            ArmSide::Left => BodyPart::LeftShoulder,
            ArmSide::Right => BodyPart::RightShoulder,
        }
    }

    /// The other arm.
    pub fn opposite(&self) -> ArmSide {
        match self {
            ArmSide::Left => ArmSide::Right,
            ArmSide::Right => ArmSide::Left,
        }
    }

    /// Wrist, elbow and shoulder of this arm.
    pub fn required_parts(&self) -> [BodyPart; 3] {
        [self.wrist(), self.elbow(), self.shoulder()]
    }
}

impl fmt::Display for ArmSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArmSide::Left => write!(f, "left"),
            ArmSide::Right => write!(f, "right"),
        }
    }
}

/// A single landmark position with detector confidence.
///
/// Coordinates are normalized to the frame (0-1), with y growing downward.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Keypoint {
    pub x: f64,
    pub y: f64,
    /// Relative depth (0.0 when the detector is 2D only)
    #[serde(default)]
    pub z: f64,
    /// Detection confidence (0.0-1.0)
    pub confidence: f64,
}

impl Keypoint {
    /// Keypoint in normalized image coordinates.
    pub fn new(x: f64, y: f64, confidence: f64) -> Self {
        Self {
            x,
            y,
            z: 0.0,
            confidence,
        }
    }

    /// 2D Euclidean distance to another keypoint.
    pub fn distance_to(&self, other: &Keypoint) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Fixed-shape keypoint record for one frame.
///
/// Immutable once produced by the landmark adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct KeypointRecord {
    /// Index of the originating video frame
    pub frame_index: u64,
    /// Video timestamp in seconds
    pub timestamp: f64,
    /// Shooting arm the record was resolved for
    pub side: ArmSide,
    /// Confident keypoints by body part
    pub points: BTreeMap<BodyPart, Keypoint>,
}

impl KeypointRecord {
    /// Keypoint for a body part, if present.
    pub fn get(&self, part: BodyPart) -> Option<&Keypoint> {
        self.points.get(&part)
    }

    /// Shooting-side wrist.
    pub fn wrist(&self) -> Option<&Keypoint> {
        self.get(self.side.wrist())
    }

    /// Shooting-side elbow.
    pub fn elbow(&self) -> Option<&Keypoint> {
        self.get(self.side.elbow())
    }

    /// Shooting-side shoulder.
    pub fn shoulder(&self) -> Option<&Keypoint> {
        self.get(self.side.shoulder())
    }

    /// Shoulder on the non-shooting side, if tracked.
    pub fn off_shoulder(&self) -> Option<&Keypoint> {
        self.get(self.side.opposite().shoulder())
    }
}
