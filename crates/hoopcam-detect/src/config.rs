//! Configuration for the shot detection path.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{DetectError, DetectResult};
use hoopcam_models::ArmSide;

/// Which arm to track for the shooting motion.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ShootingSide {
    /// Prefer the right arm, fall back to the left when the right is occluded.
    #[default]
    Auto,
    Left,
    Right,
}

impl ShootingSide {
    /// Arms to try, in preference order.
    pub fn candidates(&self) -> &'static [ArmSide] {
        match self {
            ShootingSide::Auto => &[ArmSide::Right, ArmSide::Left],
            ShootingSide::Left => &[ArmSide::Left],
            ShootingSide::Right => &[ArmSide::Right],
        }
    }
}

/// Configuration for landmark filtering, feature extraction, the shot
/// state machine and segment capture.
///
/// Every threshold is a tunable; none are hard-coded elsewhere. Velocities
/// are in body-scale units per second, extensions in body-scale units,
/// angles in degrees and durations in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    // ============================================
    // Landmark Adapter
    // ============================================
    /// Minimum landmark confidence for a keypoint to be used.
    pub min_landmark_confidence: f64,

    /// Shooting arm selection.
    pub shooting_side: ShootingSide,

    // ============================================
    // Feature Extraction
    // ============================================
    /// Keypoint records kept for finite differencing.
    pub history_len: usize,

    /// Valid records needed after a gap before features are produced.
    pub warmup_frames: usize,

    /// Longest tolerated interval between valid samples before the stream
    /// is treated as interrupted.
    pub max_gap_secs: f64,

    // ============================================
    // Shot State Machine
    // ============================================
    /// Extension must drop below this for the arm to count as loaded.
    pub windup_extension_max: f64,

    /// Elbow angle separating a bent arm from a straight one.
    pub windup_bend_angle: f64,

    /// Recent samples searched for the straight-to-bent crossing.
    pub bend_window: usize,

    /// Consecutive qualifying samples required to enter WINDUP.
    pub debounce_samples: u32,

    /// Upward wrist velocity that marks release.
    pub release_velocity: f64,

    /// Wrist velocity below which the release has peaked.
    /// Must be lower than `release_velocity` (hysteresis).
    pub follow_through_velocity: f64,

    /// Minimum wrist height above the shoulder at release. `None` disables
    /// the gate.
    pub release_min_wrist_height: Option<f64>,

    /// Time the arm must stay settled in FOLLOW_THROUGH before END.
    pub dwell_secs: f64,

    /// Minimum time between END and the next possible WINDUP.
    pub refractory_secs: f64,

    /// WINDUP without a release for this long returns to IDLE.
    pub windup_timeout_secs: f64,

    /// RELEASE without a peak for this long is discarded.
    pub release_timeout_secs: f64,

    // ============================================
    // Segment Capture
    // ============================================
    /// Frames kept before the shot START.
    pub pre_roll_secs: f64,

    /// Frames kept after the shot END.
    pub post_roll_secs: f64,

    /// Nominal capture rate, used to size the pre-roll ring.
    pub fps: f64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            min_landmark_confidence: 0.5,
            shooting_side: ShootingSide::Auto,
            history_len: 6,
            warmup_frames: 3,
            max_gap_secs: 0.25,
            windup_extension_max: 1.2,
            windup_bend_angle: 70.0,
            bend_window: 8,
            debounce_samples: 2,
            release_velocity: 1.5,
            follow_through_velocity: 0.8,
            release_min_wrist_height: Some(0.0),
            dwell_secs: 0.3,
            refractory_secs: 1.0,
            windup_timeout_secs: 1.5,
            release_timeout_secs: 0.8,
            pre_roll_secs: 1.5,
            post_roll_secs: 0.4,
            fps: 30.0,
        }
    }
}

impl DetectionConfig {
    /// Load a config from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> DetectResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            DetectError::invalid_config(format!("failed to read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| DetectError::invalid_config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `HOOPCAM_DETECTION_CONFIG` if set, otherwise defaults.
    pub fn from_env() -> DetectResult<Self> {
        match std::env::var("HOOPCAM_DETECTION_CONFIG") {
            Ok(path) if !path.is_empty() => Self::from_json_file(path),
            _ => Ok(Self::default()),
        }
    }

    /// Restrict detection to one arm.
    pub fn with_shooting_side(mut self, side: ShootingSide) -> Self {
        self.shooting_side = side;
        self
    }

    /// Set the nominal capture rate.
    pub fn with_fps(mut self, fps: f64) -> Self {
        self.fps = fps;
        self
    }

    /// Set pre-roll and post-roll durations.
    pub fn with_rolls(mut self, pre_roll_secs: f64, post_roll_secs: f64) -> Self {
        self.pre_roll_secs = pre_roll_secs;
        self.post_roll_secs = post_roll_secs;
        self
    }

    /// Set the follow-through dwell.
    pub fn with_dwell(mut self, dwell_secs: f64) -> Self {
        self.dwell_secs = dwell_secs;
        self
    }

    /// Set the refractory period after END.
    pub fn with_refractory(mut self, refractory_secs: f64) -> Self {
        self.refractory_secs = refractory_secs;
        self
    }

    /// Frame capacity of the pre-roll ring.
    ///
    /// START is confirmed at most `release_timeout_secs` after its
    /// timestamp, so the ring must reach back that much further than the
    /// pre-roll itself.
    pub fn ring_capacity(&self) -> usize {
        let span = self.pre_roll_secs + self.release_timeout_secs;
        (span * self.fps - 1e-9).ceil().max(0.0) as usize + 2
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> DetectResult<()> {
        if !(0.0..=1.0).contains(&self.min_landmark_confidence) {
            return Err(DetectError::invalid_config(
                "min_landmark_confidence must be within 0.0-1.0",
            ));
        }
        if self.warmup_frames < 2 {
            return Err(DetectError::invalid_config(
                "warmup_frames must be at least 2 for finite differencing",
            ));
        }
        if self.history_len < self.warmup_frames {
            return Err(DetectError::invalid_config(
                "history_len must be at least warmup_frames",
            ));
        }
        if self.debounce_samples == 0 || self.bend_window <= self.debounce_samples as usize {
            return Err(DetectError::invalid_config(
                "bend_window must exceed debounce_samples, which must be positive",
            ));
        }
        if self.follow_through_velocity >= self.release_velocity {
            return Err(DetectError::invalid_config(
                "follow_through_velocity must be below release_velocity",
            ));
        }
        if self.post_roll_secs > self.refractory_secs {
            return Err(DetectError::invalid_config(
                "post_roll_secs must not exceed refractory_secs",
            ));
        }
        if self.fps <= 0.0 {
            return Err(DetectError::invalid_config("fps must be positive"));
        }

        let durations = [
            ("max_gap_secs", self.max_gap_secs),
            ("dwell_secs", self.dwell_secs),
            ("windup_timeout_secs", self.windup_timeout_secs),
            ("release_timeout_secs", self.release_timeout_secs),
        ];
        for (name, value) in durations {
            if value <= 0.0 {
                return Err(DetectError::invalid_config(format!("{} must be positive", name)));
            }
        }
        if self.pre_roll_secs < 0.0 || self.post_roll_secs < 0.0 || self.refractory_secs < 0.0 {
            return Err(DetectError::invalid_config(
                "roll and refractory durations must not be negative",
            ));
        }

        Ok(())
    }
}
