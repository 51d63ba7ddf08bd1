//! Scripted feature streams.
//!
//! Generates a plausible jump-shot motion as feature samples and matching
//! frames, for demos and for exercising the detection path without a pose
//! estimator. The default script at 30 fps is:
//!
//! - 30 IDLE samples (arm relaxed, elbow ~165°)
//! - 5 WINDUP samples (elbow closing 90° → 45°)
//! - 4 RELEASE samples (wrist velocity 0.8 → 3.0, extension rising)
//! - 6 FOLLOW_THROUGH samples (velocity falling to 0.2)
//! - 20 COOLDOWN samples (arm relaxed)

use std::collections::BTreeMap;
use std::sync::Arc;

use hoopcam_models::{
    frame_interval, ArmSide, BodyPart, FeatureSample, Frame, Keypoint, KeypointRecord,
};

const WINDUP_ANGLES: [f64; 5] = [90.0, 78.75, 67.5, 56.25, 45.0];
const RELEASE_VELOCITIES: [f64; 4] = [0.8, 1.6, 2.4, 3.0];
const RELEASE_EXTENSIONS: [f64; 4] = [1.2, 1.6, 2.0, 2.3];
const RELEASE_ANGLES: [f64; 4] = [100.0, 130.0, 155.0, 170.0];
const RELEASE_HEIGHTS: [f64; 4] = [0.8, 1.2, 1.6, 2.0];
const FOLLOW_VELOCITIES: [f64; 6] = [2.0, 1.4, 0.9, 0.6, 0.4, 0.2];
const FOLLOW_EXTENSIONS: [f64; 6] = [2.3, 2.25, 2.2, 2.1, 2.0, 1.9];

/// Body scale used for the synthetic keypoints.
const SCALE: f64 = 0.2;

/// Build a feature sample with consistent keypoints.
pub fn sample_at(
    frame_index: u64,
    timestamp: f64,
    elbow_angle: f64,
    wrist_velocity: f64,
    extension: f64,
    wrist_height: f64,
) -> FeatureSample {
    let shoulder = Keypoint::new(0.5, 0.4, 0.95);
    let wrist_y = shoulder.y - wrist_height * SCALE;
    let horizontal = (extension * extension - wrist_height * wrist_height).max(0.0).sqrt() * SCALE;

    let mut points = BTreeMap::new();
    points.insert(BodyPart::RightShoulder, shoulder);
    points.insert(BodyPart::LeftShoulder, Keypoint::new(0.5 - SCALE, 0.4, 0.95));
    points.insert(
        BodyPart::RightElbow,
        Keypoint::new(0.5 + horizontal / 2.0, (0.4 + wrist_y) / 2.0 + 0.02, 0.95),
    );
    points.insert(BodyPart::RightWrist, Keypoint::new(0.5 + horizontal, wrist_y, 0.95));

    FeatureSample {
        frame_index,
        timestamp,
        side: ArmSide::Right,
        elbow_angle,
        wrist_velocity,
        extension,
        wrist_height,
        body_scale: SCALE,
        keypoints: Arc::new(KeypointRecord {
            frame_index,
            timestamp,
            side: ArmSide::Right,
            points,
        }),
    }
}

/// One scripted shot motion.
#[derive(Debug, Clone)]
pub struct ShotScript {
    fps: f64,
    idle_frames: usize,
    cooldown_frames: usize,
    frame_offset: u64,
    time_offset: f64,
    release_wrist_height: Option<f64>,
}

/// The default script.
pub fn canonical_shot(fps: f64) -> ShotScript {
    ShotScript::new(fps)
}

impl ShotScript {
    /// Canonical script timing at `fps`.
    pub fn new(fps: f64) -> Self {
        Self {
            fps,
            idle_frames: 30,
            cooldown_frames: 20,
            frame_offset: 0,
            time_offset: 0.0,
            release_wrist_height: None,
        }
    }

    /// Relaxed samples before the windup.
    pub fn with_idle_frames(mut self, frames: usize) -> Self {
        self.idle_frames = frames;
        self
    }

    /// Relaxed samples after the follow-through.
    pub fn with_cooldown_frames(mut self, frames: usize) -> Self {
        self.cooldown_frames = frames;
        self
    }

    /// Start the script at a given frame index and timestamp.
    pub fn with_offset(mut self, frame_offset: u64, time_offset: f64) -> Self {
        self.frame_offset = frame_offset;
        self.time_offset = time_offset;
        self
    }

    /// Override the wrist height of the release samples.
    pub fn with_release_wrist_height(mut self, height: f64) -> Self {
        self.release_wrist_height = Some(height);
        self
    }

    /// Total samples in the script.
    pub fn len(&self) -> usize {
        self.idle_frames
            + WINDUP_ANGLES.len()
            + RELEASE_VELOCITIES.len()
            + FOLLOW_VELOCITIES.len()
            + self.cooldown_frames
    }

    /// Whether the script produces no samples.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Frame index of the sample crossing the default release threshold.
    pub fn release_frame(&self) -> u64 {
        self.frame_offset + (self.idle_frames + WINDUP_ANGLES.len() + 1) as u64
    }

    fn timestamp(&self, i: usize) -> f64 {
        self.time_offset + i as f64 / self.fps
    }

    /// Feature samples for the whole script.
    pub fn samples(&self) -> Vec<FeatureSample> {
        let mut samples = Vec::with_capacity(self.len());
        let mut push = |elbow: f64, velocity: f64, extension: f64, height: f64| {
            let i = samples.len();
            samples.push(sample_at(
                self.frame_offset + i as u64,
                self.timestamp(i),
                elbow,
                velocity,
                extension,
                height,
            ));
        };

        for _ in 0..self.idle_frames {
            push(165.0, 0.0, 1.8, -1.0);
        }
        for angle in WINDUP_ANGLES {
            push(angle, 0.1, 1.0, 0.5);
        }
        for i in 0..RELEASE_VELOCITIES.len() {
            push(
                RELEASE_ANGLES[i],
                RELEASE_VELOCITIES[i],
                RELEASE_EXTENSIONS[i],
                self.release_wrist_height.unwrap_or(RELEASE_HEIGHTS[i]),
            );
        }
        for i in 0..FOLLOW_VELOCITIES.len() {
            push(170.0, FOLLOW_VELOCITIES[i], FOLLOW_EXTENSIONS[i], 1.9);
        }
        for _ in 0..self.cooldown_frames {
            push(165.0, 0.0, 1.8, -1.0);
        }

        samples
    }

    /// Metadata-only frames aligned with [`samples`](Self::samples).
    pub fn frames(&self) -> Vec<Frame> {
        (0..self.len())
            .map(|i| Frame::metadata_only(self.frame_offset + i as u64, self.timestamp(i)))
            .collect()
    }

    /// Frames paired with their samples.
    pub fn stream(&self) -> Vec<(Frame, FeatureSample)> {
        self.frames().into_iter().zip(self.samples()).collect()
    }
}

/// `count` canonical shots back to back, spaced well past the default
/// refractory period.
pub fn shot_sequence(fps: f64, count: usize) -> Vec<(Frame, FeatureSample)> {
    let mut stream: Vec<(Frame, FeatureSample)> = Vec::new();
    for i in 0..count {
        let script = match stream.last() {
            None => canonical_shot(fps),
            Some((frame, _)) => ShotScript::new(fps)
                .with_idle_frames(40)
                .with_offset(frame.index + 1, frame.timestamp + frame_interval(fps)),
        };
        let script = if i + 1 == count {
            script.with_cooldown_frames(40)
        } else {
            script
        };
        stream.extend(script.stream());
    }
    stream
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_shape() {
        let script = canonical_shot(30.0);
        let samples = script.samples();
        assert_eq!(samples.len(), 65);
        assert_eq!(script.frames().len(), 65);
        assert_eq!(script.release_frame(), 36);
        assert_eq!(samples[36].wrist_velocity, 1.6);
        assert!(samples.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    }

    #[test]
    fn test_offset_applies_to_frames_and_samples() {
        let script = ShotScript::new(30.0).with_offset(100, 10.0);
        let stream = script.stream();
        assert_eq!(stream[0].0.index, 100);
        assert_eq!(stream[0].1.frame_index, 100);
        assert!((stream[0].0.timestamp - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_shot_sequence_is_contiguous() {
        let stream = shot_sequence(30.0, 3);
        assert!(stream
            .windows(2)
            .all(|w| w[0].0.index + 1 == w[1].0.index && w[0].0.timestamp < w[1].0.timestamp));
        assert!(stream.iter().all(|(f, s)| f.index == s.frame_index));
    }
}
