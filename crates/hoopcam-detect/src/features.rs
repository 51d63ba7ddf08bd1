//! Motion feature extraction.
//!
//! Derives per-frame scalar signals from keypoint records:
//! 1. Elbow angle via the dot product of upper arm and forearm vectors
//! 2. Upward wrist velocity by finite difference over the last two records
//! 3. Extension (wrist-to-shoulder distance over body scale)
//! 4. Wrist height above the shoulder
//!
//! Distances are normalized by a body-scale reference (shoulder width, or
//! upper-arm length when the off shoulder is not tracked) so thresholds do
//! not depend on how far the player stands from the camera.

use std::collections::VecDeque;
use std::sync::Arc;
use tracing::debug;

use crate::config::DetectionConfig;
use crate::error::{DetectError, DetectResult};
use hoopcam_models::{FeatureSample, Keypoint, KeypointRecord};

/// Smallest usable body-scale reference, in normalized image units.
const MIN_BODY_SCALE: f64 = 0.01;

/// Calculate the interior elbow angle in degrees.
///
/// Uses cos(θ) = (v1 · v2) / (|v1| × |v2|) with v1 = elbow→shoulder and
/// v2 = elbow→wrist. 180° is a straight arm. Degenerate vectors are
/// treated as straight.
pub fn calculate_elbow_angle(shoulder: &Keypoint, elbow: &Keypoint, wrist: &Keypoint) -> f64 {
    let v1 = (shoulder.x - elbow.x, shoulder.y - elbow.y);
    let v2 = (wrist.x - elbow.x, wrist.y - elbow.y);

    let dot = v1.0 * v2.0 + v1.1 * v2.1;
    let mag1 = (v1.0 * v1.0 + v1.1 * v1.1).sqrt();
    let mag2 = (v2.0 * v2.0 + v2.1 * v2.1).sqrt();

    if mag1 < 1e-4 || mag2 < 1e-4 {
        return 180.0;
    }

    let cos_angle = (dot / (mag1 * mag2)).clamp(-1.0, 1.0);
    cos_angle.acos().to_degrees()
}

/// Body-scale reference for a record.
fn body_scale(record: &KeypointRecord) -> Option<f64> {
    let shoulder = record.shoulder()?;

    let shoulder_width = record
        .off_shoulder()
        .map(|off| shoulder.distance_to(off))
        .filter(|w| *w >= MIN_BODY_SCALE);
    let upper_arm = record
        .elbow()
        .map(|elbow| shoulder.distance_to(elbow))
        .filter(|l| *l >= MIN_BODY_SCALE);

    shoulder_width.or(upper_arm)
}

/// Streaming feature extractor with a bounded keypoint history.
///
/// The history is cleared on a gap (interval above `max_gap_secs`) or a
/// switch of the tracked arm; features resume once `warmup_frames`
/// records have been seen again.
#[derive(Debug)]
pub struct FeatureExtractor {
    history: VecDeque<Arc<KeypointRecord>>,
    history_len: usize,
    warmup_frames: usize,
    max_gap_secs: f64,
}

impl FeatureExtractor {
    /// Extractor keeping `history_len` records, valid after `warmup_frames`.
    pub fn new(history_len: usize, warmup_frames: usize, max_gap_secs: f64) -> Self {
        let history_len = history_len.max(2);
        Self {
            history: VecDeque::with_capacity(history_len),
            history_len,
            warmup_frames: warmup_frames.clamp(2, history_len),
            max_gap_secs,
        }
    }

    /// Extractor sized by a detection config.
    pub fn from_config(config: &DetectionConfig) -> Self {
        Self::new(config.history_len, config.warmup_frames, config.max_gap_secs)
    }

    /// Records currently held.
    pub fn len(&self) -> usize {
        self.history.len()
    }

    /// Whether no history is held.
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Drop all history (stream interruption).
    pub fn reset(&mut self) {
        self.history.clear();
    }

    /// Add a record and derive its feature sample.
    pub fn extract(&mut self, record: KeypointRecord) -> DetectResult<FeatureSample> {
        if let Some(last) = self.history.back() {
            if record.timestamp <= last.timestamp {
                return Err(DetectError::NonMonotonicTimestamp {
                    previous: last.timestamp,
                    current: record.timestamp,
                });
            }

            let interval = record.timestamp - last.timestamp;
            if interval > self.max_gap_secs {
                debug!(
                    interval_secs = interval,
                    timestamp = record.timestamp,
                    "Feature history reset after gap"
                );
                self.history.clear();
            } else if last.side != record.side {
                debug!(
                    from = %last.side,
                    to = %record.side,
                    "Tracked arm switched, resetting feature history"
                );
                self.history.clear();
            }
        }

        let record = Arc::new(record);
        self.history.push_back(Arc::clone(&record));
        while self.history.len() > self.history_len {
            self.history.pop_front();
        }

        if self.history.len() < self.warmup_frames {
            return Err(DetectError::InsufficientHistory {
                have: self.history.len(),
                need: self.warmup_frames,
            });
        }

        let previous = &self.history[self.history.len() - 2];
        self.compute(record, previous)
    }

    fn compute(
        &self,
        record: Arc<KeypointRecord>,
        previous: &KeypointRecord,
    ) -> DetectResult<FeatureSample> {
        let side = record.side;
        let missing = |part| DetectError::landmark_missing(part, 0.0);

        let wrist = record.wrist().ok_or_else(|| missing(side.wrist()))?;
        let elbow = record.elbow().ok_or_else(|| missing(side.elbow()))?;
        let shoulder = record.shoulder().ok_or_else(|| missing(side.shoulder()))?;
        let prev_wrist = previous.wrist().ok_or_else(|| missing(side.wrist()))?;
        let scale = body_scale(&record).ok_or_else(|| missing(side.shoulder()))?;

        let dt = record.timestamp - previous.timestamp;
        // Image y grows downward; upward motion is positive
        let wrist_velocity = (prev_wrist.y - wrist.y) / scale / dt;

        Ok(FeatureSample {
            frame_index: record.frame_index,
            timestamp: record.timestamp,
            side,
            elbow_angle: calculate_elbow_angle(shoulder, elbow, wrist),
            wrist_velocity,
            extension: wrist.distance_to(shoulder) / scale,
            wrist_height: (shoulder.y - wrist.y) / scale,
            body_scale: scale,
            keypoints: record,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hoopcam_models::{ArmSide, BodyPart};
    use std::collections::BTreeMap;

    fn record(frame_index: u64, timestamp: f64, wrist_y: f64) -> KeypointRecord {
        let mut points = BTreeMap::new();
        points.insert(BodyPart::RightShoulder, Keypoint::new(0.5, 0.4, 0.9));
        points.insert(BodyPart::LeftShoulder, Keypoint::new(0.3, 0.4, 0.9));
        points.insert(BodyPart::RightElbow, Keypoint::new(0.6, 0.4, 0.9));
        points.insert(BodyPart::RightWrist, Keypoint::new(0.6, wrist_y, 0.9));
        KeypointRecord {
            frame_index,
            timestamp,
            side: ArmSide::Right,
            points,
        }
    }

    #[test]
    fn test_straight_arm() {
        let angle = calculate_elbow_angle(
            &Keypoint::new(0.0, 0.0, 1.0),
            &Keypoint::new(0.5, 0.0, 1.0),
            &Keypoint::new(1.0, 0.0, 1.0),
        );
        assert!((angle - 180.0).abs() < 1e-6);
    }

    #[test]
    fn test_bent_arm() {
        let angle = calculate_elbow_angle(
            &Keypoint::new(0.0, 0.0, 1.0),
            &Keypoint::new(0.5, 0.0, 1.0),
            &Keypoint::new(0.5, 0.5, 1.0),
        );
        assert!((angle - 90.0).abs() < 1e-6);
    }

    #[test]
    fn test_degenerate_vectors_read_straight() {
        let p = Keypoint::new(0.5, 0.5, 1.0);
        assert_eq!(calculate_elbow_angle(&p, &p, &p), 180.0);
    }

    #[test]
    fn test_warmup_then_features() {
        let mut extractor = FeatureExtractor::new(6, 3, 0.25);
        let dt = 1.0 / 30.0;

        assert!(matches!(
            extractor.extract(record(0, 0.0, 0.5)),
            Err(DetectError::InsufficientHistory { have: 1, need: 3 })
        ));
        assert!(extractor.extract(record(1, dt, 0.5)).is_err());

        // Wrist rises 0.02 in one frame; shoulder width is 0.2
        let sample = extractor.extract(record(2, 2.0 * dt, 0.48)).unwrap();
        assert!((sample.body_scale - 0.2).abs() < 1e-9);
        assert!((sample.wrist_velocity - 0.02 / 0.2 * 30.0).abs() < 1e-6);
        assert!((sample.wrist_height - (0.4 - 0.48) / 0.2).abs() < 1e-9);
        assert_eq!(sample.frame_index, 2);
        assert!(sample.elbow_angle > 0.0 && sample.elbow_angle < 180.0);
    }

    #[test]
    fn test_gap_restarts_warmup() {
        let mut extractor = FeatureExtractor::new(6, 3, 0.25);
        for i in 0..4u64 {
            let _ = extractor.extract(record(i, i as f64 / 30.0, 0.5));
        }
        assert_eq!(extractor.len(), 4);

        let result = extractor.extract(record(20, 1.0, 0.5));
        assert!(matches!(
            result,
            Err(DetectError::InsufficientHistory { have: 1, .. })
        ));
    }

    #[test]
    fn test_history_is_bounded() {
        let mut extractor = FeatureExtractor::new(4, 2, 0.25);
        for i in 0..10u64 {
            let _ = extractor.extract(record(i, i as f64 / 30.0, 0.5));
        }
        assert_eq!(extractor.len(), 4);
    }

    #[test]
    fn test_non_monotonic_rejected() {
        let mut extractor = FeatureExtractor::new(6, 2, 0.25);
        let _ = extractor.extract(record(1, 0.5, 0.5));
        let err = extractor.extract(record(0, 0.4, 0.5)).unwrap_err();
        assert!(matches!(err, DetectError::NonMonotonicTimestamp { .. }));
        assert_eq!(extractor.len(), 1);
    }

    #[test]
    fn test_arm_switch_resets_history() {
        let mut extractor = FeatureExtractor::new(6, 2, 0.25);
        let _ = extractor.extract(record(0, 0.0, 0.5));
        assert!(extractor.extract(record(1, 1.0 / 30.0, 0.5)).is_ok());

        let mut left = record(2, 2.0 / 30.0, 0.5);
        left.side = ArmSide::Left;
        assert!(extractor.extract(left).unwrap_err().is_transient());
    }

    #[test]
    fn test_upper_arm_scale_fallback() {
        let mut rec = record(0, 0.0, 0.5);
        rec.points.remove(&BodyPart::LeftShoulder);
        assert!((body_scale(&rec).unwrap() - 0.1).abs() < 1e-9);
    }
}
