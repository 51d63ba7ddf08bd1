//! Per-frame detection pipeline.
//!
//! Composes the landmark adapter, feature extractor, state machine and
//! segment recorder. One call per frame, strictly in order, on a single
//! thread; nothing here blocks on I/O.

use tracing::{debug, trace, warn};

use crate::config::DetectionConfig;
use crate::error::{DetectError, DetectResult};
use crate::features::FeatureExtractor;
use crate::landmarks::{LandmarkAdapter, RawPose};
use crate::recorder::{SegmentCapture, SegmentRecorder};
use crate::state_machine::{MachineInput, ShotStateMachine};
use hoopcam_models::{FeatureSample, Frame, ShotEvent, ShotPhase};

/// What the pose stage produced for a frame.
#[derive(Debug, Clone)]
pub enum Observation {
    /// Raw pose estimator output
    Pose(RawPose),
    /// Features computed upstream
    Features(FeatureSample),
    /// No person found / estimator skipped the frame
    Missing,
}

/// Result of feeding one frame.
#[derive(Debug, Default)]
pub struct FrameOutcome {
    pub phase: ShotPhase,
    pub events: Vec<ShotEvent>,
    /// Segments finalized by this frame
    pub captures: Vec<SegmentCapture>,
}

impl FrameOutcome {
    /// No events and no finalized segments.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.captures.is_empty()
    }
}

/// Single-session detection pipeline.
#[derive(Debug)]
pub struct ShotPipeline {
    adapter: LandmarkAdapter,
    extractor: FeatureExtractor,
    machine: ShotStateMachine,
    recorder: SegmentRecorder,
}

impl ShotPipeline {
    /// Validate the config and build every stage from it.
    pub fn new(config: DetectionConfig) -> DetectResult<Self> {
        config.validate()?;
        Ok(Self {
            adapter: LandmarkAdapter::from_config(&config),
            extractor: FeatureExtractor::from_config(&config),
            recorder: SegmentRecorder::from_config(&config),
            machine: ShotStateMachine::new(config),
        })
    }

    /// Current shot phase.
    pub fn phase(&self) -> ShotPhase {
        self.machine.phase()
    }

    /// Process one frame and its observation.
    pub fn process(&mut self, frame: Frame, observation: Observation) -> FrameOutcome {
        metrics::counter!("hoopcam_frames_total").increment(1);
        let mut outcome = FrameOutcome::default();

        let index = frame.index;
        let timestamp = frame.timestamp;
        outcome.captures.extend(self.recorder.push_frame(frame));

        if let Some(input) = self.observe(index, timestamp, observation) {
            let events = self.machine.step(input);
            self.route_events(&events, &mut outcome);
            outcome.events = events;
        }

        outcome.phase = self.machine.phase();
        outcome
    }

    fn observe(
        &mut self,
        index: u64,
        timestamp: f64,
        observation: Observation,
    ) -> Option<MachineInput> {
        let result = match observation {
            Observation::Features(sample) => Ok(sample),
            Observation::Pose(pose) => self
                .adapter
                .adapt(index, timestamp, &pose)
                .and_then(|record| self.extractor.extract(record)),
            Observation::Missing => {
                metrics::counter!("hoopcam_low_confidence_frames_total").increment(1);
                return Some(MachineInput::LowConfidence { timestamp });
            }
        };

        match result {
            Ok(sample) => Some(MachineInput::Sample(sample)),
            Err(DetectError::LandmarkMissing { part, confidence }) => {
                metrics::counter!("hoopcam_low_confidence_frames_total").increment(1);
                trace!(index, %part, confidence, "Low-confidence frame");
                Some(MachineInput::LowConfidence { timestamp })
            }
            Err(e) if e.is_transient() => {
                trace!(index, error = %e, "Feature warm-up");
                None
            }
            Err(e) if e.is_recoverable() => {
                debug!(index, error = %e, "Frame skipped");
                None
            }
            Err(e) => {
                warn!(index, error = %e, "Frame rejected");
                None
            }
        }
    }

    fn route_events(&mut self, events: &[ShotEvent], outcome: &mut FrameOutcome) {
        for event in events {
            outcome.captures.extend(self.recorder.on_event(event));
        }
    }

    /// Signal a camera disconnect or other explicit stream interruption.
    pub fn interrupt(&mut self, timestamp: f64) -> FrameOutcome {
        self.extractor.reset();
        let events = self.machine.step(MachineInput::Interrupted { timestamp });
        let mut outcome = FrameOutcome::default();
        self.route_events(&events, &mut outcome);
        outcome.events = events;
        outcome.phase = self.machine.phase();
        outcome
    }

    /// Close the stream, finalizing any shot in progress.
    pub fn finish(&mut self) -> FrameOutcome {
        let events = self.machine.finish();
        let mut outcome = FrameOutcome::default();
        self.route_events(&events, &mut outcome);
        outcome.captures.extend(self.recorder.flush());
        outcome.events = events;
        outcome.phase = self.machine.phase();
        self.extractor.reset();
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmarks::RawLandmark;
    use crate::synthetic::{canonical_shot, shot_sequence};
    use hoopcam_models::{ArmSide, ShotEventKind};

    fn run(pipeline: &mut ShotPipeline, stream: Vec<(Frame, FeatureSample)>) -> Vec<FrameOutcome> {
        let mut outcomes: Vec<FrameOutcome> = stream
            .into_iter()
            .map(|(frame, sample)| pipeline.process(frame, Observation::Features(sample)))
            .collect();
        outcomes.push(pipeline.finish());
        outcomes
    }

    #[test]
    fn test_single_shot_single_capture() {
        let config = DetectionConfig::default().with_rolls(1.0, 0.3);
        let mut pipeline = ShotPipeline::new(config).unwrap();
        let script = canonical_shot(30.0).with_cooldown_frames(30);

        let outcomes = run(&mut pipeline, script.stream());
        let events: Vec<_> = outcomes.iter().flat_map(|o| o.events.iter()).collect();
        let captures: Vec<_> = outcomes.iter().flat_map(|o| o.captures.iter()).collect();

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, ShotEventKind::Start);
        assert_eq!(captures.len(), 1);

        let capture = captures[0];
        let start = events[0].timestamp;
        let end = events[1].timestamp;
        assert_eq!(capture.shot_start, start);
        assert_eq!(capture.shot_end, end);

        let first = capture.first_timestamp().unwrap();
        assert!(first <= start - 1.0 + 1e-6);
        assert!(first >= start - 1.0 - 1.0 / 30.0 - 1e-6);
        assert!(capture.last_timestamp().unwrap() >= end + 0.3 - 1e-6);
        assert!(capture.frames.windows(2).all(|w| w[0].index + 1 == w[1].index));
    }

    #[test]
    fn test_canonical_script_with_default_config() {
        // 30 idle, 5 windup, 4 release, 6 follow-through, 20 cooldown
        let script = canonical_shot(30.0);
        assert_eq!(script.len(), 65);
        let mut pipeline = ShotPipeline::new(DetectionConfig::default()).unwrap();

        let mut events = Vec::new();
        let mut captures = Vec::new();
        for (frame, sample) in script.stream() {
            let outcome = pipeline.process(frame, Observation::Features(sample));
            events.extend(outcome.events);
            captures.extend(outcome.captures);
        }

        // Finalized during the stream, with the full post-roll
        assert_eq!(events.len(), 2);
        assert_eq!(captures.len(), 1);
        assert!(pipeline.finish().is_empty());

        let start = events[0].timestamp;
        let end = events[1].timestamp;
        assert_eq!(events[0].trigger.frame_index, script.release_frame());
        assert!((start - 1.2).abs() < 1e-9);
        assert!((end - 1.7).abs() < 1e-9);

        let capture = &captures[0];
        assert_eq!(capture.frames[0].index, 0);
        assert_eq!(capture.frames.last().unwrap().index, 63);
        assert!(capture.last_timestamp().unwrap() >= end + 0.4 - 1e-6);
        assert!(capture.frames.windows(2).all(|w| w[0].index + 1 == w[1].index));
    }

    #[test]
    fn test_back_to_back_captures_do_not_overlap() {
        // Pre-roll long enough to reach back into the first post-roll
        let config = DetectionConfig::default().with_rolls(2.0, 0.4);
        let mut pipeline = ShotPipeline::new(config).unwrap();
        let outcomes = run(&mut pipeline, shot_sequence(30.0, 2));
        let captures: Vec<_> = outcomes.iter().flat_map(|o| o.captures.iter()).collect();
        assert_eq!(captures.len(), 2);

        let first_last = captures[0].frames.last().unwrap().index;
        let second_first = captures[1].frames[0].index;
        assert_eq!(first_last, 63);
        assert_eq!(second_first, first_last + 1);
        assert!(captures[1].first_timestamp().unwrap() > captures[0].last_timestamp().unwrap());
    }

    #[test]
    fn test_missing_observations_do_not_break_stream() {
        let mut pipeline = ShotPipeline::new(DetectionConfig::default()).unwrap();
        for i in 0..60u64 {
            let outcome = pipeline.process(Frame::metadata_only(i, i as f64 / 30.0), Observation::Missing);
            assert!(outcome.is_empty());
            assert_eq!(outcome.phase, ShotPhase::Idle);
        }
        assert!(pipeline.finish().is_empty());
    }

    #[test]
    fn test_interrupt_mid_release_emits_nothing() {
        let mut pipeline = ShotPipeline::new(DetectionConfig::default()).unwrap();
        let script = canonical_shot(30.0);
        let cut = script.release_frame() as usize + 1;

        let mut emitted = 0;
        for (frame, sample) in script.stream().into_iter().take(cut) {
            emitted += pipeline.process(frame, Observation::Features(sample)).events.len();
        }
        assert_eq!(pipeline.phase(), ShotPhase::Release);

        let outcome = pipeline.interrupt(2.0);
        assert_eq!(emitted + outcome.events.len(), 0);
        assert_eq!(outcome.phase, ShotPhase::Idle);
        assert!(pipeline.finish().captures.is_empty());
    }

    #[test]
    fn test_raw_pose_path_reaches_features() {
        let mut pipeline = ShotPipeline::new(DetectionConfig::default()).unwrap();
        let pose = |y: f64| {
            RawPose::new(vec![
                RawLandmark::new(ArmSide::Right.shoulder().mediapipe_index(), 0.5, 0.4, 0.9),
                RawLandmark::new(ArmSide::Left.shoulder().mediapipe_index(), 0.3, 0.4, 0.9),
                RawLandmark::new(ArmSide::Right.elbow().mediapipe_index(), 0.6, 0.45, 0.9),
                RawLandmark::new(ArmSide::Right.wrist().mediapipe_index(), 0.62, y, 0.9),
            ])
        };

        for i in 0..5u64 {
            let outcome = pipeline.process(
                Frame::metadata_only(i, i as f64 / 30.0),
                Observation::Pose(pose(0.55)),
            );
            assert!(outcome.events.is_empty());
        }
        assert_eq!(pipeline.phase(), ShotPhase::Idle);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = DetectionConfig::default().with_rolls(1.5, 5.0);
        assert!(ShotPipeline::new(config).is_err());
    }
}
