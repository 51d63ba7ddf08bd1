//! Shot motion state machine.
//!
//! Classifies the feature stream into shot phases and emits START/END
//! boundary events:
//!
//! ```text
//! IDLE ──loaded arm──▶ WINDUP ──upward spike──▶ RELEASE ──velocity peaked──▶ FOLLOW_THROUGH
//!  ▲                     │ timeout/gap            │ timeout/gap                 │ dwell expired
//!  │                     ▼                        ▼                             ▼
//!  └──────────────────── IDLE ◀────────────── IDLE (discard)            COOLDOWN ──refractory──▶ IDLE
//! ```
//!
//! The transition logic is a pure function of (state, recent features,
//! input). [`ShotStateMachine`] wraps it with the bounded feature window,
//! gap detection and metrics.
//!
//! START is stamped with the sample that crossed the release threshold but
//! is only emitted once the release peaks. A shot interrupted mid-release
//! therefore produces no events at all.

use std::collections::VecDeque;
use tracing::{debug, info, warn};

use crate::config::DetectionConfig;
use hoopcam_models::{FeatureSample, FeatureSummary, ShotEvent, ShotPhase};

/// Tolerance for comparing elapsed times built from frame timestamps.
const TIME_EPSILON: f64 = 1e-6;

fn elapsed_at_least(elapsed: f64, limit: f64) -> bool {
    elapsed >= limit - TIME_EPSILON
}

/// One input to the state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum MachineInput {
    /// Valid feature sample
    Sample(FeatureSample),
    /// Frame without usable landmarks
    LowConfidence { timestamp: f64 },
    /// Stream interruption (gap or explicit disconnect)
    Interrupted { timestamp: f64 },
}

impl MachineInput {
    /// Timestamp of the frame this input came from.
    pub fn timestamp(&self) -> f64 {
        match self {
            MachineInput::Sample(s) => s.timestamp,
            MachineInput::LowConfidence { timestamp } => *timestamp,
            MachineInput::Interrupted { timestamp } => *timestamp,
        }
    }
}

/// Running aggregates for a shot between release and end.
#[derive(Debug, Clone, PartialEq)]
pub struct ShotTrack {
    /// Sample that crossed the release threshold
    pub start: FeatureSample,
    /// Most recent valid sample
    pub last: FeatureSample,
    pub min_windup_elbow_angle: f64,
    pub peak_velocity: f64,
    pub peak_extension: f64,
}

impl ShotTrack {
    fn new(start: FeatureSample, min_windup_elbow_angle: f64) -> Self {
        Self {
            peak_velocity: start.wrist_velocity,
            peak_extension: start.extension,
            min_windup_elbow_angle: min_windup_elbow_angle.min(start.elbow_angle),
            last: start.clone(),
            start,
        }
    }

    fn absorb(&mut self, sample: &FeatureSample) {
        self.peak_velocity = self.peak_velocity.max(sample.wrist_velocity);
        self.peak_extension = self.peak_extension.max(sample.extension);
        self.last = sample.clone();
    }

    fn summary(&self, end_time: f64) -> FeatureSummary {
        FeatureSummary {
            side: self.start.side,
            release_time: self.start.timestamp,
            end_time,
            duration_secs: end_time - self.start.timestamp,
            release_elbow_angle: self.start.elbow_angle,
            min_windup_elbow_angle: self.min_windup_elbow_angle,
            peak_wrist_velocity: self.peak_velocity,
            peak_extension: self.peak_extension,
        }
    }

    fn start_event(&self) -> ShotEvent {
        ShotEvent::start(self.start.clone())
    }

    fn end_event(&self, timestamp: f64, trigger: FeatureSample) -> ShotEvent {
        ShotEvent::end(timestamp, trigger, self.summary(timestamp))
    }
}

/// State of the shot machine, with the data each phase needs.
#[derive(Debug, Clone, PartialEq)]
pub enum ShotState {
    Idle {
        /// Consecutive samples satisfying the windup condition
        streak: u32,
    },
    Windup {
        entered_at: f64,
        min_elbow_angle: f64,
    },
    Release {
        track: ShotTrack,
    },
    FollowThrough {
        track: ShotTrack,
        /// Start of the current settle period
        dwell_from: f64,
    },
    Cooldown {
        entered_at: f64,
    },
}

impl Default for ShotState {
    fn default() -> Self {
        ShotState::Idle { streak: 0 }
    }
}

impl ShotState {
    /// Phase label without the per-phase data.
    pub fn phase(&self) -> ShotPhase {
        match self {
            ShotState::Idle { .. } => ShotPhase::Idle,
            ShotState::Windup { .. } => ShotPhase::Windup,
            ShotState::Release { .. } => ShotPhase::Release,
            ShotState::FollowThrough { .. } => ShotPhase::FollowThrough,
            ShotState::Cooldown { .. } => ShotPhase::Cooldown,
        }
    }
}

/// Recent valid samples, newest last.
#[derive(Debug, Clone)]
pub struct FeatureWindow {
    samples: VecDeque<FeatureSample>,
    capacity: usize,
}

impl FeatureWindow {
    /// Empty window holding at most `capacity` samples (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a sample, evicting the oldest when full.
    pub fn push(&mut self, sample: FeatureSample) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    /// Most recent sample.
    pub fn latest(&self) -> Option<&FeatureSample> {
        self.samples.back()
    }

    /// Widest elbow angle in the window, if any samples are held.
    pub fn max_elbow_angle(&self) -> Option<f64> {
        self.samples
            .iter()
            .map(|s| s.elbow_angle)
            .fold(None, |acc, a| Some(acc.map_or(a, |m: f64| m.max(a))))
    }

    /// Number of samples held.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the window holds no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Drop every sample, as after a gap.
    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

/// Result of one transition.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub next: ShotState,
    pub event: Option<ShotEvent>,
    /// A shot in RELEASE was abandoned without events
    pub discarded: bool,
}

impl Transition {
    fn to(next: ShotState) -> Self {
        Self {
            next,
            event: None,
            discarded: false,
        }
    }

    fn emit(next: ShotState, event: ShotEvent) -> Self {
        Self {
            next,
            event: Some(event),
            discarded: false,
        }
    }

    fn discard() -> Self {
        Self {
            next: ShotState::default(),
            event: None,
            discarded: true,
        }
    }
}

/// Compute the next state for one input.
///
/// `window` holds the valid samples preceding `input`.
pub fn transition(
    config: &DetectionConfig,
    state: &ShotState,
    window: &FeatureWindow,
    input: &MachineInput,
) -> Transition {
    match input {
        MachineInput::Sample(sample) => on_sample(config, state, window, sample),
        MachineInput::LowConfidence { timestamp } => on_low_confidence(config, state, *timestamp),
        MachineInput::Interrupted { .. } => on_interrupted(state),
    }
}

fn on_sample(
    config: &DetectionConfig,
    state: &ShotState,
    window: &FeatureWindow,
    sample: &FeatureSample,
) -> Transition {
    let ts = sample.timestamp;

    match state {
        ShotState::Idle { streak } => {
            let was_straight = window
                .max_elbow_angle()
                .is_some_and(|a| a >= config.windup_bend_angle);
            let loaded = sample.extension < config.windup_extension_max
                && sample.elbow_angle < config.windup_bend_angle
                && was_straight;

            if !loaded {
                return Transition::to(ShotState::Idle { streak: 0 });
            }

            let streak = streak + 1;
            if streak >= config.debounce_samples {
                Transition::to(ShotState::Windup {
                    entered_at: ts,
                    min_elbow_angle: sample.elbow_angle,
                })
            } else {
                Transition::to(ShotState::Idle { streak })
            }
        }

        ShotState::Windup {
            entered_at,
            min_elbow_angle,
        } => {
            if ts - entered_at > config.windup_timeout_secs + TIME_EPSILON {
                debug!(timestamp = ts, "Windup expired without release");
                return Transition::to(ShotState::default());
            }

            let extending = window
                .latest()
                .is_some_and(|prev| sample.extension > prev.extension);
            let above_gate = config
                .release_min_wrist_height
                .map_or(true, |min| sample.wrist_height >= min);

            if sample.wrist_velocity > config.release_velocity && extending && above_gate {
                Transition::to(ShotState::Release {
                    track: ShotTrack::new(sample.clone(), *min_elbow_angle),
                })
            } else {
                Transition::to(ShotState::Windup {
                    entered_at: *entered_at,
                    min_elbow_angle: min_elbow_angle.min(sample.elbow_angle),
                })
            }
        }

        ShotState::Release { track } => {
            if ts - track.start.timestamp > config.release_timeout_secs + TIME_EPSILON {
                debug!(
                    release_time = track.start.timestamp,
                    timestamp = ts,
                    "Release never peaked, discarding"
                );
                return Transition::discard();
            }

            let peaked = sample.wrist_velocity < config.follow_through_velocity
                && sample.extension <= track.peak_extension;

            let mut track = track.clone();
            track.absorb(sample);

            if peaked {
                let event = track.start_event();
                Transition::emit(
                    ShotState::FollowThrough {
                        track,
                        dwell_from: ts,
                    },
                    event,
                )
            } else {
                Transition::to(ShotState::Release { track })
            }
        }

        ShotState::FollowThrough { track, dwell_from } => {
            let mut track = track.clone();
            track.absorb(sample);

            if sample.wrist_velocity > config.release_velocity {
                // Renewed spike restarts the settle period
                return Transition::to(ShotState::FollowThrough {
                    track,
                    dwell_from: ts,
                });
            }

            if elapsed_at_least(ts - dwell_from, config.dwell_secs) {
                let event = track.end_event(ts, sample.clone());
                Transition::emit(ShotState::Cooldown { entered_at: ts }, event)
            } else {
                Transition::to(ShotState::FollowThrough {
                    track,
                    dwell_from: *dwell_from,
                })
            }
        }

        ShotState::Cooldown { entered_at } => {
            if elapsed_at_least(ts - entered_at, config.refractory_secs) {
                Transition::to(ShotState::default())
            } else {
                Transition::to(state.clone())
            }
        }
    }
}

fn on_low_confidence(config: &DetectionConfig, state: &ShotState, ts: f64) -> Transition {
    match state {
        // Debounce requires consecutive valid samples
        ShotState::Idle { .. } => Transition::to(ShotState::default()),

        ShotState::FollowThrough { track, dwell_from }
            if elapsed_at_least(ts - dwell_from, config.dwell_secs) =>
        {
            let event = track.end_event(ts, track.last.clone());
            Transition::emit(ShotState::Cooldown { entered_at: ts }, event)
        }

        ShotState::Cooldown { entered_at }
            if elapsed_at_least(ts - entered_at, config.refractory_secs) =>
        {
            Transition::to(ShotState::default())
        }

        _ => Transition::to(state.clone()),
    }
}

fn on_interrupted(state: &ShotState) -> Transition {
    match state {
        ShotState::Idle { .. } | ShotState::Windup { .. } => Transition::to(ShotState::default()),

        ShotState::Release { .. } => Transition::discard(),

        // Shot already confirmed; close it at the last valid sample
        ShotState::FollowThrough { track, .. } => {
            let end_at = track.last.timestamp;
            let event = track.end_event(end_at, track.last.clone());
            Transition::emit(ShotState::Cooldown { entered_at: end_at }, event)
        }

        ShotState::Cooldown { .. } => Transition::to(state.clone()),
    }
}

/// Stateful wrapper driving [`transition`] over a stream.
#[derive(Debug, Clone)]
pub struct ShotStateMachine {
    config: DetectionConfig,
    state: ShotState,
    window: FeatureWindow,
    last_valid_ts: Option<f64>,
    /// Set once a gap has been reported, cleared by the next valid sample
    in_gap: bool,
}

impl ShotStateMachine {
    /// Machine in IDLE with an empty feature window.
    pub fn new(config: DetectionConfig) -> Self {
        let window = FeatureWindow::new(config.bend_window);
        Self {
            config,
            state: ShotState::default(),
            window,
            last_valid_ts: None,
            in_gap: false,
        }
    }

    /// Current state, including per-phase data.
    pub fn state(&self) -> &ShotState {
        &self.state
    }

    /// Current phase.
    pub fn phase(&self) -> ShotPhase {
        self.state.phase()
    }

    /// Feed one input. Returns the events it produced, in order.
    pub fn step(&mut self, input: MachineInput) -> Vec<ShotEvent> {
        let ts = input.timestamp();
        let mut events = Vec::new();

        if let (MachineInput::Sample(_), Some(last)) = (&input, self.last_valid_ts) {
            if ts <= last {
                warn!(
                    timestamp = ts,
                    previous = last,
                    "Dropping non-monotonic feature sample"
                );
                return events;
            }
        }

        if !matches!(input, MachineInput::Interrupted { .. }) && !self.in_gap {
            if let Some(last) = self.last_valid_ts {
                let gap_secs = ts - last;
                if gap_secs > self.config.max_gap_secs {
                    debug!(gap_secs, timestamp = ts, "Feature stream gap");
                    self.apply(&MachineInput::Interrupted { timestamp: ts }, &mut events);
                }
            }
        }

        self.apply(&input, &mut events);

        if let MachineInput::Sample(sample) = input {
            self.last_valid_ts = Some(sample.timestamp);
            self.in_gap = false;
            self.window.push(sample);
        }

        events
    }

    fn apply(&mut self, input: &MachineInput, events: &mut Vec<ShotEvent>) {
        let from = self.state.phase();
        let result = transition(&self.config, &self.state, &self.window, input);

        if matches!(input, MachineInput::Interrupted { .. }) {
            self.window.clear();
            self.in_gap = true;
            if from.is_mid_shot() {
                info!(phase = %from, timestamp = input.timestamp(), "Shot interrupted");
            }
        }

        if result.discarded {
            metrics::counter!("hoopcam_shots_discarded_total").increment(1);
        }

        let to = result.next.phase();
        if from != to {
            debug!(from = %from, to = %to, timestamp = input.timestamp(), "Shot phase transition");
        }

        if let Some(event) = result.event {
            if event.is_end() {
                metrics::counter!("hoopcam_shots_detected_total").increment(1);
                info!(
                    release_time = event.summary.as_ref().map(|s| s.release_time),
                    end_time = event.timestamp,
                    "Shot detected"
                );
            }
            events.push(event);
        }

        self.state = result.next;
    }

    /// Close the stream.
    ///
    /// WINDUP is discarded. A shot in RELEASE gets START and END at its last
    /// valid sample; a shot in FOLLOW_THROUGH gets END there.
    pub fn finish(&mut self) -> Vec<ShotEvent> {
        let mut events = Vec::new();

        match &self.state {
            ShotState::Release { track } => {
                let end_at = track.last.timestamp;
                events.push(track.start_event());
                events.push(track.end_event(end_at, track.last.clone()));
            }
            ShotState::FollowThrough { track, .. } => {
                let end_at = track.last.timestamp;
                events.push(track.end_event(end_at, track.last.clone()));
            }
            _ => {}
        }

        if !events.is_empty() {
            metrics::counter!("hoopcam_shots_detected_total").increment(1);
            debug!(phase = %self.state.phase(), "Shot closed at end of stream");
        }

        self.reset();
        events
    }

    /// Return to IDLE and forget all history. Emits nothing.
    pub fn reset(&mut self) {
        self.state = ShotState::default();
        self.window.clear();
        self.last_valid_ts = None;
        self.in_gap = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic::{canonical_shot, sample_at, ShotScript};
    use hoopcam_models::ShotEventKind;

    fn config() -> DetectionConfig {
        DetectionConfig::default()
    }

    fn run(machine: &mut ShotStateMachine, samples: &[FeatureSample]) -> Vec<ShotEvent> {
        samples
            .iter()
            .flat_map(|s| machine.step(MachineInput::Sample(s.clone())))
            .collect()
    }

    fn kinds(events: &[ShotEvent]) -> Vec<ShotEventKind> {
        events.iter().map(|e| e.kind).collect()
    }

    #[test]
    fn test_canonical_shot_emits_one_pair() {
        let script = canonical_shot(30.0);
        let mut machine = ShotStateMachine::new(config());

        let events = run(&mut machine, &script.samples());
        assert_eq!(kinds(&events), vec![ShotEventKind::Start, ShotEventKind::End]);

        // START carries the release-crossing timestamp
        let start = &events[0];
        assert_eq!(start.trigger.frame_index, script.release_frame());
        assert!(start.timestamp < events[1].timestamp);

        let summary = events[1].summary.as_ref().unwrap();
        assert!((summary.peak_wrist_velocity - 3.0).abs() < 1e-9);
        assert!((summary.min_windup_elbow_angle - 45.0).abs() < 1e-9);
        assert!((summary.peak_extension - 2.3).abs() < 1e-9);
    }

    #[test]
    fn test_replay_is_deterministic() {
        let samples = canonical_shot(30.0).samples();
        let first = run(&mut ShotStateMachine::new(config()), &samples);
        let second = run(&mut ShotStateMachine::new(config()), &samples);
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn test_phase_progression() {
        let script = canonical_shot(30.0);
        let mut machine = ShotStateMachine::new(config());
        let mut phases = vec![machine.phase()];
        for s in script.samples() {
            machine.step(MachineInput::Sample(s));
            if phases.last() != Some(&machine.phase()) {
                phases.push(machine.phase());
            }
        }
        assert_eq!(
            phases,
            vec![
                ShotPhase::Idle,
                ShotPhase::Windup,
                ShotPhase::Release,
                ShotPhase::FollowThrough,
                ShotPhase::Cooldown,
            ]
        );
    }

    #[test]
    fn test_interruption_during_release_emits_nothing() {
        let script = canonical_shot(30.0);
        let samples = script.samples();
        let mut machine = ShotStateMachine::new(config());

        let cut = script.release_frame() as usize + 1;
        let events = run(&mut machine, &samples[..cut]);
        assert!(events.is_empty());
        assert_eq!(machine.phase(), ShotPhase::Release);

        let last_ts = samples[cut - 1].timestamp;
        let events = machine.step(MachineInput::Interrupted {
            timestamp: last_ts + 0.01,
        });
        assert!(events.is_empty());
        assert_eq!(machine.phase(), ShotPhase::Idle);
    }

    #[test]
    fn test_gap_during_release_emits_nothing() {
        let script = canonical_shot(30.0);
        let samples = script.samples();
        let mut machine = ShotStateMachine::new(config());

        let cut = script.release_frame() as usize + 1;
        let mut events = run(&mut machine, &samples[..cut]);

        // Resume 1s later with a settled arm
        let resume = samples[cut - 1].timestamp + 1.0;
        let later: Vec<_> = (0..10)
            .map(|i| sample_at(cut as u64 + 30 + i, resume + i as f64 / 30.0, 165.0, 0.1, 1.8, -1.0))
            .collect();
        events.extend(run(&mut machine, &later));

        assert!(events.is_empty());
        assert_eq!(machine.phase(), ShotPhase::Idle);
    }

    #[test]
    fn test_low_confidence_blip_tolerated() {
        let script = canonical_shot(30.0);
        let samples = script.samples();
        let mut machine = ShotStateMachine::new(config());
        let mut events = Vec::new();

        for (i, s) in samples.iter().enumerate() {
            if i == script.release_frame() as usize + 1 {
                // Single dropped frame inside RELEASE
                events.extend(machine.step(MachineInput::LowConfidence {
                    timestamp: s.timestamp,
                }));
                continue;
            }
            events.extend(machine.step(MachineInput::Sample(s.clone())));
        }
        assert_eq!(kinds(&events), vec![ShotEventKind::Start, ShotEventKind::End]);
    }

    #[test]
    fn test_refractory_collapses_second_motion() {
        let fps = 30.0;
        let first = canonical_shot(fps);
        let mut samples = first.samples();
        let end_offset = samples.len() as u64;

        // A second full motion starts right after the first ends
        let second = ShotScript::new(fps)
            .with_idle_frames(2)
            .with_offset(end_offset, samples.last().unwrap().timestamp + 1.0 / fps);
        samples.extend(second.samples());

        let config = DetectionConfig {
            refractory_secs: 2.0,
            ..config()
        };
        let events = run(&mut ShotStateMachine::new(config), &samples);
        assert_eq!(kinds(&events), vec![ShotEventKind::Start, ShotEventKind::End]);
    }

    #[test]
    fn test_two_shots_outside_refractory() {
        let fps = 30.0;
        let mut samples = canonical_shot(fps).samples();
        let offset = samples.len() as u64;
        let second = ShotScript::new(fps)
            .with_idle_frames(40)
            .with_offset(offset, samples.last().unwrap().timestamp + 1.0 / fps);
        samples.extend(second.samples());

        let events = run(&mut ShotStateMachine::new(config()), &samples);
        assert_eq!(
            kinds(&events),
            vec![
                ShotEventKind::Start,
                ShotEventKind::End,
                ShotEventKind::Start,
                ShotEventKind::End
            ]
        );
        assert!(events[1].timestamp < events[2].timestamp);
    }

    #[test]
    fn test_windup_timeout_returns_to_idle() {
        let script = canonical_shot(30.0);
        let samples = script.samples();
        let mut machine = ShotStateMachine::new(config());
        let windup_end = script.release_frame() as usize - 1;
        run(&mut machine, &samples[..windup_end]);
        assert_eq!(machine.phase(), ShotPhase::Windup);

        // Hold the loaded arm for 2s without releasing
        let last = samples[windup_end - 1].timestamp;
        let hold: Vec<_> = (1..=60)
            .map(|i| sample_at(100 + i, last + i as f64 / 30.0, 50.0, 0.0, 1.0, 0.5))
            .collect();
        let events = run(&mut machine, &hold);
        assert!(events.is_empty());
        assert_ne!(machine.phase(), ShotPhase::Windup);
    }

    #[test]
    fn test_release_below_shoulder_gated() {
        let script = canonical_shot(30.0).with_release_wrist_height(-0.5);
        let events = run(&mut ShotStateMachine::new(config()), &script.samples());
        assert!(events.is_empty());

        let ungated = DetectionConfig {
            release_min_wrist_height: None,
            ..config()
        };
        let events = run(&mut ShotStateMachine::new(ungated), &script.samples());
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn test_finish_mid_release_closes_shot() {
        let script = canonical_shot(30.0);
        let samples = script.samples();
        let mut machine = ShotStateMachine::new(config());
        let cut = script.release_frame() as usize + 2;
        assert!(run(&mut machine, &samples[..cut]).is_empty());

        let events = machine.finish();
        assert_eq!(kinds(&events), vec![ShotEventKind::Start, ShotEventKind::End]);
        assert_eq!(events[1].timestamp, samples[cut - 1].timestamp);
        assert_eq!(machine.phase(), ShotPhase::Idle);
    }

    #[test]
    fn test_finish_discards_windup() {
        let script = canonical_shot(30.0);
        let samples = script.samples();
        let mut machine = ShotStateMachine::new(config());
        run(&mut machine, &samples[..script.release_frame() as usize - 1]);
        assert_eq!(machine.phase(), ShotPhase::Windup);
        assert!(machine.finish().is_empty());
    }

    #[test]
    fn test_interrupt_in_follow_through_closes_shot() {
        let script = canonical_shot(30.0);
        let samples = script.samples();
        let mut machine = ShotStateMachine::new(config());

        let mut events = Vec::new();
        for s in &samples {
            events.extend(machine.step(MachineInput::Sample(s.clone())));
            if machine.phase() == ShotPhase::FollowThrough {
                break;
            }
        }
        assert_eq!(events.len(), 1);

        let last_ts = events[0].timestamp + 0.5;
        let closing = machine.step(MachineInput::Interrupted { timestamp: last_ts });
        assert_eq!(kinds(&closing), vec![ShotEventKind::End]);
        assert_eq!(machine.phase(), ShotPhase::Cooldown);
    }

    #[test]
    fn test_single_noisy_sample_does_not_enter_windup() {
        let config = config();
        let mut machine = ShotStateMachine::new(config.clone());
        let relaxed = |i: u64| sample_at(i, i as f64 / 30.0, 165.0, 0.0, 1.8, -1.0);

        let before: Vec<_> = (0..10).map(relaxed).collect();
        assert!(run(&mut machine, &before).is_empty());

        // One bent-arm sample surrounded by relaxed ones
        let noisy = sample_at(10, 10.0 / 30.0, 50.0, 0.1, 1.0, 0.5);
        assert!(machine.step(MachineInput::Sample(noisy.clone())).is_empty());
        assert_eq!(machine.state(), &ShotState::Idle { streak: 1 });

        for i in 11..30 {
            assert!(machine.step(MachineInput::Sample(relaxed(i))).is_empty());
            assert_eq!(machine.phase(), ShotPhase::Idle);
        }
        assert_eq!(machine.state(), &ShotState::Idle { streak: 0 });

        // The same sample repeated does reach the debounce count
        let mut window = FeatureWindow::new(config.bend_window);
        before.into_iter().for_each(|s| window.push(s));
        let once = transition(
            &config,
            &ShotState::default(),
            &window,
            &MachineInput::Sample(noisy.clone()),
        );
        assert_eq!(once.next, ShotState::Idle { streak: 1 });

        let twice = transition(&config, &once.next, &window, &MachineInput::Sample(noisy));
        assert_eq!(twice.next.phase(), ShotPhase::Windup);
    }

    #[test]
    fn test_velocity_in_hysteresis_band_holds_release() {
        let config = config();
        let script = canonical_shot(30.0);
        let samples = script.samples();
        let mut machine = ShotStateMachine::new(config.clone());

        let release = script.release_frame();
        assert!(run(&mut machine, &samples[..=release as usize]).is_empty());
        assert_eq!(machine.phase(), ShotPhase::Release);
        let peak_extension = samples[release as usize].extension;

        // Between the follow-through and release thresholds
        let band = [1.0, 1.4, 0.85, 1.45, 0.9, 1.3];
        for (k, velocity) in band.into_iter().enumerate() {
            assert!(velocity > config.follow_through_velocity);
            assert!(velocity < config.release_velocity);
            let i = release + 1 + k as u64;
            let sample = sample_at(i, i as f64 / 30.0, 150.0, velocity, peak_extension, 1.5);
            assert!(machine.step(MachineInput::Sample(sample)).is_empty());
            assert_eq!(machine.phase(), ShotPhase::Release);
        }

        let i = release + 1 + band.len() as u64;
        let settled = sample_at(i, i as f64 / 30.0, 160.0, 0.5, peak_extension, 1.5);
        let events = machine.step(MachineInput::Sample(settled));
        assert_eq!(kinds(&events), vec![ShotEventKind::Start]);
        assert_eq!(events[0].trigger.frame_index, release);
        assert_eq!(machine.phase(), ShotPhase::FollowThrough);
    }

    #[test]
    fn test_pure_transition_from_cooldown() {
        let config = config();
        let state = ShotState::Cooldown { entered_at: 1.0 };
        let window = FeatureWindow::new(4);

        let early = sample_at(0, 1.5, 165.0, 0.0, 1.8, -1.0);
        let result = transition(&config, &state, &window, &MachineInput::Sample(early));
        assert_eq!(result.next, state);

        let late = sample_at(1, 2.0, 165.0, 0.0, 1.8, -1.0);
        let result = transition(&config, &state, &window, &MachineInput::Sample(late));
        assert_eq!(result.next, ShotState::Idle { streak: 0 });
        assert!(result.event.is_none());
    }
}
