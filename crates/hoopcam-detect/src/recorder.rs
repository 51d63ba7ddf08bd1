//! Pre-roll ring buffer and segment recorder.
//!
//! Every frame enters a fixed-capacity ring. On START the recorder seeds a
//! new segment from the ring, reaching back `pre_roll_secs` before the
//! START timestamp, then appends live frames. On END it keeps appending
//! until `post_roll_secs` past END and hands off the finalized capture.
//! The pre-roll seed never reaches back past the last frame of the previous
//! capture, so consecutive segments are disjoint.

use std::collections::VecDeque;
use tracing::{debug, warn};

use crate::config::DetectionConfig;
use hoopcam_models::{FeatureSummary, Frame, Segment, ShotEvent, ShotId};

/// Slack for matching frame timestamps against computed boundaries.
const BOUNDARY_EPSILON: f64 = 1e-6;

/// A finalized segment awaiting a shot ID.
#[derive(Debug, Clone)]
pub struct SegmentCapture {
    pub shot_start: f64,
    pub shot_end: f64,
    pub summary: FeatureSummary,
    pub frames: Vec<Frame>,
}

impl SegmentCapture {
    /// Attach the session-assigned shot ID.
    pub fn into_segment(self, shot_id: ShotId) -> Segment {
        Segment::new(shot_id, self.shot_start, self.shot_end, self.frames)
    }

    /// Timestamp of the first captured frame.
    pub fn first_timestamp(&self) -> Option<f64> {
        self.frames.first().map(|f| f.timestamp)
    }

    /// Timestamp of the last captured frame.
    pub fn last_timestamp(&self) -> Option<f64> {
        self.frames.last().map(|f| f.timestamp)
    }
}

#[derive(Debug)]
enum RecorderState {
    Idle,
    Recording {
        shot_start: f64,
        frames: Vec<Frame>,
    },
    PostRoll {
        shot_start: f64,
        shot_end: f64,
        summary: FeatureSummary,
        deadline: f64,
        frames: Vec<Frame>,
    },
}

/// Captures shot segments from the live frame stream.
#[derive(Debug)]
pub struct SegmentRecorder {
    ring: VecDeque<Frame>,
    capacity: usize,
    pre_roll_secs: f64,
    post_roll_secs: f64,
    state: RecorderState,
    /// Timestamp of the last frame handed off in a capture.
    last_captured: Option<f64>,
}

impl SegmentRecorder {
    /// Recorder with a ring of `capacity` frames (at least one).
    pub fn new(capacity: usize, pre_roll_secs: f64, post_roll_secs: f64) -> Self {
        let capacity = capacity.max(1);
        Self {
            ring: VecDeque::with_capacity(capacity),
            capacity,
            pre_roll_secs,
            post_roll_secs,
            state: RecorderState::Idle,
            last_captured: None,
        }
    }

    /// Recorder sized and timed by a detection config.
    pub fn from_config(config: &DetectionConfig) -> Self {
        Self::new(
            config.ring_capacity(),
            config.pre_roll_secs,
            config.post_roll_secs,
        )
    }

    /// Whether a segment is open (recording or in post-roll).
    pub fn is_capturing(&self) -> bool {
        !matches!(self.state, RecorderState::Idle)
    }

    /// Number of frames currently held in the pre-roll ring.
    pub fn buffered(&self) -> usize {
        self.ring.len()
    }

    /// Add a live frame. Returns a capture when the post-roll completes.
    pub fn push_frame(&mut self, frame: Frame) -> Option<SegmentCapture> {
        if let Some(last) = self.ring.back() {
            if frame.timestamp <= last.timestamp {
                warn!(
                    index = frame.index,
                    timestamp = frame.timestamp,
                    previous = last.timestamp,
                    "Dropping out-of-order frame"
                );
                return None;
            }
        }

        if self.ring.len() == self.capacity {
            self.ring.pop_front();
        }
        self.ring.push_back(frame.clone());

        match &mut self.state {
            RecorderState::Idle => None,
            RecorderState::Recording { frames, .. } => {
                frames.push(frame);
                None
            }
            RecorderState::PostRoll {
                frames, deadline, ..
            } => {
                let done = frame.timestamp >= *deadline - BOUNDARY_EPSILON;
                frames.push(frame);
                if done {
                    self.finalize()
                } else {
                    None
                }
            }
        }
    }

    /// React to a shot boundary. Returns a capture when an END with zero
    /// post-roll completes immediately.
    pub fn on_event(&mut self, event: &ShotEvent) -> Option<SegmentCapture> {
        if event.is_start() {
            self.open(event.timestamp);
            return None;
        }

        let Some(summary) = event.summary.clone() else {
            warn!(timestamp = event.timestamp, "END event without summary");
            return None;
        };

        match std::mem::replace(&mut self.state, RecorderState::Idle) {
            RecorderState::Recording { shot_start, frames } => {
                let deadline = event.timestamp + self.post_roll_secs;
                let reached = frames
                    .last()
                    .is_some_and(|f| f.timestamp >= deadline - BOUNDARY_EPSILON);
                self.state = RecorderState::PostRoll {
                    shot_start,
                    shot_end: event.timestamp,
                    summary,
                    deadline,
                    frames,
                };
                if reached {
                    self.finalize()
                } else {
                    None
                }
            }
            other => {
                warn!(
                    timestamp = event.timestamp,
                    "END event with no open segment, ignoring"
                );
                self.state = other;
                None
            }
        }
    }

    fn open(&mut self, shot_start: f64) {
        if self.is_capturing() {
            warn!(shot_start, "START while a segment is open, ignoring");
            return;
        }

        let boundary = shot_start - self.pre_roll_secs;
        let first = self
            .ring
            .iter()
            .rposition(|f| f.timestamp <= boundary + BOUNDARY_EPSILON)
            .unwrap_or(0);
        let after_previous = self.last_captured.map_or(0, |ts| {
            self.ring
                .iter()
                .position(|f| f.timestamp > ts + BOUNDARY_EPSILON)
                .unwrap_or(self.ring.len())
        });
        let first = first.max(after_previous);

        let frames: Vec<Frame> = self.ring.iter().skip(first).cloned().collect();
        debug!(
            shot_start,
            pre_roll_frames = frames.len(),
            first_timestamp = frames.first().map(|f| f.timestamp),
            "Segment opened"
        );
        self.state = RecorderState::Recording { shot_start, frames };
    }

    fn finalize(&mut self) -> Option<SegmentCapture> {
        match std::mem::replace(&mut self.state, RecorderState::Idle) {
            RecorderState::PostRoll {
                shot_start,
                shot_end,
                summary,
                frames,
                ..
            } => {
                metrics::counter!("hoopcam_segments_finalized_total").increment(1);
                if let Some(last) = frames.last() {
                    self.last_captured = Some(last.timestamp);
                }
                debug!(
                    shot_start,
                    shot_end,
                    frames = frames.len(),
                    "Segment finalized"
                );
                Some(SegmentCapture {
                    shot_start,
                    shot_end,
                    summary,
                    frames,
                })
            }
            other => {
                self.state = other;
                None
            }
        }
    }

    /// End of stream: finalize a segment in post-roll with whatever frames
    /// it has. A segment still waiting for END is dropped.
    pub fn flush(&mut self) -> Option<SegmentCapture> {
        match &self.state {
            RecorderState::PostRoll { .. } => self.finalize(),
            RecorderState::Recording { shot_start, .. } => {
                warn!(shot_start = *shot_start, "Dropping segment without END at flush");
                self.state = RecorderState::Idle;
                None
            }
            RecorderState::Idle => None,
        }
    }
}
