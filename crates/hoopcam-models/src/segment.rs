//! Captured shot segments.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{Frame, ShotId};

/// A finalized clip of one shot: pre-roll + live + post-roll frames.
///
/// Frames are contiguous and in timestamp order.
#[derive(Debug, Clone)]
pub struct Segment {
    pub shot_id: ShotId,
    /// Shot START event timestamp
    pub shot_start: f64,
    /// Shot END event timestamp
    pub shot_end: f64,
    pub frames: Vec<Frame>,
}

impl Segment {
    /// Segment for a shot from ordered frames.
    pub fn new(shot_id: ShotId, shot_start: f64, shot_end: f64, frames: Vec<Frame>) -> Self {
        Self {
            shot_id,
            shot_start,
            shot_end,
            frames,
        }
    }

    /// Timestamp of the first captured frame (pre-roll start).
    pub fn start_time(&self) -> f64 {
        self.frames
            .first()
            .map(|f| f.timestamp)
            .unwrap_or(self.shot_start)
    }

    /// Timestamp of the last captured frame (post-roll end).
    pub fn end_time(&self) -> f64 {
        self.frames
            .last()
            .map(|f| f.timestamp)
            .unwrap_or(self.shot_end)
    }

    /// Span from first to last frame, in seconds.
    pub fn duration(&self) -> f64 {
        self.end_time() - self.start_time()
    }

    /// Number of frames captured.
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Frames carrying an image payload.
    pub fn image_frames(&self) -> impl Iterator<Item = &Frame> {
        self.frames.iter().filter(|f| f.has_image())
    }

    /// Check the contiguity invariant: strictly increasing timestamps and indices.
    pub fn is_ordered(&self) -> bool {
        self.frames
            .windows(2)
            .all(|w| w[0].timestamp < w[1].timestamp && w[0].index < w[1].index)
    }

    /// Lightweight reference stored on the shot record.
    pub fn to_ref(&self) -> SegmentRef {
        SegmentRef {
            shot_id: self.shot_id,
            start_time: self.start_time(),
            end_time: self.end_time(),
            shot_start: self.shot_start,
            shot_end: self.shot_end,
            frame_count: self.frame_count(),
        }
    }
}

/// Serializable handle describing a segment without its frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SegmentRef {
    pub shot_id: ShotId,
    /// First frame timestamp (seconds)
    pub start_time: f64,
    /// Last frame timestamp (seconds)
    pub end_time: f64,
    /// Shot START timestamp (seconds)
    pub shot_start: f64,
    /// Shot END timestamp (seconds)
    pub shot_end: f64,
    pub frame_count: usize,
}
