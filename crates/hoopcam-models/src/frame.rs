//! Video frame handle.

use std::fmt;
use std::sync::Arc;

/// One captured video frame.
///
/// The payload is an opaque encoded image (typically JPEG) shared by
/// reference, so the pre-roll buffer and an open segment can hold the same
/// frame without copying pixels.
#[derive(Clone)]
pub struct Frame {
    /// Monotonic frame counter from the capture source
    pub index: u64,
    /// Video timestamp in seconds
    pub timestamp: f64,
    /// Encoded image bytes (may be empty when only metadata is captured)
    pub data: Arc<[u8]>,
}

impl Frame {
    /// Frame carrying encoded image bytes.
    pub fn new(index: u64, timestamp: f64, data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            index,
            timestamp,
            data: data.into(),
        }
    }

    /// Frame without an image payload.
    pub fn metadata_only(index: u64, timestamp: f64) -> Self {
        Self::new(index, timestamp, Vec::new())
    }

    /// Whether image bytes are attached.
    pub fn has_image(&self) -> bool {
        !self.data.is_empty()
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("index", &self.index)
            .field("timestamp", &self.timestamp)
            .field("bytes", &self.data.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clone_shares_payload() {
        let frame = Frame::new(1, 0.033, vec![1u8, 2, 3]);
        let copy = frame.clone();
        assert!(Arc::ptr_eq(&frame.data, &copy.data));
        assert!(copy.has_image());
        assert!(!Frame::metadata_only(2, 0.066).has_image());
    }

    #[test]
    fn test_debug_omits_bytes() {
        let frame = Frame::new(7, 1.0, vec![0u8; 1024]);
        let text = format!("{:?}", frame);
        assert!(text.contains("bytes: 1024"));
    }
}
