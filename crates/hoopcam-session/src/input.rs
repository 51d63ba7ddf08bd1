//! JSON Lines frame input.
//!
//! One object per line:
//!
//! ```json
//! {"index": 0, "timestamp": 0.0, "landmarks": [{"index": 12, "x": 0.5, "y": 0.4, "visibility": 0.9}], "image": "<base64 jpeg>"}
//! ```
//!
//! `landmarks` may be null or absent when the estimator found nobody.
//! `{"interrupted": true, "timestamp": 3.2}` marks a camera disconnect.

use base64::Engine;
use serde::Deserialize;

use crate::error::{SessionError, SessionResult};
use hoopcam_detect::{Observation, RawLandmark, RawPose};
use hoopcam_models::Frame;

#[derive(Debug, Clone, Deserialize)]
pub struct FrameLine {
    #[serde(default)]
    pub index: Option<u64>,
    pub timestamp: f64,
    #[serde(default)]
    pub landmarks: Option<Vec<RawLandmark>>,
    /// Base64-encoded image bytes
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub interrupted: bool,
}

/// A parsed input line.
#[derive(Debug)]
pub enum FrameInput {
    Frame { frame: Frame, observation: Observation },
    Interrupted { timestamp: f64 },
}

impl FrameLine {
    /// Parse one JSON line.
    pub fn parse(line: &str) -> SessionResult<Self> {
        let parsed: Self = serde_json::from_str(line)?;
        if !parsed.timestamp.is_finite() || parsed.timestamp < 0.0 {
            return Err(SessionError::invalid_input(format!(
                "timestamp must be a non-negative number, got {}",
                parsed.timestamp
            )));
        }
        Ok(parsed)
    }

    /// Convert into a frame and its observation.
    pub fn into_input(self) -> SessionResult<FrameInput> {
        if self.interrupted {
            return Ok(FrameInput::Interrupted {
                timestamp: self.timestamp,
            });
        }

        let index = self
            .index
            .ok_or_else(|| SessionError::invalid_input("frame line without an index"))?;

        let frame = match self.image {
            Some(encoded) => {
                let bytes = base64::engine::general_purpose::STANDARD
                    .decode(encoded.as_bytes())
                    .map_err(|e| SessionError::invalid_input(format!("frame {}: bad image: {}", index, e)))?;
                Frame::new(index, self.timestamp, bytes)
            }
            None => Frame::metadata_only(index, self.timestamp),
        };

        let observation = match self.landmarks {
            Some(landmarks) if !landmarks.is_empty() => Observation::Pose(RawPose::new(landmarks)),
            _ => Observation::Missing,
        };

        Ok(FrameInput::Frame { frame, observation })
    }
}

/// Parse one line straight to a pipeline input. Blank lines yield `None`.
pub fn parse_line(line: &str) -> SessionResult<Option<FrameInput>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    FrameLine::parse(line)?.into_input().map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pose_line() {
        let line = r#"{"index": 3, "timestamp": 0.1, "landmarks": [{"index": 12, "x": 0.5, "y": 0.4, "visibility": 0.9}]}"#;
        match parse_line(line).unwrap().unwrap() {
            FrameInput::Frame { frame, observation } => {
                assert_eq!(frame.index, 3);
                assert!(!frame.has_image());
                match observation {
                    Observation::Pose(pose) => assert_eq!(pose.landmarks[0].confidence, 0.9),
                    other => panic!("expected pose, got {:?}", other),
                }
            }
            other => panic!("expected frame, got {:?}", other),
        }
    }

    #[test]
    fn test_null_landmarks_are_missing() {
        let line = r#"{"index": 4, "timestamp": 0.13, "landmarks": null, "image": "aGVsbG8="}"#;
        match parse_line(line).unwrap().unwrap() {
            FrameInput::Frame { frame, observation } => {
                assert_eq!(&frame.data[..], b"hello");
                assert!(matches!(observation, Observation::Missing));
            }
            other => panic!("expected frame, got {:?}", other),
        }
    }

    #[test]
    fn test_interruption_line() {
        let input = parse_line(r#"{"interrupted": true, "timestamp": 3.2}"#).unwrap().unwrap();
        assert!(matches!(input, FrameInput::Interrupted { timestamp } if timestamp == 3.2));
    }

    #[test]
    fn test_rejects_bad_lines() {
        assert!(parse_line("   ").unwrap().is_none());
        assert!(matches!(parse_line("{not json"), Err(SessionError::Json(_))));
        assert!(matches!(
            parse_line(r#"{"timestamp": 1.0}"#),
            Err(SessionError::InvalidInput(_))
        ));
        assert!(matches!(
            parse_line(r#"{"index": 1, "timestamp": -1.0}"#),
            Err(SessionError::InvalidInput(_))
        ));
        assert!(matches!(
            parse_line(r#"{"index": 1, "timestamp": 1.0, "image": "%%%"}"#),
            Err(SessionError::InvalidInput(_))
        ));
    }
}
