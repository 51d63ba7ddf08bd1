//! Offline critique from pose features alone.
//!
//! Used when no Gemini key is configured. It cannot see the ball, so it
//! never reports an outcome.

use async_trait::async_trait;

use crate::error::{CritiqueError, CritiqueResult};
use crate::service::{CritiqueRequest, CritiqueResponse, CritiqueService};
use hoopcam_models::{FeatureSummary, ShotId};

/// Deepest elbow load (degrees) still considered a compact set point.
const GOOD_LOAD_ANGLE: f64 = 70.0;
/// Peak wrist speed (body scales/s) below which the shot looks pushed.
const SOFT_RELEASE_VELOCITY: f64 = 2.0;
/// Peak extension below which the arm never fully finished.
const SHORT_EXTENSION: f64 = 1.8;

/// Rule-based critique service.
#[derive(Debug, Clone, Default)]
pub struct HeuristicCritiqueService;

impl HeuristicCritiqueService {
    /// Offline critic with no configuration.
    pub fn new() -> Self {
        Self
    }

    fn critique_text(summary: &FeatureSummary) -> String {
        let mut bullets = Vec::new();

        if summary.min_windup_elbow_angle <= GOOD_LOAD_ANGLE {
            bullets.push(format!(
                "- Compact load: elbow closed to {:.0}°.",
                summary.min_windup_elbow_angle
            ));
        } else {
            bullets.push(format!(
                "- Load deeper: the elbow only closed to {:.0}°.",
                summary.min_windup_elbow_angle
            ));
        }

        if summary.peak_wrist_velocity < SOFT_RELEASE_VELOCITY {
            bullets.push("- Release looked pushed. Snap the wrist through.".to_string());
        } else {
            bullets.push(format!(
                "- Quick release at {:.1} body lengths per second.",
                summary.peak_wrist_velocity
            ));
        }

        if summary.peak_extension < SHORT_EXTENSION {
            bullets.push("- Finish taller. Hold the follow-through until the ball lands.".to_string());
        } else {
            bullets.push("- Full extension on the follow-through. Keep it.".to_string());
        }

        bullets.join("\n")
    }
}

#[async_trait]
impl CritiqueService for HeuristicCritiqueService {
    async fn critique(&self, request: CritiqueRequest) -> CritiqueResult<CritiqueResponse> {
        Ok(CritiqueResponse {
            shot_id: request.shot_id,
            critique_text: Self::critique_text(&request.summary),
            outcome: None,
        })
    }

    async fn summarize_session(&self, critiques: &[(ShotId, String)]) -> CritiqueResult<String> {
        if critiques.is_empty() {
            return Err(CritiqueError::failed("no critiques to summarize"));
        }

        let pushed = critiques
            .iter()
            .filter(|(_, text)| text.contains("pushed"))
            .count();
        let shallow = critiques
            .iter()
            .filter(|(_, text)| text.contains("Load deeper"))
            .count();

        let mut summary = format!("{} shots reviewed.", critiques.len());
        if pushed > 0 {
            summary.push_str(&format!(" {} looked pushed; work on wrist snap.", pushed));
        }
        if shallow > 0 {
            summary.push_str(&format!(" {} had a shallow load; sit into the set point.", shallow));
        }
        if pushed == 0 && shallow == 0 {
            summary.push_str(" Mechanics held up shot to shot. Keep stacking reps.");
        }
        Ok(summary)
    }

    fn name(&self) -> &str {
        "heuristic"
    }
}
