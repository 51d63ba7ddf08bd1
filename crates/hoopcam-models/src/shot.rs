//! Shot phases, events and records.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{FeatureSample, FeatureSummary, SegmentRef};

/// Phase of the shot motion state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum ShotPhase {
    #[default]
    Idle,
    Windup,
    Release,
    FollowThrough,
    Cooldown,
}

impl ShotPhase {
    /// Lowercase phase name for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            ShotPhase::Idle => "idle",
            ShotPhase::Windup => "windup",
            ShotPhase::Release => "release",
            ShotPhase::FollowThrough => "follow_through",
            ShotPhase::Cooldown => "cooldown",
        }
    }

    /// Whether a shot is in flight (an interruption discards it).
    pub fn is_mid_shot(&self) -> bool {
        matches!(self, ShotPhase::Windup | ShotPhase::Release)
    }
}

impl fmt::Display for ShotPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ShotEventKind {
    Start,
    End,
}

/// Shot boundary emitted by the state machine. Never mutated after emission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ShotEvent {
    pub kind: ShotEventKind,
    /// Video timestamp of the boundary in seconds
    pub timestamp: f64,
    /// Sample that triggered the boundary
    pub trigger: FeatureSample,
    /// Feature highlights, present on END events
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<FeatureSummary>,
}

impl ShotEvent {
    /// START stamped with the release-crossing sample.
    pub fn start(trigger: FeatureSample) -> Self {
        Self {
            kind: ShotEventKind::Start,
            timestamp: trigger.timestamp,
            trigger,
            summary: None,
        }
    }

    /// END with the shot's feature summary.
    pub fn end(timestamp: f64, trigger: FeatureSample, summary: FeatureSummary) -> Self {
        Self {
            kind: ShotEventKind::End,
            timestamp,
            trigger,
            summary: Some(summary),
        }
    }

    /// Whether this is a START boundary.
    pub fn is_start(&self) -> bool {
        self.kind == ShotEventKind::Start
    }

    /// Whether this is an END boundary.
    pub fn is_end(&self) -> bool {
        self.kind == ShotEventKind::End
    }
}

/// Session-scoped shot identifier, assigned monotonically from 1.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(transparent)]
pub struct ShotId(pub u32);

impl ShotId {
    /// ID of the first shot in a session.
    pub fn first() -> Self {
        Self(1)
    }

    /// The following shot ID.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Numeric value.
    pub fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for ShotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether the ball went in, as judged by the critique service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ShotOutcome {
    Made,
    Missed,
}

impl ShotOutcome {
    /// Parse a loose model verdict such as "MADE" or "missed".
    pub fn parse(text: &str) -> Option<Self> {
        let upper = text.trim().to_uppercase();
        if upper.contains("MISS") {
            Some(ShotOutcome::Missed)
        } else if upper.contains("MADE") || upper.contains("MAKE") {
            Some(ShotOutcome::Made)
        } else {
            None
        }
    }
}

/// Lifecycle of the external critique for one shot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CritiqueStatus {
    /// Request dispatched, response outstanding
    #[default]
    Pending,
    /// Critique text attached
    Resolved,
    /// Service failed permanently
    Failed { reason: String },
    /// No response within the bounded timeout
    TimedOut { after_secs: u64 },
}

impl CritiqueStatus {
    /// Whether the critique has not resolved yet.
    pub fn is_pending(&self) -> bool {
        matches!(self, CritiqueStatus::Pending)
    }

    /// Status label used in metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            CritiqueStatus::Pending => "pending",
            CritiqueStatus::Resolved => "resolved",
            CritiqueStatus::Failed { .. } => "failed",
            CritiqueStatus::TimedOut { .. } => "timed_out",
        }
    }
}

/// One detected shot within a session.
///
/// Created when a segment finalizes. The critique fields are written at most
/// once, when the external call resolves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ShotRecord {
    pub shot_id: ShotId,
    /// Captured video segment bounds
    pub segment: SegmentRef,
    /// Feature highlights of the shot motion
    pub summary: FeatureSummary,
    /// Critique text, null until resolved
    pub critique: Option<String>,
    pub critique_status: CritiqueStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<ShotOutcome>,
}

impl ShotRecord {
    /// Record awaiting its critique.
    pub fn new(shot_id: ShotId, segment: SegmentRef, summary: FeatureSummary) -> Self {
        Self {
            shot_id,
            segment,
            summary,
            critique: None,
            critique_status: CritiqueStatus::Pending,
            outcome: None,
        }
    }

    /// Whether the critique is still pending.
    pub fn is_awaiting_critique(&self) -> bool {
        self.critique_status.is_pending()
    }

    /// Attach critique text. Returns false if the record was already settled.
    pub fn resolve_critique(&mut self, text: String, outcome: Option<ShotOutcome>) -> bool {
        if !self.is_awaiting_critique() {
            return false;
        }
        self.critique = Some(text);
        self.outcome = outcome;
        self.critique_status = CritiqueStatus::Resolved;
        true
    }

    /// Record a critique failure. Returns false if the record was already settled.
    pub fn fail_critique(&mut self, status: CritiqueStatus) -> bool {
        if !self.is_awaiting_critique() || status.is_pending() {
            return false;
        }
        self.critique_status = status;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ArmSide;

    fn record() -> ShotRecord {
        ShotRecord::new(
            ShotId::first(),
            SegmentRef {
                shot_id: ShotId::first(),
                start_time: 3.5,
                end_time: 7.0,
                shot_start: 5.0,
                shot_end: 6.0,
                frame_count: 105,
            },
            FeatureSummary {
                side: ArmSide::Right,
                release_time: 5.0,
                end_time: 6.0,
                duration_secs: 1.0,
                release_elbow_angle: 90.0,
                min_windup_elbow_angle: 45.0,
                peak_wrist_velocity: 3.0,
                peak_extension: 2.0,
            },
        )
    }

    #[test]
    fn test_shot_id_sequence() {
        let id = ShotId::first();
        assert_eq!(id.value(), 1);
        assert_eq!(id.next(), ShotId(2));
        assert_eq!(id.to_string(), "1");
    }

    #[test]
    fn test_critique_written_once() {
        let mut rec = record();
        assert!(rec.is_awaiting_critique());
        assert!(rec.resolve_critique("Nice arc".into(), Some(ShotOutcome::Made)));
        assert!(!rec.resolve_critique("Second".into(), None));
        assert!(!rec.fail_critique(CritiqueStatus::TimedOut { after_secs: 20 }));
        assert_eq!(rec.critique.as_deref(), Some("Nice arc"));
        assert_eq!(rec.outcome, Some(ShotOutcome::Made));
    }

    #[test]
    fn test_failed_critique_keeps_record() {
        let mut rec = record();
        assert!(rec.fail_critique(CritiqueStatus::Failed {
            reason: "503".into()
        }));
        assert!(rec.critique.is_none());
        assert_eq!(rec.critique_status.as_str(), "failed");
        assert!(!rec.resolve_critique("late".into(), None));
    }

    #[test]
    fn test_outcome_parse() {
        assert_eq!(ShotOutcome::parse("MADE"), Some(ShotOutcome::Made));
        assert_eq!(ShotOutcome::parse(" missed\n"), Some(ShotOutcome::Missed));
        assert_eq!(ShotOutcome::parse("unclear"), None);
    }

    #[test]
    fn test_critique_status_serialization() {
        let json = serde_json::to_value(CritiqueStatus::TimedOut { after_secs: 20 }).unwrap();
        assert_eq!(json["status"], "timed_out");
        assert_eq!(json["after_secs"], 20);
    }

    #[test]
    fn test_mid_shot_phases() {
        assert!(ShotPhase::Windup.is_mid_shot());
        assert!(ShotPhase::Release.is_mid_shot());
        assert!(!ShotPhase::FollowThrough.is_mid_shot());
        assert_eq!(ShotPhase::FollowThrough.to_string(), "follow_through");
    }
}
