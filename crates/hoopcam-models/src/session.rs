//! Training session models.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use crate::{CritiqueStatus, Segment, ShotId, ShotOutcome, ShotRecord};

/// Unique identifier for a training session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    /// Generate a new random session ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Session ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One training session: an ordered collection of shot records.
///
/// Records are keyed by shot ID so that critique results can be matched
/// regardless of arrival order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub session_id: SessionId,
    pub started_at: DateTime<Utc>,
    /// Null while the session is active
    pub ended_at: Option<DateTime<Utc>>,
    pub records: BTreeMap<ShotId, ShotRecord>,
    /// Finalized segments, owned by the session once handed off
    #[serde(skip)]
    pub segments: BTreeMap<ShotId, Arc<Segment>>,
    /// Coaching summary over all critiques, if requested
    #[serde(default)]
    pub coaching_summary: Option<String>,
}

impl Session {
    /// Open session with no shots.
    pub fn new(session_id: SessionId) -> Self {
        Self {
            session_id,
            started_at: Utc::now(),
            ended_at: None,
            records: BTreeMap::new(),
            segments: BTreeMap::new(),
            coaching_summary: None,
        }
    }

    /// Whether the session is still accepting shots.
    pub fn is_active(&self) -> bool {
        self.ended_at.is_none()
    }

    /// Mark the session closed. Closing twice keeps the first end time.
    pub fn close(&mut self) {
        if self.ended_at.is_none() {
            self.ended_at = Some(Utc::now());
        }
    }

    /// Next shot ID to assign (monotonic, session-scoped).
    pub fn next_shot_id(&self) -> ShotId {
        self.records
            .keys()
            .next_back()
            .map(ShotId::next)
            .unwrap_or_else(ShotId::first)
    }

    /// Store a shot record with its segment.
    pub fn insert(&mut self, record: ShotRecord, segment: Arc<Segment>) {
        self.segments.insert(record.shot_id, segment);
        self.records.insert(record.shot_id, record);
    }

    /// Record for a shot ID.
    pub fn record(&self, shot_id: ShotId) -> Option<&ShotRecord> {
        self.records.get(&shot_id)
    }

    /// Segment for a shot ID.
    pub fn segment(&self, shot_id: ShotId) -> Option<Arc<Segment>> {
        self.segments.get(&shot_id).cloned()
    }

    /// Number of shots recorded.
    pub fn shot_count(&self) -> usize {
        self.records.len()
    }

    /// Attach critique text to the matching record. Returns false when the
    /// shot is unknown or already settled.
    pub fn resolve_critique(
        &mut self,
        shot_id: ShotId,
        text: String,
        outcome: Option<ShotOutcome>,
    ) -> bool {
        self.records
            .get_mut(&shot_id)
            .map(|r| r.resolve_critique(text, outcome))
            .unwrap_or(false)
    }

    /// Record a critique failure on the matching record.
    pub fn fail_critique(&mut self, shot_id: ShotId, status: CritiqueStatus) -> bool {
        self.records
            .get_mut(&shot_id)
            .map(|r| r.fail_critique(status))
            .unwrap_or(false)
    }

    /// Shot IDs whose critique is still pending.
    pub fn awaiting_critique(&self) -> Vec<ShotId> {
        self.records
            .values()
            .filter(|r| r.is_awaiting_critique())
            .map(|r| r.shot_id)
            .collect()
    }

    /// Resolved critique texts in shot order.
    pub fn critiques(&self) -> Vec<(ShotId, String)> {
        self.records
            .values()
            .filter_map(|r| r.critique.clone().map(|c| (r.shot_id, c)))
            .collect()
    }

    /// Snapshot of the session for reporting.
    pub fn summary(&self) -> SessionSummary {
        let shots: Vec<ShotRecord> = self.records.values().cloned().collect();
        let made = shots
            .iter()
            .filter(|r| r.outcome == Some(ShotOutcome::Made))
            .count();
        let missed = shots
            .iter()
            .filter(|r| r.outcome == Some(ShotOutcome::Missed))
            .count();

        SessionSummary {
            session_id: self.session_id.clone(),
            started_at: self.started_at,
            ended_at: self.ended_at,
            shot_count: shots.len(),
            made,
            missed,
            awaiting_critique: self.awaiting_critique(),
            shots,
            coaching_summary: self.coaching_summary.clone(),
        }
    }
}

/// Session report: the persisted/displayed artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SessionSummary {
    pub session_id: SessionId,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub shot_count: usize,
    pub made: usize,
    pub missed: usize,
    /// Shot records in shot-ID order
    pub shots: Vec<ShotRecord>,
    /// Shots whose critique has not resolved yet
    pub awaiting_critique: Vec<ShotId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coaching_summary: Option<String>,
}

impl SessionSummary {
    /// Peak release velocity across the session, if any shots were recorded.
    pub fn best_release_velocity(&self) -> Option<f64> {
        self.shots
            .iter()
            .map(|r| r.summary.peak_wrist_velocity)
            .fold(None, |acc, v| Some(acc.map_or(v, |a: f64| a.max(v))))
    }

    /// Mean release-to-end duration across recorded shots.
    pub fn mean_duration_secs(&self) -> Option<f64> {
        if self.shots.is_empty() {
            return None;
        }
        let total: f64 = self.shots.iter().map(|r| r.summary.duration_secs).sum();
        Some(total / self.shots.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ArmSide, FeatureSummary, Frame};

    fn add_shot(session: &mut Session, velocity: f64) -> ShotId {
        let id = session.next_shot_id();
        let segment = Segment::new(id, 1.0, 2.0, vec![Frame::metadata_only(0, 0.5)]);
        let record = ShotRecord::new(
            id,
            segment.to_ref(),
            FeatureSummary {
                side: ArmSide::Right,
                release_time: 1.0,
                end_time: 2.0,
                duration_secs: 1.0,
                release_elbow_angle: 90.0,
                min_windup_elbow_angle: 50.0,
                peak_wrist_velocity: velocity,
                peak_extension: 2.0,
            },
        );
        session.insert(record, Arc::new(segment));
        id
    }

    #[test]
    fn test_shot_ids_are_monotonic() {
        let mut session = Session::new(SessionId::new());
        assert_eq!(add_shot(&mut session, 2.0), ShotId(1));
        assert_eq!(add_shot(&mut session, 2.5), ShotId(2));
        assert_eq!(session.next_shot_id(), ShotId(3));
    }

    #[test]
    fn test_out_of_order_resolution_matches_by_id() {
        let mut session = Session::new(SessionId::new());
        let first = add_shot(&mut session, 2.0);
        let second = add_shot(&mut session, 2.5);

        assert!(session.resolve_critique(second, "two".into(), Some(ShotOutcome::Missed)));
        assert_eq!(session.awaiting_critique(), vec![first]);
        assert!(session.resolve_critique(first, "one".into(), Some(ShotOutcome::Made)));

        assert_eq!(session.record(first).unwrap().critique.as_deref(), Some("one"));
        assert_eq!(session.record(second).unwrap().critique.as_deref(), Some("two"));
        assert!(!session.resolve_critique(ShotId(9), "ghost".into(), None));
    }

    #[test]
    fn test_summary_counts() {
        let mut session = Session::new(SessionId::from_string("s-1"));
        let a = add_shot(&mut session, 2.0);
        let b = add_shot(&mut session, 3.5);
        add_shot(&mut session, 1.5);
        session.resolve_critique(a, "good".into(), Some(ShotOutcome::Made));
        session.fail_critique(b, CritiqueStatus::TimedOut { after_secs: 20 });
        session.close();

        let summary = session.summary();
        assert_eq!(summary.shot_count, 3);
        assert_eq!(summary.made, 1);
        assert_eq!(summary.missed, 0);
        assert_eq!(summary.awaiting_critique, vec![ShotId(3)]);
        assert_eq!(summary.best_release_velocity(), Some(3.5));
        assert_eq!(summary.mean_duration_secs(), Some(1.0));
        assert!(summary.ended_at.is_some());
        assert!(!session.is_active());
    }

    #[test]
    fn test_empty_summary_has_no_aggregates() {
        let summary = Session::new(SessionId::from_string("s-0")).summary();
        assert_eq!(summary.best_release_velocity(), None);
        assert_eq!(summary.mean_duration_secs(), None);
    }

    #[test]
    fn test_summary_json_shape() {
        let mut session = Session::new(SessionId::from_string("s-2"));
        add_shot(&mut session, 2.0);
        let json = serde_json::to_value(session.summary()).unwrap();
        assert_eq!(json["session_id"], "s-2");
        assert!(json["shots"][0]["critique"].is_null());
        assert_eq!(json["shots"][0]["critique_status"]["status"], "pending");
        assert!(json.get("coaching_summary").is_none());
    }
}
