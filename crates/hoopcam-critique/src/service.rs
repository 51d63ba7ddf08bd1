//! Critique service seam.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::CritiqueResult;
use hoopcam_models::{FeatureSummary, Segment, SessionId, ShotId, ShotOutcome};

/// One shot submitted for critique.
#[derive(Debug, Clone)]
pub struct CritiqueRequest {
    pub session_id: SessionId,
    pub shot_id: ShotId,
    /// Shared with the session; never copied
    pub segment: Arc<Segment>,
    pub summary: FeatureSummary,
}

/// Critique returned for a shot.
#[derive(Debug, Clone, PartialEq)]
pub struct CritiqueResponse {
    pub shot_id: ShotId,
    pub critique_text: String,
    pub outcome: Option<ShotOutcome>,
}

/// External shot critique collaborator.
///
/// Calls may take seconds and can fail; callers bound them with a timeout.
#[async_trait]
pub trait CritiqueService: Send + Sync {
    /// Critique one shot. The response carries the request's shot ID.
    async fn critique(&self, request: CritiqueRequest) -> CritiqueResult<CritiqueResponse>;

    /// Condense a session's critiques, in shot order, into coaching notes.
    async fn summarize_session(&self, critiques: &[(ShotId, String)]) -> CritiqueResult<String>;

    /// Name for logs.
    fn name(&self) -> &str;
}
