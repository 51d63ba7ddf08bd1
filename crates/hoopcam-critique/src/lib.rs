//! Shot critique collaborator.
//!
//! Defines the `CritiqueService` seam used by the session layer and a
//! Gemini-backed implementation that sends sampled segment frames plus the
//! shot's feature summary to a multimodal model.

pub mod config;
pub mod error;
pub mod gemini;
pub mod heuristic;
pub mod prompts;
pub mod service;

pub use config::CritiqueConfig;
pub use error::{CritiqueError, CritiqueResult};
pub use gemini::GeminiCritiqueClient;
pub use heuristic::HeuristicCritiqueService;
pub use service::{CritiqueRequest, CritiqueResponse, CritiqueService};
