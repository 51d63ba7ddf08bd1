//! Gemini client for shot critiques.
//!
//! Sends a handful of evenly sampled JPEG frames from the shot segment as
//! inline image parts, together with the coach prompt and the feature
//! summary, and parses a `{result, critique}` JSON verdict. Models are tried
//! in the configured order until one succeeds.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::CritiqueConfig;
use crate::error::{CritiqueError, CritiqueResult};
use crate::prompts;
use crate::service::{CritiqueRequest, CritiqueResponse, CritiqueService};
use hoopcam_models::{Frame, ShotId, ShotOutcome};

/// Gemini API request.
#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Clone, Serialize)]
struct InlineData {
    #[serde(rename = "mimeType")]
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
}

/// Gemini API response.
#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: ResponseContent,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

/// Verdict JSON requested from the model.
#[derive(Debug, Deserialize)]
struct ShotVerdict {
    #[serde(default)]
    result: Option<String>,
    critique: String,
}

/// Gemini-backed [`CritiqueService`].
pub struct GeminiCritiqueClient {
    api_key: String,
    base_url: String,
    models: Vec<String>,
    max_frames: usize,
    client: Client,
}

impl GeminiCritiqueClient {
    /// Create a new client. Fails without an API key or model list.
    pub fn new(config: &CritiqueConfig) -> CritiqueResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| CritiqueError::config("GEMINI_API_KEY not set"))?;
        if config.models.is_empty() {
            return Err(CritiqueError::config("no critique models configured"));
        }

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            models: config.models.clone(),
            max_frames: config.max_frames,
            client,
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }

    /// Call one model and return the concatenated response text.
    async fn generate(&self, model: &str, parts: &[Part], mime_type: &str) -> CritiqueResult<String> {
        let request = GeminiRequest {
            contents: vec![Content {
                parts: parts.to_vec(),
            }],
            generation_config: GenerationConfig {
                response_mime_type: mime_type.to_string(),
            },
        };

        let response = self
            .client
            .post(self.endpoint(model))
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let message = response.text().await.unwrap_or_default();
            return Err(CritiqueError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let gemini_response: GeminiResponse = response.json().await.map_err(|e| {
            CritiqueError::invalid_response(format!("Failed to parse Gemini response: {}", e))
        })?;

        let text: String = gemini_response
            .candidates
            .first()
            .map(|c| {
                c.content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect()
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(CritiqueError::invalid_response("No content in Gemini response"));
        }
        Ok(text)
    }

    async fn critique_with_model(
        &self,
        model: &str,
        shot_id: ShotId,
        parts: &[Part],
    ) -> CritiqueResult<CritiqueResponse> {
        let text = self.generate(model, parts, "application/json").await?;
        let verdict: ShotVerdict = serde_json::from_str(strip_code_fences(&text)).map_err(|e| {
            CritiqueError::invalid_response(format!("Failed to parse critique JSON: {}", e))
        })?;

        if verdict.critique.trim().is_empty() {
            return Err(CritiqueError::invalid_response("Empty critique text"));
        }

        Ok(CritiqueResponse {
            shot_id,
            critique_text: verdict.critique.trim().to_string(),
            outcome: verdict.result.as_deref().and_then(ShotOutcome::parse),
        })
    }
}

#[async_trait]
impl CritiqueService for GeminiCritiqueClient {
    async fn critique(&self, request: CritiqueRequest) -> CritiqueResult<CritiqueResponse> {
        let images: Vec<&Frame> = request.segment.image_frames().collect();
        let sampled = sample_frames(&images, self.max_frames);

        let mut parts = vec![Part::Text {
            text: prompts::shot_prompt(request.shot_id, &request.summary, sampled.len()),
        }];
        parts.extend(sampled.iter().map(|frame| Part::Inline {
            inline_data: InlineData {
                mime_type: "image/jpeg".to_string(),
                data: BASE64.encode(&frame.data),
            },
        }));

        debug!(
            session_id = %request.session_id,
            shot_id = %request.shot_id,
            frames = sampled.len(),
            "Built critique request"
        );

        let mut last_error = None;
        for model in &self.models {
            info!(shot_id = %request.shot_id, model = %model, "Attempting Gemini critique");
            match self.critique_with_model(model, request.shot_id, &parts).await {
                Ok(response) => {
                    info!(shot_id = %request.shot_id, model = %model, "Critique received");
                    return Ok(response);
                }
                Err(e) => {
                    warn!(shot_id = %request.shot_id, model = %model, error = %e, "Critique model failed");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| CritiqueError::failed("All Gemini models failed")))
    }

    async fn summarize_session(&self, critiques: &[(ShotId, String)]) -> CritiqueResult<String> {
        if critiques.is_empty() {
            return Err(CritiqueError::failed("no critiques to summarize"));
        }

        let parts = [Part::Text {
            text: prompts::session_summary_prompt(critiques),
        }];

        let mut last_error = None;
        for model in &self.models {
            match self.generate(model, &parts, "text/plain").await {
                Ok(text) => {
                    info!(model = %model, shots = critiques.len(), "Session summary received");
                    return Ok(text.trim().to_string());
                }
                Err(e) => {
                    warn!(model = %model, error = %e, "Session summary model failed");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| CritiqueError::failed("All Gemini models failed")))
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

/// Strip a surrounding markdown code fence (```json ... ```).
pub fn strip_code_fences(text: &str) -> &str {
    let text = text.trim();
    let text = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text);
    let text = text.strip_suffix("```").unwrap_or(text);
    text.trim()
}

/// Pick up to `max` frames evenly spread across the slice, keeping order.
pub fn sample_frames<'a>(frames: &[&'a Frame], max: usize) -> Vec<&'a Frame> {
    let len = frames.len();
    if max == 0 || len == 0 {
        return Vec::new();
    }
    if len <= max {
        return frames.to_vec();
    }
    if max == 1 {
        return vec![frames[len / 2]];
    }

    (0..max)
        .map(|i| frames[i * (len - 1) / (max - 1)])
        .collect()
}
