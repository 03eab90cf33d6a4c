//! Generation gateway — the single point of entry for all Gemini API calls.
//!
//! ARCHITECTURAL RULE: no other module may call the generative API directly.
//! One request per call; no batching, no streaming, no retry. A transport
//! failure surfaces the provider's message or status code; a transport
//! success with no extractable text surfaces the provider's finish reason.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::AppError;
use crate::images::EncodedImage;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Ephemeral value object built fresh per invocation; never persisted.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub model: String,
    pub prompt: String,
    pub images: Vec<EncodedImage>,
}

/// The generation backend seam. Carried in `AppState` as
/// `Arc<dyn GenerationBackend>` so the orchestrator is testable without a
/// network; `GeminiClient` is the production implementation.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Validates the key against the model-listing endpoint and returns the
    /// vision-capable models available to it.
    async fn list_models(&self, api_key: &str) -> Result<Vec<String>, AppError>;

    /// Sends one generation request and returns the extracted text.
    async fn generate(&self, api_key: &str, request: &GenerationRequest)
        -> Result<String, AppError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Wire types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct GenerateContentBody {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    data: String,
    mime_type: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListModelsResponse {
    models: Option<Vec<ModelEntry>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelEntry {
    name: String,
    #[serde(default)]
    supported_generation_methods: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    error: ProviderErrorBody,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    message: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Client
// ────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
}

impl GeminiClient {
    pub fn new(http: reqwest::Client) -> Self {
        GeminiClient { http }
    }
}

#[async_trait]
impl GenerationBackend for GeminiClient {
    async fn list_models(&self, api_key: &str) -> Result<Vec<String>, AppError> {
        if api_key.trim().is_empty() {
            return Err(AppError::Credential("the API key is empty".to_string()));
        }

        let url = format!("{GEMINI_API_BASE}/models?key={api_key}");
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(AppError::Credential(provider_message(status.as_u16(), &body)));
        }

        let listing: ListModelsResponse = serde_json::from_str(&body)
            .map_err(|e| AppError::Transport(format!("could not parse model list: {e}")))?;

        let Some(entries) = listing.models else {
            return Err(AppError::Credential(
                "the provider response contained no model list".to_string(),
            ));
        };

        let models = filter_vision_models(entries);
        if models.is_empty() {
            return Err(AppError::Credential(
                "no vision-capable models are available for this API key".to_string(),
            ));
        }

        debug!("model listing returned {} vision models", models.len());
        Ok(models)
    }

    async fn generate(
        &self,
        api_key: &str,
        request: &GenerationRequest,
    ) -> Result<String, AppError> {
        let mut parts = Vec::with_capacity(request.images.len() + 1);
        parts.push(Part::Text {
            text: request.prompt.clone(),
        });
        for image in &request.images {
            parts.push(Part::InlineData {
                inline_data: InlineData {
                    data: image.data.clone(),
                    mime_type: image.mime_type.clone(),
                },
            });
        }

        let body = GenerateContentBody {
            contents: vec![Content { parts }],
        };
        let url = format!(
            "{GEMINI_API_BASE}/models/{}:generateContent?key={api_key}",
            request.model
        );

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(AppError::Transport(provider_message(status.as_u16(), &body)));
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&body)
            .map_err(|e| AppError::Transport(format!("could not parse generation response: {e}")))?;

        extract_text(parsed)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Pure helpers
// ────────────────────────────────────────────────────────────────────────────

/// Reads the generated text from `candidates[0].content.parts[0].text`.
/// Absence of that path is a block: the provider's stated finish reason is
/// carried in the error.
fn extract_text(response: GenerateContentResponse) -> Result<String, AppError> {
    let first = response.candidates.into_iter().next();
    let reason = first
        .as_ref()
        .and_then(|c| c.finish_reason.clone())
        .unwrap_or_else(|| "unknown".to_string());

    first
        .and_then(|c| c.content)
        .and_then(|c| c.parts.into_iter().next())
        .and_then(|p| p.text)
        .filter(|t| !t.is_empty())
        .ok_or(AppError::ContentBlocked { reason })
}

/// Keeps models that support the generation operation, are named as
/// vision/multimodal capable, and are not text-only or embedding-only.
/// The `models/` resource prefix is stripped from the returned identifiers.
fn filter_vision_models(entries: Vec<ModelEntry>) -> Vec<String> {
    entries
        .into_iter()
        .filter(|m| {
            m.supported_generation_methods
                .iter()
                .any(|method| method == "generateContent")
        })
        .filter(|m| {
            let name = &m.name;
            (name.contains("vision") || name.contains("flash") || name.contains("pro"))
                && !name.contains("text")
                && !name.contains("embedding")
        })
        .map(|m| m.name.trim_start_matches("models/").to_string())
        .collect()
}

/// Default selection: prefer the lightweight/fast tier, otherwise the first
/// available model.
pub fn default_model(models: &[String]) -> Option<&String> {
    models
        .iter()
        .find(|m| m.contains("flash"))
        .or_else(|| models.first())
}

/// The provider's stated error message when the body carries one, otherwise
/// the HTTP status code.
fn provider_message(status: u16, body: &str) -> String {
    serde_json::from_str::<ProviderError>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| format!("HTTP {status}"))
}
