//! Generative AI gateway for datadict
//!
//! Provides an `AiGateway` trait with one implementation:
//! - **Gemini**: `models/{model}:generateContent` over the Gemini REST API
//!
//! Both flows go through a single `generate` call. Structured generation sets a
//! response MIME type and schema; a chat session is the converted history plus
//! the new user turn under a grounding system instruction.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::config::GatewayConfig;
use crate::credentials::ApiKey;

// ============================================================================
// AiGateway trait
// ============================================================================

/// Abstraction over the generative AI provider.
#[async_trait]
pub trait AiGateway: Send + Sync {
    /// One round-trip. No retries; the transport's timeout is the only timeout.
    async fn generate(
        &self,
        key: &ApiKey,
        request: GenerationRequest,
    ) -> Result<GatewayReply, GatewayError>;

    /// Backend name for logging.
    fn name(&self) -> &str;
}

// ============================================================================
// Request / reply types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayRole {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Content {
    pub role: GatewayRole,
    pub text: String,
}

impl Content {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: GatewayRole::User,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct GenerationRequest {
    pub system_instruction: Option<String>,
    pub contents: Vec<Content>,
    pub response_mime_type: Option<String>,
    pub response_schema: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GatewayReply {
    /// Text of the first candidate, `None` when the provider returned none.
    pub text: Option<String>,
}

impl GatewayReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
        }
    }

    #[cfg(test)]
    pub fn empty() -> Self {
        Self { text: None }
    }
}

// ============================================================================
// Error types
// ============================================================================

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({code}): {message}")]
    Api { code: u16, message: String },
}

// ============================================================================
// Gemini API structs (private)
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<GatewayRole>,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiCandidateContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiCandidatePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: Option<GeminiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    code: u16,
    message: String,
}

impl From<GenerationRequest> for GeminiRequest {
    fn from(request: GenerationRequest) -> Self {
        let generation_config =
            if request.response_mime_type.is_some() || request.response_schema.is_some() {
                Some(GeminiGenerationConfig {
                    response_mime_type: request.response_mime_type,
                    response_schema: request.response_schema,
                })
            } else {
                None
            };

        Self {
            system_instruction: request.system_instruction.map(|text| GeminiContent {
                role: None,
                parts: vec![GeminiPart { text }],
            }),
            contents: request
                .contents
                .into_iter()
                .map(|c| GeminiContent {
                    role: Some(c.role),
                    parts: vec![GeminiPart { text: c.text }],
                })
                .collect(),
            generation_config,
        }
    }
}

impl GeminiResponse {
    /// Concatenated text parts of the first candidate.
    fn into_text(self) -> Option<String> {
        let text: String = self
            .candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .filter_map(|p| p.text)
            .collect();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

// ============================================================================
// GeminiClient
// ============================================================================

/// Gemini client; calls the `generateContent` endpoint.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        Self::with_base_url(config, config.base_url.clone())
    }

    /// Create a client with a custom base URL (for testing / integration)
    pub fn with_base_url(config: &GatewayConfig, base_url: String) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            model: config.model.clone(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl AiGateway for GeminiClient {
    async fn generate(
        &self,
        key: &ApiKey,
        request: GenerationRequest,
    ) -> Result<GatewayReply, GatewayError> {
        // The key travels in a header so it never shows up in a URL that an
        // error message might echo back to the caller.
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = GeminiRequest::from(request);

        tracing::debug!(
            model = %self.model,
            turns = body.contents.len(),
            structured = body.generation_config.is_some(),
            "Sending generateContent request"
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", key.expose())
            .json(&body)
            .send()
            .await?;

        let status = response.status();

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            let error_detail = serde_json::from_str::<GeminiErrorResponse>(&error_body)
                .ok()
                .and_then(|e| e.error);

            let (code, message) = error_detail
                .map(|e| (e.code, e.message))
                .unwrap_or((status.as_u16(), error_body));

            return Err(GatewayError::Api { code, message });
        }

        let gemini_response: GeminiResponse = response.json().await?;
        let text = gemini_response.into_text();

        tracing::debug!(
            model = %self.model,
            chars = text.as_ref().map(|t| t.len()).unwrap_or(0),
            "generateContent reply received"
        );

        Ok(GatewayReply { text })
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

// ============================================================================
// TESTS
// ============================================================================
