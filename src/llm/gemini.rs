//! Google Gemini provider.
//!
//! Talks to the `generateContent` REST endpoint with a single user turn. The
//! whole prompt (system description, history window, instructions) is sent as
//! one text part, so the provider stays a plain text-in/text-out service.

use crate::error::{HackAssistError, Result as HackResult};
use crate::llm::LlmClient;
use anyhow::Result;
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

// =============================================================================
// Gemini API Errors
// =============================================================================

/// Errors that can occur when communicating with the Gemini API.
#[derive(Debug, Error)]
pub enum GeminiApiError {
    /// The API key was rejected.
    #[error("Gemini rejected the API key: {message}")]
    Unauthorized { message: String },

    /// Request was rate limited.
    #[error("Gemini rate limit exceeded: {message}")]
    RateLimited { message: String },

    /// Non-success HTTP status.
    #[error("Gemini API error ({status}): {message}")]
    Http { status: u16, message: String },

    /// The prompt was blocked by safety filters.
    #[error("Gemini blocked the prompt: {reason}")]
    Blocked { reason: String },

    /// Response carried no text.
    #[error("Gemini returned an empty response")]
    EmptyResponse,

    /// Transport failure or timeout.
    #[error("Connection error: {message}")]
    Connection { message: String },
}

impl GeminiApiError {
    /// Check if this error is worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Connection { .. })
    }
}

// =============================================================================
// Gemini Client
// =============================================================================

/// Gemini text-completion client.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: Option<Client>,
    base_url: String,
    model: String,
    api_key: String,
    timeout_secs: u64,
}

impl GeminiClient {
    /// Public API endpoint.
    pub const DEFAULT_BASE_URL: &'static str = "https://generativelanguage.googleapis.com/v1beta";

    /// Default request timeout.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

    /// Create an unbuilt client. Call [`GeminiClient::build`] before use.
    #[must_use]
    pub fn new(model: &str, api_key: impl Into<String>, base_url: Option<&str>) -> Self {
        Self {
            http: None,
            base_url: base_url
                .unwrap_or(Self::DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            model: model.to_string(),
            api_key: api_key.into(),
            timeout_secs: Self::DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Set the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Construct the underlying HTTP client.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialised.
    pub fn build(mut self) -> HackResult<Self> {
        let http = ClientBuilder::new()
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()
            .map_err(|e| HackAssistError::model(format!("failed to build HTTP client: {}", e)))?;
        self.http = Some(http);
        Ok(self)
    }

    /// Endpoint for the configured model.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    async fn generate(&self, prompt: &str) -> std::result::Result<String, GeminiApiError> {
        let http = self.http.as_ref().ok_or_else(|| GeminiApiError::Connection {
            message: "client was not built".to_string(),
        })?;

        let body = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        debug!("Sending {} chars to Gemini {}", prompt.len(), self.model);

        let response = http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| GeminiApiError::Connection {
                message: e.to_string(),
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| GeminiApiError::Connection {
            message: e.to_string(),
        })?;

        if !status.is_success() {
            return Err(classify_status(status, &text));
        }

        extract_text(&text)
    }
}

fn classify_status(status: StatusCode, body: &str) -> GeminiApiError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.trim().to_string());

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GeminiApiError::Unauthorized { message },
        StatusCode::TOO_MANY_REQUESTS => GeminiApiError::RateLimited { message },
        other => GeminiApiError::Http {
            status: other.as_u16(),
            message,
        },
    }
}

/// Concatenate the text parts of the first candidate.
fn extract_text(body: &str) -> std::result::Result<String, GeminiApiError> {
    let parsed: GenerateResponse =
        serde_json::from_str(body).map_err(|e| GeminiApiError::Http {
            status: 200,
            message: format!("unparseable response: {}", e),
        })?;

    if parsed.candidates.is_empty() {
        if let Some(reason) = parsed.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(GeminiApiError::Blocked { reason });
        }
    }

    let text: String = parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        Err(GeminiApiError::EmptyResponse)
    } else {
        Ok(text.trim().to_string())
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn run_prompt(&self, prompt: &str) -> Result<String> {
        Ok(self.generate(prompt).await?)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
