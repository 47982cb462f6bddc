// src/llm/mod.rs
//! Language-model completion capability.
//!
//! The pipeline only ever sees the `LanguageModel` trait; `AnthropicClient` is
//! the production implementation. An unset API key means no client is
//! constructed and the model-assisted strategy holds `None`.
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::LlmSettings;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("language model is not configured")]
    NotConfigured,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("LLM returned empty content")]
    EmptyContent,
}

/// Coarse classification used to pick a caller-facing status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmFailureKind {
    NotConfigured,
    Authentication,
    RateLimited,
    QuotaExceeded,
    Other,
}

impl LlmError {
    pub fn kind(&self) -> LlmFailureKind {
        match self {
            Self::NotConfigured => LlmFailureKind::NotConfigured,
            Self::Api { status, message } => classify(*status, message),
            Self::Http(e) => match e.status() {
                Some(status) => classify(status.as_u16(), &e.to_string()),
                None => LlmFailureKind::Other,
            },
            Self::EmptyContent => LlmFailureKind::Other,
        }
    }
}

fn classify(status: u16, message: &str) -> LlmFailureKind {
    let lower = message.to_lowercase();
    if status == 402
        || lower.contains("credit balance")
        || lower.contains("quota")
        || lower.contains("billing")
    {
        LlmFailureKind::QuotaExceeded
    } else if status == 429 || lower.contains("rate limit") || lower.contains("rate_limit") {
        LlmFailureKind::RateLimited
    } else if status == 401
        || status == 403
        || lower.contains("api key")
        || lower.contains("x-api-key")
        || lower.contains("authentication")
    {
        LlmFailureKind::Authentication
    } else {
        LlmFailureKind::Other
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CompletionRequest<'a> {
    pub system: &'a str,
    pub prompt: &'a str,
    pub max_tokens: u32,
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    fn model_id(&self) -> &str;

    async fn complete(&self, request: CompletionRequest<'_>) -> Result<String, LlmError>;
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

impl AnthropicResponse {
    fn text(&self) -> Option<&str> {
        self.content
            .iter()
            .find(|b| b.block_type == "text")
            .and_then(|b| b.text.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorBody,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorBody {
    message: String,
}

/// Client for the Anthropic Messages API. One request per call, no retries.
#[derive(Clone)]
pub struct AnthropicClient {
    client: Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl AnthropicClient {
    pub fn new(api_key: String, model: String, timeout: Duration) -> Result<Self, LlmError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key,
            model,
            endpoint: ANTHROPIC_API_URL.to_string(),
        })
    }

    /// Returns `Ok(None)` when no API key is configured.
    pub fn from_settings(settings: &LlmSettings) -> Result<Option<Self>, LlmError> {
        match settings.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => Ok(Some(Self::new(
                key.to_string(),
                settings.model.clone(),
                settings.timeout(),
            )?)),
            _ => Ok(None),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl LanguageModel for AnthropicClient {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest<'_>) -> Result<String, LlmError> {
        let body = AnthropicRequest {
            model: &self.model,
            max_tokens: request.max_tokens,
            system: request.system,
            messages: vec![AnthropicMessage {
                role: "user",
                content: request.prompt,
            }],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<AnthropicError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            warn!("LLM API returned {}: {}", status, message);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: AnthropicResponse = response.json().await?;
        if let Some(usage) = &parsed.usage {
            debug!(
                "LLM call succeeded: input_tokens={}, output_tokens={}",
                usage.input_tokens, usage.output_tokens
            );
        }

        parsed
            .text()
            .map(str::to_string)
            .ok_or(LlmError::EmptyContent)
    }
}
