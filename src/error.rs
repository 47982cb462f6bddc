// src/error.rs
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::llm::{LlmError, LlmFailureKind};

/// Machine-readable cause attached to every non-success outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    MalformedUrl,
    UnsupportedSource,
    PageUnreachable,
    ExtractionInsufficient,
    ModelNotConfigured,
    ModelAuthentication,
    ModelRateLimited,
    ModelQuotaExceeded,
    ModelFailure,
    OcrInsufficient,
    InvalidImage,
    Internal,
}

impl ReasonCode {
    pub fn http_status(&self) -> u16 {
        match self {
            Self::MalformedUrl | Self::UnsupportedSource => 400,
            Self::PageUnreachable => 408,
            Self::ExtractionInsufficient => 200,
            Self::ModelNotConfigured | Self::ModelAuthentication => 503,
            Self::ModelRateLimited => 429,
            Self::ModelQuotaExceeded => 402,
            Self::ModelFailure => 502,
            Self::OcrInsufficient | Self::InvalidImage => 400,
            Self::Internal => 500,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedUrl => "MALFORMED_URL",
            Self::UnsupportedSource => "UNSUPPORTED_SOURCE",
            Self::PageUnreachable => "PAGE_UNREACHABLE",
            Self::ExtractionInsufficient => "EXTRACTION_INSUFFICIENT",
            Self::ModelNotConfigured => "AI_NOT_CONFIGURED",
            Self::ModelAuthentication => "AI_AUTHENTICATION_FAILED",
            Self::ModelRateLimited => "AI_RATE_LIMITED",
            Self::ModelQuotaExceeded => "AI_QUOTA_EXCEEDED",
            Self::ModelFailure => "AI_ERROR",
            Self::OcrInsufficient => "OCR_INSUFFICIENT_TEXT",
            Self::InvalidImage => "INVALID_IMAGE",
            Self::Internal => "INTERNAL_ERROR",
        }
    }
}

/// Hard failures of the acquisition pipeline.
///
/// Extractor-level problems (a timed out fetch, a selector miss) never show up
/// here: they are turned into "try the next strategy" inside the pipeline.
#[derive(Debug, Error)]
pub enum AcquisitionError {
    #[error("invalid job URL: {0}")]
    MalformedUrl(String),

    #[error("site not supported: {host}. Supported sites: {}", supported.join(", "))]
    UnsupportedSource {
        host: String,
        supported: Vec<String>,
    },

    #[error("page unreachable: {0}")]
    PageUnreachable(String),

    #[error("no usable job description could be extracted: {0}")]
    ExtractionInsufficient(String),

    #[error(transparent)]
    Model(#[from] LlmError),

    #[error("browser failure: {0}")]
    Browser(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AcquisitionError {
    pub fn reason_code(&self) -> ReasonCode {
        match self {
            Self::MalformedUrl(_) => ReasonCode::MalformedUrl,
            Self::UnsupportedSource { .. } => ReasonCode::UnsupportedSource,
            Self::PageUnreachable(_) => ReasonCode::PageUnreachable,
            Self::ExtractionInsufficient(_) => ReasonCode::ExtractionInsufficient,
            Self::Model(e) => match e.kind() {
                LlmFailureKind::NotConfigured => ReasonCode::ModelNotConfigured,
                LlmFailureKind::Authentication => ReasonCode::ModelAuthentication,
                LlmFailureKind::RateLimited => ReasonCode::ModelRateLimited,
                LlmFailureKind::QuotaExceeded => ReasonCode::ModelQuotaExceeded,
                LlmFailureKind::Other => ReasonCode::ModelFailure,
            },
            Self::Browser(_) | Self::Internal(_) => ReasonCode::Internal,
        }
    }

    /// Message safe to show to an end user.
    pub fn user_message(&self) -> String {
        match self {
            Self::Model(e) => match e.kind() {
                LlmFailureKind::NotConfigured | LlmFailureKind::Authentication => {
                    "The AI service is not available right now. Please paste the job description manually.".to_string()
                }
                LlmFailureKind::RateLimited => {
                    "Too many AI requests. Please wait a moment and try again.".to_string()
                }
                LlmFailureKind::QuotaExceeded => {
                    "The AI service quota has been exhausted. Please paste the job description manually.".to_string()
                }
                LlmFailureKind::Other => {
                    "The AI service failed to process this page.".to_string()
                }
            },
            Self::Browser(_) | Self::Internal(_) => {
                "An internal error occurred while reading the job posting".to_string()
            }
            other => other.to_string(),
        }
    }
}
