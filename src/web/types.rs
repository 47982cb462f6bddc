// src/web/types.rs
use rocket::serde::{Deserialize, Serialize};

use crate::error::ReasonCode;
use crate::job_acquisition::{SourceStrategy, SuggestedAction, SupportedSite};

#[derive(Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct ScrapeJobRequest {
    pub url: String,
}

#[derive(Deserialize)]
#[serde(crate = "rocket::serde", rename_all = "camelCase")]
pub struct OcrRequest {
    pub image_data: String,
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde", rename_all = "camelCase")]
pub struct JobDescriptionData {
    pub job_description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_strategy: Option<SourceStrategy>,
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde", rename_all = "camelCase")]
pub struct DataResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl<T> DataResponse<T> {
    pub fn success(data: T, request_id: Option<String>) -> Self {
        Self {
            success: true,
            data,
            request_id,
        }
    }
}

/// Tells the frontend to fetch the page itself or ask the user for the text.
#[derive(Serialize)]
#[serde(crate = "rocket::serde", rename_all = "camelCase")]
pub struct ManualFallbackResponse {
    pub success: bool,
    pub needs_frontend_fetch: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    pub original_url: String,
    pub message: String,
    pub suggested_action: SuggestedAction,
    pub reason_code: ReasonCode,
    pub request_id: String,
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde", rename_all = "camelCase")]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<SuggestedAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supported_sites: Option<Vec<String>>,
    pub suggestions: Vec<String>,
}

impl ErrorResponse {
    pub fn new(error: String, error_code: &str, suggestions: Vec<String>) -> Self {
        Self {
            success: false,
            error,
            error_code: error_code.to_string(),
            suggested_action: None,
            supported_sites: None,
            suggestions,
        }
    }

    pub fn for_reason(reason: ReasonCode, error: String) -> Self {
        Self::new(error, reason.code(), suggestions_for(reason))
    }

    pub fn with_suggested_action(mut self, action: SuggestedAction) -> Self {
        self.suggested_action = Some(action);
        self
    }

    pub fn with_supported_sites(mut self, sites: Vec<String>) -> Self {
        self.supported_sites = Some(sites);
        self
    }
}

fn suggestions_for(reason: ReasonCode) -> Vec<String> {
    let lines: &[&str] = match reason {
        ReasonCode::MalformedUrl => &["Copy the full job URL from your browser address bar"],
        ReasonCode::UnsupportedSource => &[
            "Use a posting from one of the supported job boards",
            "Paste the job description manually",
        ],
        ReasonCode::PageUnreachable | ReasonCode::ExtractionInsufficient => &[
            "Paste the job description manually",
            "Upload a screenshot of the posting",
        ],
        ReasonCode::ModelRateLimited => &["Wait a minute and try again"],
        ReasonCode::ModelNotConfigured
        | ReasonCode::ModelAuthentication
        | ReasonCode::ModelQuotaExceeded
        | ReasonCode::ModelFailure => &["Paste the job description manually"],
        ReasonCode::OcrInsufficient | ReasonCode::InvalidImage => &[
            "Upload a sharper, uncropped screenshot",
            "Paste the job description manually",
        ],
        ReasonCode::Internal => &[
            "Try again in a few moments",
            "Contact support if the problem persists",
        ],
    };
    lines.iter().map(|s| s.to_string()).collect()
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct SupportedSitesResponse {
    pub success: bool,
    pub sites: Vec<SupportedSite>,
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde", rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub llm_configured: bool,
    pub timestamp: String,
}
