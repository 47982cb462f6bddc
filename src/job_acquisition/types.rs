// src/job_acquisition/types.rs
use serde::{Deserialize, Serialize};

use crate::error::{AcquisitionError, ReasonCode};
use crate::utils::char_len;

/// A job posting as recovered from a page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPosting {
    pub title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub description: String,
    pub requirements: String,
    pub skills: Vec<String>,
}

impl JobPosting {
    pub fn from_description(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Self::default()
        }
    }

    pub fn description_len(&self) -> usize {
        char_len(self.description.trim())
    }

    /// A posting only counts when its description clears `min_chars`.
    pub fn is_viable(&self, min_chars: usize) -> bool {
        let len = self.description_len();
        len > 0 && len >= min_chars
    }

    /// Plain-text rendering handed to downstream AI consumers.
    ///
    /// Absent fields are left out entirely, so a description-only posting
    /// renders as exactly its description.
    pub fn to_text(&self) -> String {
        let mut header = Vec::new();
        if let Some(title) = non_empty(&self.title) {
            header.push(format!("Title: {}", title));
        }
        if let Some(company) = non_empty(&self.company) {
            header.push(format!("Company: {}", company));
        }
        if let Some(location) = non_empty(&self.location) {
            header.push(format!("Location: {}", location));
        }

        let mut sections = Vec::new();
        if !header.is_empty() {
            sections.push(header.join("\n"));
        }
        sections.push(self.description.trim().to_string());
        // List items are usually already part of the description block.
        let requirements = self.requirements.trim();
        if !requirements.is_empty() && !self.description.contains(requirements) {
            sections.push(format!("Requirements:\n{}", requirements));
        }
        if !self.skills.is_empty() {
            sections.push(format!("Skills: {}", self.skills.join(", ")));
        }
        sections.join("\n\n")
    }
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SourceStrategy {
    StructuredSite,
    GenericPage,
    LlmAssisted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestedAction {
    ClientSideFetch,
    ManualPaste,
    ScreenshotUpload,
}

/// The single value the pipeline hands back per request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExtractionOutcome {
    Success {
        text: String,
        source_strategy: SourceStrategy,
    },
    NeedsManualFallback {
        reason_code: ReasonCode,
        suggested_action: SuggestedAction,
        partial_identifier: Option<String>,
        message: String,
    },
    Failure {
        reason_code: ReasonCode,
        message: String,
    },
}

impl ExtractionOutcome {
    pub fn failure(error: &AcquisitionError) -> Self {
        Self::Failure {
            reason_code: error.reason_code(),
            message: error.user_message(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Success { text, .. } => Some(text),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_description_only_posting_renders_verbatim() {
        let posting = JobPosting::from_description("We are hiring a Rust engineer.");
        assert_eq!(posting.to_text(), "We are hiring a Rust engineer.");
    }

    #[test]
    fn test_full_posting_text() {
        let posting = JobPosting {
            title: Some("Backend Engineer".to_string()),
            company: Some("Acme".to_string()),
            location: Some(" ".to_string()),
            description: "Build services.".to_string(),
            requirements: "- Rust\n- SQL".to_string(),
            skills: vec!["Rust".to_string(), "Tokio".to_string()],
        };
        assert_eq!(
            posting.to_text(),
            "Title: Backend Engineer\nCompany: Acme\n\nBuild services.\n\nRequirements:\n- Rust\n- SQL\n\nSkills: Rust, Tokio"
        );
    }

    #[test]
    fn test_requirements_already_in_description_are_not_repeated() {
        let posting = JobPosting {
            description: "Build services.\n- Rust\n- SQL".to_string(),
            requirements: "- Rust\n- SQL".to_string(),
            ..JobPosting::default()
        };
        assert_eq!(posting.to_text(), "Build services.\n- Rust\n- SQL");
    }

    #[test]
    fn test_viability_threshold() {
        let posting = JobPosting::from_description("x".repeat(199));
        assert!(!posting.is_viable(200));
        assert!(posting.is_viable(100));
        assert!(!JobPosting::from_description("   ").is_viable(0));
    }

    #[test]
    fn test_outcome_serialization() {
        let outcome = ExtractionOutcome::Success {
            text: "body".to_string(),
            source_strategy: SourceStrategy::LlmAssisted,
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["kind"], "success");
        assert_eq!(json["source_strategy"], "llmAssisted");
    }
}
