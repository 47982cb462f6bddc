// src/job_acquisition/model_extractor.rs
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{LlmSettings, ScrapingSettings};
use crate::llm::{CompletionRequest, LanguageModel, LlmError};
use crate::utils::{char_len, truncate_chars};

const SYSTEM_PROMPT: &str = "You extract job postings from noisy web page text. \
Answer with the posting only, as plain text, without commentary.";

#[derive(Debug, Error)]
pub enum ModelExtractionError {
    #[error("model returned {chars} characters, below the {min} character minimum")]
    Insufficient { chars: usize, min: usize },

    #[error(transparent)]
    Model(#[from] LlmError),
}

/// Last-resort extractor: asks a language model to isolate the posting.
pub struct ModelExtractor {
    model: Arc<dyn LanguageModel>,
    max_input_chars: usize,
    max_tokens: u32,
    min_chars: usize,
}

impl ModelExtractor {
    pub fn new(model: Arc<dyn LanguageModel>, llm: &LlmSettings, scraping: &ScrapingSettings) -> Self {
        Self {
            model,
            max_input_chars: llm.max_input_chars,
            max_tokens: llm.max_tokens,
            min_chars: scraping.model_min_chars,
        }
    }

    pub async fn extract_via_model(&self, raw_text: &str, url: &str) -> Result<String, ModelExtractionError> {
        let input = truncate_chars(raw_text, self.max_input_chars);
        if input.len() < raw_text.len() {
            info!(
                "Truncated page text from {} to {} chars before model extraction",
                char_len(raw_text),
                self.max_input_chars
            );
        }

        let prompt = build_prompt(input, url);
        info!("Requesting model extraction from {}", self.model.model_id());
        let response = self
            .model
            .complete(CompletionRequest {
                system: SYSTEM_PROMPT,
                prompt: &prompt,
                max_tokens: self.max_tokens,
            })
            .await?;

        let text = response.trim();
        let chars = char_len(text);
        if chars < self.min_chars {
            warn!("Model extraction too short ({} chars)", chars);
            return Err(ModelExtractionError::Insufficient {
                chars,
                min: self.min_chars,
            });
        }

        info!("Model extraction accepted ({} chars)", chars);
        Ok(text.to_string())
    }
}

fn build_prompt(page_text: &str, url: &str) -> String {
    format!(
        r#"The text below was captured from the job posting page at {url}.

Extract the job posting from it and keep, when present:
- the job title
- the company
- the location
- the responsibilities and missions
- the requirements, qualifications and skills

Leave out navigation menus, footers, cookie banners, sign-in prompts, similar job suggestions and any other page chrome.
Keep the original language of the posting. Do not invent content that is not in the text.

PAGE TEXT:
{page_text}"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct EchoModel {
        reply: Result<String, u16>,
        prompts: Mutex<Vec<String>>,
    }

    impl EchoModel {
        fn replying(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LanguageModel for EchoModel {
        fn model_id(&self) -> &str {
            "echo"
        }

        async fn complete(&self, request: CompletionRequest<'_>) -> Result<String, LlmError> {
            self.prompts.lock().unwrap().push(request.prompt.to_string());
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(status) => Err(LlmError::Api {
                    status: *status,
                    message: "upstream".to_string(),
                }),
            }
        }
    }

    fn extractor(model: Arc<EchoModel>) -> ModelExtractor {
        let llm = LlmSettings {
            max_input_chars: 1000,
            ..LlmSettings::default()
        };
        ModelExtractor::new(model, &llm, &ScrapingSettings::default())
    }

    #[tokio::test]
    async fn test_accepts_long_reply() {
        let reply = "Senior engineer. ".repeat(10);
        let model = Arc::new(EchoModel::replying(&reply));
        let text = extractor(model.clone())
            .extract_via_model("page", "https://example.org/job")
            .await
            .unwrap();

        assert_eq!(text, reply.trim());
        let prompts = model.prompts.lock().unwrap();
        assert!(prompts[0].contains("https://example.org/job"));
        assert!(prompts[0].contains("cookie banners"));
    }

    #[tokio::test]
    async fn test_rejects_short_reply() {
        let model = Arc::new(EchoModel::replying(&"x".repeat(99)));
        let err = extractor(model)
            .extract_via_model("page", "https://example.org/job")
            .await
            .unwrap_err();

        assert!(matches!(err, ModelExtractionError::Insufficient { chars: 99, min: 100 }));
    }

    #[tokio::test]
    async fn test_input_is_truncated() {
        let model = Arc::new(EchoModel::replying(&"y".repeat(120)));
        let raw = format!("{}{}", "a".repeat(1000), "TAIL_MARKER");
        extractor(model.clone())
            .extract_via_model(&raw, "https://example.org/job")
            .await
            .unwrap();

        let prompts = model.prompts.lock().unwrap();
        assert!(!prompts[0].contains("TAIL_MARKER"));
    }

    #[tokio::test]
    async fn test_api_errors_propagate() {
        let model = Arc::new(EchoModel {
            reply: Err(429),
            prompts: Mutex::new(Vec::new()),
        });
        let err = extractor(model)
            .extract_via_model("page", "https://example.org/job")
            .await
            .unwrap_err();

        assert!(matches!(err, ModelExtractionError::Model(LlmError::Api { status: 429, .. })));
    }
}
