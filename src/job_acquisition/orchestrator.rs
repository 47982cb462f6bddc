// src/job_acquisition/orchestrator.rs
//! Runs the extraction strategies in order until one produces usable text.
//!
//! Strategies are tried strictly one after another, cheapest first. Each one
//! either passes (`None`), wins (`Some(Ok)`), or aborts the whole request with
//! a hard failure (`Some(Err)`). Running out of strategies is not an error:
//! it becomes a manual-fallback instruction for the caller.
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::model_extractor::{ModelExtractionError, ModelExtractor};
use super::render::{PageRenderer, RenderOutput};
use super::site_rules::SiteRules;
use super::structured::{GuestPageSource, StructuredSource};
use super::types::{ExtractionOutcome, SourceStrategy, SuggestedAction};
use super::url_policy::{resolve_job_url, ResolvedUrl};
use crate::config::ScrapingSettings;
use crate::error::{AcquisitionError, ReasonCode};
use crate::llm::LlmFailureKind;
use crate::utils::char_len;

/// State shared by the strategies of one acquisition.
#[derive(Debug)]
pub struct AttemptContext {
    pub target: ResolvedUrl,
    /// Best raw text seen so far, for the model-assisted strategy.
    pub recovered_text: Option<String>,
    pub navigation_failed: bool,
}

impl AttemptContext {
    pub fn new(target: ResolvedUrl) -> Self {
        Self {
            target,
            recovered_text: None,
            navigation_failed: false,
        }
    }

    fn recover(&mut self, text: String) {
        if !text.trim().is_empty() {
            self.recovered_text = Some(text);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accepted {
    pub text: String,
    pub source: SourceStrategy,
}

#[async_trait]
pub trait AcquisitionStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn attempt(&self, ctx: &mut AttemptContext) -> Option<Result<Accepted, AcquisitionError>>;
}

/// The site's own posting API, when the URL carried a job id.
pub struct StructuredSiteStrategy {
    source: Arc<dyn StructuredSource>,
}

impl StructuredSiteStrategy {
    pub fn new(source: Arc<dyn StructuredSource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl AcquisitionStrategy for StructuredSiteStrategy {
    fn name(&self) -> &'static str {
        "structured_site"
    }

    async fn attempt(&self, ctx: &mut AttemptContext) -> Option<Result<Accepted, AcquisitionError>> {
        let job_id = ctx.target.job_id.as_deref()?;
        if !ctx.target.site.has_structured_surface() {
            return None;
        }
        let posting = self.source.fetch_structured(&ctx.target.site, job_id).await?;
        Some(Ok(Accepted {
            text: posting.to_text(),
            source: SourceStrategy::StructuredSite,
        }))
    }
}

/// Static HTML of the public guest page.
pub struct GuestViewStrategy {
    source: Arc<dyn GuestPageSource>,
    min_chars: usize,
}

impl GuestViewStrategy {
    pub fn new(source: Arc<dyn GuestPageSource>, min_chars: usize) -> Self {
        Self { source, min_chars }
    }
}

#[async_trait]
impl AcquisitionStrategy for GuestViewStrategy {
    fn name(&self) -> &'static str {
        "guest_view"
    }

    async fn attempt(&self, ctx: &mut AttemptContext) -> Option<Result<Accepted, AcquisitionError>> {
        let posting = self.source.fetch_guest(&ctx.target).await?;
        if posting.is_viable(self.min_chars) {
            return Some(Ok(Accepted {
                text: posting.to_text(),
                source: SourceStrategy::GenericPage,
            }));
        }
        info!(
            "Guest view too short ({} < {} chars)",
            posting.description_len(),
            self.min_chars
        );
        ctx.recover(posting.to_text());
        None
    }
}

/// Full headless render with selector, heuristic and raw-text fallbacks.
pub struct PageRenderStrategy {
    renderer: Arc<dyn PageRenderer>,
    min_chars: usize,
}

impl PageRenderStrategy {
    pub fn new(renderer: Arc<dyn PageRenderer>, min_chars: usize) -> Self {
        Self { renderer, min_chars }
    }
}

#[async_trait]
impl AcquisitionStrategy for PageRenderStrategy {
    fn name(&self) -> &'static str {
        "page_render"
    }

    async fn attempt(&self, ctx: &mut AttemptContext) -> Option<Result<Accepted, AcquisitionError>> {
        match self
            .renderer
            .render_and_extract(&ctx.target.url, &ctx.target.site)
            .await
        {
            Ok(RenderOutput::Posting(posting)) if posting.is_viable(self.min_chars) => {
                Some(Ok(Accepted {
                    text: posting.to_text(),
                    source: SourceStrategy::GenericPage,
                }))
            }
            Ok(RenderOutput::Posting(posting)) => {
                ctx.recover(posting.to_text());
                None
            }
            Ok(RenderOutput::RawText(text)) => {
                ctx.recover(text);
                None
            }
            Err(e) if e.is_unreachable() => {
                warn!("Page render gave up: {}", e);
                ctx.navigation_failed = true;
                None
            }
            Err(e) => {
                error!("Browser failure while rendering {}: {}", ctx.target.url, e);
                Some(Err(AcquisitionError::Browser(e.to_string())))
            }
        }
    }
}

/// Language-model cleanup of whatever text earlier strategies recovered.
pub struct ModelAssistedStrategy {
    extractor: Option<Arc<ModelExtractor>>,
}

impl ModelAssistedStrategy {
    /// `None` means no model is configured; the strategy then always passes.
    pub fn new(extractor: Option<Arc<ModelExtractor>>) -> Self {
        Self { extractor }
    }
}

#[async_trait]
impl AcquisitionStrategy for ModelAssistedStrategy {
    fn name(&self) -> &'static str {
        "model_assisted"
    }

    async fn attempt(&self, ctx: &mut AttemptContext) -> Option<Result<Accepted, AcquisitionError>> {
        let Some(extractor) = &self.extractor else {
            warn!("No language model configured, skipping model-assisted extraction");
            return None;
        };
        let raw = ctx.recovered_text.as_deref()?;

        match extractor.extract_via_model(raw, &ctx.target.url).await {
            Ok(text) => Some(Ok(Accepted {
                text,
                source: SourceStrategy::LlmAssisted,
            })),
            Err(ModelExtractionError::Insufficient { chars, min }) => {
                info!("Model extraction insufficient ({} < {} chars)", chars, min);
                None
            }
            Err(ModelExtractionError::Model(e)) => match e.kind() {
                LlmFailureKind::Other => {
                    warn!("Language model request failed, falling back: {}", e);
                    None
                }
                _ => {
                    error!("Language model request failed: {}", e);
                    Some(Err(AcquisitionError::Model(e)))
                }
            },
        }
    }
}

pub struct Orchestrator {
    rules: Arc<SiteRules>,
    strategies: Vec<Box<dyn AcquisitionStrategy>>,
    min_viable_chars: usize,
}

impl Orchestrator {
    pub fn new(
        rules: Arc<SiteRules>,
        strategies: Vec<Box<dyn AcquisitionStrategy>>,
        min_viable_chars: usize,
    ) -> Self {
        Self {
            rules,
            strategies,
            min_viable_chars,
        }
    }

    /// The production order: structured API, guest page, render, model.
    pub fn standard(
        rules: Arc<SiteRules>,
        structured: Arc<dyn StructuredSource>,
        guest: Arc<dyn GuestPageSource>,
        renderer: Arc<dyn PageRenderer>,
        model: Option<Arc<ModelExtractor>>,
        settings: &ScrapingSettings,
    ) -> Self {
        let strategies: Vec<Box<dyn AcquisitionStrategy>> = vec![
            Box::new(StructuredSiteStrategy::new(structured)),
            Box::new(GuestViewStrategy::new(guest, settings.guest_min_chars)),
            Box::new(PageRenderStrategy::new(renderer, settings.page_min_chars)),
            Box::new(ModelAssistedStrategy::new(model)),
        ];
        let floor = settings
            .guest_min_chars
            .min(settings.page_min_chars)
            .min(settings.model_min_chars);
        Self::new(rules, strategies, floor)
    }

    pub fn rules(&self) -> &SiteRules {
        &self.rules
    }

    pub async fn acquire_job_text(&self, url: &str) -> ExtractionOutcome {
        self.acquire_tracked(url, &Uuid::new_v4().to_string()).await
    }

    /// Same as `acquire_job_text`, logged under a caller-supplied request id.
    pub async fn acquire_tracked(&self, url: &str, request_id: &str) -> ExtractionOutcome {
        let span = info_span!("acquire", request_id = %request_id, host = tracing::field::Empty);
        self.run(url).instrument(span).await
    }

    async fn run(&self, url: &str) -> ExtractionOutcome {
        let target = match resolve_job_url(url, &self.rules) {
            Ok(target) => target,
            Err(e) => {
                warn!("Rejected job URL {}: {}", url, e);
                return ExtractionOutcome::failure(&e);
            }
        };
        tracing::Span::current().record("host", target.host.as_str());
        info!(
            "Acquiring job text from {} (site: {}, job id: {:?})",
            target.url, target.site.name, target.job_id
        );

        let mut ctx = AttemptContext::new(target);
        for strategy in &self.strategies {
            info!("Trying strategy {}", strategy.name());
            match strategy.attempt(&mut ctx).await {
                None => continue,
                Some(Err(e)) => return ExtractionOutcome::failure(&e),
                Some(Ok(accepted)) => {
                    let text = accepted.text.trim();
                    let chars = char_len(text);
                    if chars < self.min_viable_chars {
                        warn!(
                            "Strategy {} returned {} chars, below the {} floor",
                            strategy.name(),
                            chars,
                            self.min_viable_chars
                        );
                        continue;
                    }
                    info!("Strategy {} succeeded ({} chars)", strategy.name(), chars);
                    return ExtractionOutcome::Success {
                        text: text.to_string(),
                        source_strategy: accepted.source,
                    };
                }
            }
        }

        manual_fallback(ctx)
    }
}

fn manual_fallback(ctx: AttemptContext) -> ExtractionOutcome {
    let reason_code = if ctx.navigation_failed {
        ReasonCode::PageUnreachable
    } else {
        ReasonCode::ExtractionInsufficient
    };
    let (suggested_action, message) = match ctx.target.job_id {
        Some(_) => (
            SuggestedAction::ClientSideFetch,
            "Server-side extraction failed. The posting will be fetched through your browser.",
        ),
        None if ctx.navigation_failed => (
            SuggestedAction::ManualPaste,
            "The job page could not be reached. Please copy and paste the job description.",
        ),
        None => (
            SuggestedAction::ManualPaste,
            "Could not extract the job description. Please paste it or upload a screenshot.",
        ),
    };
    info!("All strategies exhausted ({:?}), suggesting {:?}", reason_code, suggested_action);
    ExtractionOutcome::NeedsManualFallback {
        reason_code,
        suggested_action,
        partial_identifier: ctx.target.job_id,
        message: message.to_string(),
    }
}
