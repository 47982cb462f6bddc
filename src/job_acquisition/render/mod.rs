// src/job_acquisition/render/mod.rs
//! Headless-browser extraction.
//!
//! The browser is only asked to navigate, click and hand back its DOM; all
//! selection and scoring happens on the HTML snapshot in `heuristics`.
pub mod chrome;
pub mod heuristics;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use self::heuristics::{extract_from_html, PageExtraction};
use super::site_rules::{HeuristicRules, SiteRule};
use super::types::JobPosting;
use crate::config::ScrapingSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitPolicy {
    DomContentLoaded,
    Load,
}

/// One step of the navigation retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationTier {
    pub wait: WaitPolicy,
    pub timeout_ms: u64,
}

impl NavigationTier {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to launch browser: {0}")]
    Launch(String),

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("navigation to {url} failed after {attempts} attempt(s): {last}")]
    Unreachable {
        url: String,
        attempts: usize,
        last: String,
    },

    #[error("browser session error: {0}")]
    Session(String),

    #[error("render capacity unavailable")]
    Capacity,
}

impl RenderError {
    /// Only an unreachable page is an expected outcome; everything else means
    /// the browser itself misbehaved.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Unreachable { .. })
    }
}

/// Desktop identity presented by the headless browser.
#[derive(Debug, Clone)]
pub struct ClientProfile {
    pub user_agent: String,
    pub accept_language: String,
    pub viewport: (u32, u32),
}

#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    /// Start an isolated browser with one open page.
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, RenderError>;
}

#[async_trait]
pub trait BrowserSession: Send {
    async fn configure(&mut self, profile: &ClientProfile) -> Result<(), RenderError>;

    /// Navigate and wait for `wait`. Implementations enforce `timeout` themselves
    /// and only return once the browser has stopped working on the request, so a
    /// caller may issue the next command as soon as this resolves.
    async fn goto(&mut self, url: &str, wait: WaitPolicy, timeout: Duration) -> Result<(), RenderError>;

    /// Serialized DOM of the current page.
    async fn content(&mut self) -> Result<String, RenderError>;

    /// Click the first selector that matches an element. `Ok(false)` when none did.
    async fn click_first(&mut self, selectors: &[String]) -> Result<bool, RenderError>;

    async fn close(self: Box<Self>);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutput {
    Posting(JobPosting),
    /// Approximate body text for the model-assisted extractor.
    RawText(String),
}

#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn render_and_extract(&self, url: &str, site: &SiteRule) -> Result<RenderOutput, RenderError>;
}

#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub profile: ClientProfile,
    pub navigation: Vec<NavigationTier>,
    pub settle_delay: Duration,
    pub expand_attempts: u32,
    pub expand_pause: Duration,
    pub min_chars: usize,
}

impl RenderSettings {
    pub fn from_scraping(settings: &ScrapingSettings) -> Self {
        Self {
            profile: ClientProfile {
                user_agent: settings.user_agent.clone(),
                accept_language: settings.accept_language.clone(),
                viewport: (settings.viewport_width, settings.viewport_height),
            },
            navigation: settings.navigation.clone(),
            settle_delay: settings.settle_delay(),
            expand_attempts: settings.expand_attempts,
            expand_pause: settings.expand_pause(),
            min_chars: settings.page_min_chars,
        }
    }
}

pub struct RenderExtractor {
    launcher: Arc<dyn BrowserLauncher>,
    settings: RenderSettings,
    heuristics: HeuristicRules,
    permits: Arc<Semaphore>,
}

impl RenderExtractor {
    pub fn new(
        launcher: Arc<dyn BrowserLauncher>,
        settings: RenderSettings,
        heuristics: HeuristicRules,
        max_concurrent: usize,
    ) -> Self {
        Self {
            launcher,
            settings,
            heuristics,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    async fn drive(
        &self,
        session: &mut dyn BrowserSession,
        url: &str,
        site: &SiteRule,
    ) -> Result<RenderOutput, RenderError> {
        session.configure(&self.settings.profile).await?;
        self.navigate(session, url).await?;

        tokio::time::sleep(self.settings.settle_delay).await;
        let mut html = session.content().await?;

        if !site.expand_selectors.is_empty() {
            html = self.expand(session, site, html).await?;
        }

        Ok(match extract_from_html(&html, site, &self.heuristics, self.settings.min_chars) {
            PageExtraction::Selector(posting) => {
                info!("Rendered page matched site selectors");
                RenderOutput::Posting(posting)
            }
            PageExtraction::Heuristic(posting) => {
                info!("Rendered page matched heuristic scan");
                RenderOutput::Posting(posting)
            }
            PageExtraction::Raw(text) => {
                info!("No description container found, returning raw page text");
                RenderOutput::RawText(text)
            }
        })
    }

    /// Walk the navigation tiers; first success wins, last failure is reported.
    /// Tiers run strictly one after another: the session owns the timeout.
    async fn navigate(&self, session: &mut dyn BrowserSession, url: &str) -> Result<(), RenderError> {
        let mut last = String::from("no navigation policy configured");
        for (attempt, tier) in self.settings.navigation.iter().enumerate() {
            match session.goto(url, tier.wait, tier.timeout()).await {
                Ok(()) => {
                    debug!("Navigation succeeded waiting for {:?}", tier.wait);
                    return Ok(());
                }
                Err(e) => {
                    warn!(
                        "Navigation attempt {} ({:?}, {}ms) failed: {}",
                        attempt + 1,
                        tier.wait,
                        tier.timeout_ms,
                        e
                    );
                    last = e.to_string();
                }
            }
        }
        Err(RenderError::Unreachable {
            url: url.to_string(),
            attempts: self.settings.navigation.len(),
            last,
        })
    }

    /// Click "show more" controls until none is left or attempts run out.
    async fn expand(
        &self,
        session: &mut dyn BrowserSession,
        site: &SiteRule,
        mut html: String,
    ) -> Result<String, RenderError> {
        for attempt in 1..=self.settings.expand_attempts {
            match session.click_first(&site.expand_selectors).await {
                Ok(true) => {
                    debug!("Expanded hidden content (attempt {})", attempt);
                    tokio::time::sleep(self.settings.expand_pause).await;
                    html = session.content().await?;
                }
                Ok(false) => break,
                Err(e) => {
                    debug!("Expand attempt {} failed: {}", attempt, e);
                    break;
                }
            }
        }
        Ok(html)
    }
}

#[async_trait]
impl PageRenderer for RenderExtractor {
    async fn render_and_extract(&self, url: &str, site: &SiteRule) -> Result<RenderOutput, RenderError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| RenderError::Capacity)?;

        let mut session = self.launcher.launch().await?;
        let result = self.drive(session.as_mut(), url, site).await;
        session.close().await;
        result
    }
}
