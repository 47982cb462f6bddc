// src/lib.rs
//! Job-posting intake: turns a job-board URL or a screenshot into plain
//! description text for the CV tooling.
pub mod auth;
pub mod config;
pub mod error;
pub mod job_acquisition;
pub mod llm;
pub mod utils;
pub mod web;

use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::job_acquisition::fetch::HttpFetcher;
use crate::job_acquisition::{
    ChromeLauncher, JobBoardScraper, ModelExtractor, OcrExtractor, Orchestrator,
    RenderExtractor, RenderSettings, TesseractEngine,
};
use crate::llm::AnthropicClient;

pub use web::start_web_server;

/// Everything a request needs, built once at startup.
pub struct Services {
    pub orchestrator: Orchestrator,
    pub ocr: OcrExtractor,
    pub llm_configured: bool,
}

impl Services {
    pub fn new(orchestrator: Orchestrator, ocr: OcrExtractor, llm_configured: bool) -> Self {
        Self {
            orchestrator,
            ocr,
            llm_configured,
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let scraping = &config.scraping;
        let rules = Arc::new(config.site_rules()?);
        info!("Loaded site rules for: {}", rules.site_names().join(", "));

        let fetcher = Arc::new(HttpFetcher::new(scraping)?);
        let scraper = Arc::new(JobBoardScraper::new(fetcher, scraping.structured_min_chars));

        let launcher = Arc::new(ChromeLauncher::new(
            scraping.chrome_path.clone(),
            (scraping.viewport_width, scraping.viewport_height),
        ));
        let renderer = Arc::new(RenderExtractor::new(
            launcher,
            RenderSettings::from_scraping(scraping),
            rules.heuristics.clone(),
            scraping.max_concurrent_renders,
        ));

        let model = match AnthropicClient::from_settings(&config.llm)? {
            Some(client) => Some(Arc::new(ModelExtractor::new(
                Arc::new(client),
                &config.llm,
                scraping,
            ))),
            None => {
                warn!("ANTHROPIC_API_KEY not set, model-assisted extraction disabled");
                None
            }
        };
        let llm_configured = model.is_some();

        let orchestrator = Orchestrator::standard(
            rules,
            scraper.clone(),
            scraper,
            renderer,
            model,
            scraping,
        );
        let ocr = OcrExtractor::new(Arc::new(TesseractEngine::new(&config.ocr)), &config.ocr);

        Ok(Self::new(orchestrator, ocr, llm_configured))
    }
}
