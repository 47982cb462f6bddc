// src/job_acquisition/mod.rs
pub mod fetch;
pub mod html_text;
pub mod model_extractor;
pub mod ocr;
pub mod orchestrator;
pub mod render;
pub mod site_rules;
pub mod structured;
pub mod types;
pub mod url_policy;

pub use model_extractor::{ModelExtractionError, ModelExtractor};
pub use ocr::{OcrEngine, OcrError, OcrExtractor, OcrWorker, TesseractEngine};
pub use orchestrator::{AcquisitionStrategy, Orchestrator};
pub use render::{chrome::ChromeLauncher, PageRenderer, RenderExtractor, RenderSettings};
pub use site_rules::{SiteRules, SupportedSite};
pub use structured::JobBoardScraper;
pub use types::{ExtractionOutcome, JobPosting, SourceStrategy, SuggestedAction};
