// src/config.rs
//! Layered configuration: optional `config.yaml`, then environment overrides.
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::job_acquisition::render::{NavigationTier, WaitPolicy};
use crate::job_acquisition::site_rules::SiteRules;

const CONFIG_PATH_ENV: &str = "CVENOM_JOBS_CONFIG";
const DEFAULT_CONFIG_FILE: &str = "config.yaml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerSettings,
    pub auth: AuthSettings,
    pub llm: LlmSettings,
    pub scraping: ScrapingSettings,
    pub ocr: OcrSettings,
    /// Site-rule table override; the embedded table is used when unset.
    pub site_rules_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub address: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    pub jwt_secret: Option<String>,
    pub issuer: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub api_key: Option<String>,
    pub model: String,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    pub max_input_chars: usize,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "claude-sonnet-4-5".to_string(),
            max_tokens: 4096,
            timeout_secs: 120,
            max_input_chars: 50_000,
        }
    }
}

impl LlmSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapingSettings {
    pub user_agent: String,
    pub accept_language: String,
    pub http_timeout_secs: u64,
    pub structured_min_chars: usize,
    pub guest_min_chars: usize,
    pub page_min_chars: usize,
    pub model_min_chars: usize,
    pub navigation: Vec<NavigationTier>,
    pub settle_delay_ms: u64,
    pub expand_attempts: u32,
    pub expand_pause_ms: u64,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub max_concurrent_renders: usize,
    pub chrome_path: Option<PathBuf>,
}

impl Default for ScrapingSettings {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36".to_string(),
            accept_language: "en-US,en;q=0.9,fr;q=0.8".to_string(),
            http_timeout_secs: 15,
            structured_min_chars: 200,
            guest_min_chars: 100,
            page_min_chars: 100,
            model_min_chars: 100,
            navigation: vec![
                NavigationTier {
                    wait: WaitPolicy::DomContentLoaded,
                    timeout_ms: 30_000,
                },
                NavigationTier {
                    wait: WaitPolicy::Load,
                    timeout_ms: 20_000,
                },
            ],
            settle_delay_ms: 3_000,
            expand_attempts: 3,
            expand_pause_ms: 1_000,
            viewport_width: 1366,
            viewport_height: 900,
            max_concurrent_renders: 2,
            chrome_path: None,
        }
    }
}

impl ScrapingSettings {
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn expand_pause(&self) -> Duration {
        Duration::from_millis(self.expand_pause_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrSettings {
    pub tesseract_path: PathBuf,
    pub languages: String,
    pub min_chars: usize,
    pub timeout_secs: u64,
    pub max_image_bytes: usize,
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            tesseract_path: PathBuf::from("tesseract"),
            languages: "eng+fra".to_string(),
            min_chars: 50,
            timeout_secs: 60,
            max_image_bytes: 10 * 1024 * 1024,
        }
    }
}

impl OcrSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl AppConfig {
    /// Load `config.yaml` (or the file named by `CVENOM_JOBS_CONFIG`) when it
    /// exists, then apply environment overrides.
    pub fn load() -> Result<Self> {
        let explicit = std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from);
        let path = explicit
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        let mut config = if path.exists() {
            info!("Loading configuration from {}", path.display());
            Self::from_file(&path)?
        } else if explicit.is_some() {
            anyhow::bail!("Configuration file not found: {}", path.display());
        } else {
            info!("No {} found, using defaults", DEFAULT_CONFIG_FILE);
            Self::default()
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_yaml(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Environment wins over the file. The lookup is injected so tests do not
    /// have to mutate the process environment.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT").or_else(|| lookup("ROCKET_PORT")) {
            self.server.port = port
                .parse()
                .with_context(|| format!("PORT must be a valid port number, got {}", port))?;
        }
        if let Some(secret) = lookup("JWT_SECRET") {
            self.auth.jwt_secret = Some(secret);
        }
        if let Some(key) = lookup("ANTHROPIC_API_KEY") {
            self.llm.api_key = Some(key);
        }
        if let Some(model) = lookup("ANTHROPIC_MODEL") {
            self.llm.model = model;
        }
        if let Some(path) = lookup("CHROME_PATH") {
            self.scraping.chrome_path = Some(PathBuf::from(path));
        }
        if let Some(path) = lookup("TESSERACT_PATH") {
            self.ocr.tesseract_path = PathBuf::from(path);
        }
        if let Some(languages) = lookup("OCR_LANGUAGES") {
            self.ocr.languages = languages;
        }
        if let Some(path) = lookup("SITE_RULES_PATH") {
            self.site_rules_path = Some(PathBuf::from(path));
        }
        Ok(())
    }

    pub fn site_rules(&self) -> Result<SiteRules> {
        match &self.site_rules_path {
            Some(path) => SiteRules::from_file(path)
                .with_context(|| format!("Failed to load site rules from {}", path.display())),
            None => SiteRules::embedded().context("Embedded site rules are invalid"),
        }
    }

    pub fn llm_configured(&self) -> bool {
        self.llm
            .api_key
            .as_deref()
            .is_some_and(|key| !key.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_match_pipeline_thresholds() {
        let config = AppConfig::default();
        assert_eq!(config.scraping.structured_min_chars, 200);
        assert_eq!(config.scraping.guest_min_chars, 100);
        assert_eq!(config.scraping.navigation.len(), 2);
        assert_eq!(config.scraping.navigation[0].wait, WaitPolicy::DomContentLoaded);
        assert_eq!(config.ocr.min_chars, 50);
        assert_eq!(config.llm.max_input_chars, 50_000);
        assert!(!config.llm_configured());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = r#"
server:
  port: 9100
scraping:
  settle_delay_ms: 500
  navigation:
    - wait: load
      timeout_ms: 5000
"#;
        let config = AppConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.address, "0.0.0.0");
        assert_eq!(config.scraping.settle_delay_ms, 500);
        assert_eq!(config.scraping.navigation.len(), 1);
        assert_eq!(config.scraping.navigation[0].wait, WaitPolicy::Load);
        assert_eq!(config.scraping.http_timeout_secs, 15);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("ROCKET_PORT", "8123"),
            ("ANTHROPIC_API_KEY", "sk-test"),
            ("OCR_LANGUAGES", "eng+deu"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config
            .apply_env(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.server.port, 8123);
        assert!(config.llm_configured());
        assert_eq!(config.ocr.languages, "eng+deu");
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let mut config = AppConfig::default();
        let result = config.apply_env(|key| (key == "PORT").then(|| "eighty".to_string()));
        assert!(result.is_err());
    }
}
