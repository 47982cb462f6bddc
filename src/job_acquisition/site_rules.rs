// src/job_acquisition/site_rules.rs
//! Declarative per-site scraping rules.
//!
//! New job boards are added in `config/site_rules.yaml`; nothing in the
//! pipeline names a specific site.
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use crate::utils::host_matches;

const EMBEDDED_RULES: &str = include_str!("../../config/site_rules.yaml");

#[derive(Debug, Error)]
pub enum SiteRulesError {
    #[error("failed to read site rules: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse site rules: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid job id pattern for {site}: {source}")]
    Pattern {
        site: String,
        #[source]
        source: regex::Error,
    },

    #[error("site {0} declares no hosts")]
    NoHosts(String),
}

#[derive(Debug, Deserialize)]
struct RulesFile {
    sites: Vec<RawSiteRule>,
    #[serde(default)]
    heuristics: HeuristicRules,
}

#[derive(Debug, Deserialize)]
struct RawSiteRule {
    name: String,
    hosts: Vec<String>,
    job_id_pattern: Option<String>,
    #[serde(default)]
    require_job_id: bool,
    structured_url: Option<String>,
    guest_url: Option<String>,
    #[serde(default)]
    title_selectors: Vec<String>,
    #[serde(default)]
    company_selectors: Vec<String>,
    #[serde(default)]
    location_selectors: Vec<String>,
    #[serde(default)]
    description_selectors: Vec<String>,
    #[serde(default)]
    expand_selectors: Vec<String>,
}

/// Ordered CSS selectors per posting field; the first non-empty match wins.
#[derive(Debug, Clone, Default)]
pub struct FieldSelectors {
    pub title: Vec<String>,
    pub company: Vec<String>,
    pub location: Vec<String>,
    pub description: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct SiteRule {
    pub name: String,
    pub hosts: Vec<String>,
    job_id_pattern: Option<Regex>,
    /// URLs on this site without a job id are rejected before any fetch.
    pub require_job_id: bool,
    structured_url: Option<String>,
    guest_url: Option<String>,
    pub selectors: FieldSelectors,
    pub expand_selectors: Vec<String>,
}

impl SiteRule {
    fn compile(raw: RawSiteRule) -> Result<Self, SiteRulesError> {
        if raw.hosts.is_empty() {
            return Err(SiteRulesError::NoHosts(raw.name));
        }
        let job_id_pattern = match raw.job_id_pattern {
            Some(pattern) => Some(Regex::new(&pattern).map_err(|source| {
                SiteRulesError::Pattern {
                    site: raw.name.clone(),
                    source,
                }
            })?),
            None => None,
        };

        Ok(Self {
            name: raw.name,
            hosts: raw.hosts,
            job_id_pattern,
            require_job_id: raw.require_job_id,
            structured_url: raw.structured_url,
            guest_url: raw.guest_url,
            selectors: FieldSelectors {
                title: raw.title_selectors,
                company: raw.company_selectors,
                location: raw.location_selectors,
                description: raw.description_selectors,
            },
            expand_selectors: raw.expand_selectors,
        })
    }

    pub fn matches_host(&self, host: &str) -> bool {
        self.hosts.iter().any(|domain| host_matches(host, domain))
    }

    /// Posting identifier embedded in the URL, if this site has a known pattern.
    pub fn job_id(&self, url: &str) -> Option<String> {
        self.job_id_pattern
            .as_ref()?
            .captures(url)?
            .get(1)
            .map(|m| m.as_str().to_string())
    }

    pub fn structured_url(&self, job_id: &str) -> Option<String> {
        self.structured_url
            .as_ref()
            .map(|template| template.replace("{id}", job_id))
    }

    pub fn guest_url(&self, job_id: &str) -> Option<String> {
        self.guest_url
            .as_ref()
            .map(|template| template.replace("{id}", job_id))
    }

    pub fn has_structured_surface(&self) -> bool {
        self.structured_url.is_some()
    }
}

/// Inputs of the generic full-page scan used when no site selector matches.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeuristicRules {
    /// Substrings of `class`/`id` attributes that hint at a description block.
    pub container_hints: Vec<String>,
    /// Lower-case posting vocabulary, in every language the boards use.
    pub keywords: Vec<String>,
    /// Lower-case navigation/chrome vocabulary that disqualifies a block.
    pub boilerplate: Vec<String>,
    /// Tags whose whole subtree is dropped before the last-resort line cut.
    pub chrome_tags: Vec<String>,
    pub min_candidate_chars: usize,
    pub head_fraction: f32,
    pub tail_fraction: f32,
    pub min_line_chars: usize,
}

impl Default for HeuristicRules {
    fn default() -> Self {
        Self {
            container_hints: vec!["description".to_string(), "job-details".to_string()],
            keywords: ["position", "responsibilit", "requirement", "experience"]
                .into_iter()
                .map(String::from)
                .collect(),
            boilerplate: ["sign in", "home"].into_iter().map(String::from).collect(),
            chrome_tags: ["nav", "header", "footer", "aside", "script", "style", "noscript"]
                .into_iter()
                .map(String::from)
                .collect(),
            min_candidate_chars: 100,
            head_fraction: 0.2,
            tail_fraction: 0.1,
            min_line_chars: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SupportedSite {
    pub name: String,
    pub hosts: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct SiteRules {
    sites: Vec<Arc<SiteRule>>,
    pub heuristics: HeuristicRules,
}

impl SiteRules {
    /// The table shipped with the binary.
    pub fn embedded() -> Result<Self, SiteRulesError> {
        Self::from_yaml(EMBEDDED_RULES)
    }

    pub fn from_file(path: &Path) -> Result<Self, SiteRulesError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, SiteRulesError> {
        let file: RulesFile = serde_yaml::from_str(content)?;
        let sites = file
            .sites
            .into_iter()
            .map(|spec| SiteRule::compile(spec).map(Arc::new))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            sites,
            heuristics: file.heuristics,
        })
    }

    pub fn find(&self, host: &str) -> Option<Arc<SiteRule>> {
        self.sites.iter().find(|site| site.matches_host(host)).cloned()
    }

    pub fn site_names(&self) -> Vec<String> {
        self.sites.iter().map(|site| site.name.clone()).collect()
    }

    pub fn supported_sites(&self) -> Vec<SupportedSite> {
        self.sites
            .iter()
            .map(|site| SupportedSite {
                name: site.name.clone(),
                hosts: site.hosts.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_rules_load() {
        let rules = SiteRules::embedded().unwrap();
        assert!(rules.site_names().contains(&"LinkedIn".to_string()));
        assert!(rules.heuristics.keywords.iter().any(|k| k == "poste"));
        assert!(rules.heuristics.chrome_tags.iter().any(|t| t == "nav"));
    }

    #[test]
    fn test_linkedin_job_id_patterns() {
        let rules = SiteRules::embedded().unwrap();
        let linkedin = rules.find("www.linkedin.com").unwrap();

        assert_eq!(
            linkedin.job_id("https://www.linkedin.com/jobs/view/123456789"),
            Some("123456789".to_string())
        );
        assert_eq!(
            linkedin.job_id("https://www.linkedin.com/jobs/view/rust-developer-at-acme-3901234567/?trk=x"),
            Some("3901234567".to_string())
        );
        assert_eq!(
            linkedin.job_id("https://www.linkedin.com/jobs/search/?currentJobId=3987654321&geoId=1"),
            Some("3987654321".to_string())
        );
        assert_eq!(linkedin.job_id("https://www.linkedin.com/feed/"), None);
        assert_eq!(
            linkedin.structured_url("42").as_deref(),
            Some("https://www.linkedin.com/jobs-guest/jobs/api/jobPosting/42")
        );
    }

    #[test]
    fn test_require_job_id_per_site() {
        let rules = SiteRules::embedded().unwrap();
        assert!(rules.find("www.linkedin.com").unwrap().require_job_id);
        assert!(!rules.find("www.welcometothejungle.com").unwrap().require_job_id);
    }

    #[test]
    fn test_unknown_host_has_no_rule() {
        let rules = SiteRules::embedded().unwrap();
        assert!(rules.find("example.com").is_none());
        assert!(rules.find("fr.indeed.com").is_some());
    }

    #[test]
    fn test_invalid_pattern_is_reported() {
        let yaml = r#"
sites:
  - name: Broken
    hosts: [broken.example]
    job_id_pattern: '(\d+'
"#;
        let err = SiteRules::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, SiteRulesError::Pattern { .. }));
    }

    #[test]
    fn test_site_without_hosts_is_rejected() {
        let yaml = "sites:\n  - name: Nowhere\n    hosts: []\n";
        assert!(matches!(
            SiteRules::from_yaml(yaml),
            Err(SiteRulesError::NoHosts(_))
        ));
    }
}
