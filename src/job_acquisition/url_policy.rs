// src/job_acquisition/url_policy.rs
use std::sync::Arc;
use url::Url;

use super::site_rules::{SiteRule, SiteRules};
use crate::error::AcquisitionError;

/// A job URL that passed validation and the allow-list.
#[derive(Debug, Clone)]
pub struct ResolvedUrl {
    pub url: String,
    pub host: String,
    pub site: Arc<SiteRule>,
    pub job_id: Option<String>,
}

/// Validate `raw` and bind it to a supported site. Never touches the network.
pub fn resolve_job_url(raw: &str, rules: &SiteRules) -> Result<ResolvedUrl, AcquisitionError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AcquisitionError::MalformedUrl("URL is required".to_string()));
    }

    let url = Url::parse(trimmed)
        .map_err(|e| AcquisitionError::MalformedUrl(format!("{}: {}", trimmed, e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(AcquisitionError::MalformedUrl(format!(
            "unsupported scheme '{}'",
            url.scheme()
        )));
    }

    let host = url
        .host_str()
        .map(|h| h.to_ascii_lowercase())
        .ok_or_else(|| AcquisitionError::MalformedUrl(format!("{}: missing host", trimmed)))?;

    let site = rules
        .find(&host)
        .ok_or_else(|| AcquisitionError::UnsupportedSource {
            host: host.clone(),
            supported: rules.site_names(),
        })?;

    let job_id = site.job_id(url.as_str());
    if site.require_job_id && job_id.is_none() {
        return Err(AcquisitionError::MalformedUrl(format!(
            "{} is not a {} job posting URL",
            trimmed, site.name
        )));
    }

    Ok(ResolvedUrl {
        url: url.to_string(),
        host,
        site,
        job_id,
    })
}
