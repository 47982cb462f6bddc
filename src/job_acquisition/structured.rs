// src/job_acquisition/structured.rs
//! HTTP-only extractors: the site's public posting API and its guest page.
//!
//! Both swallow their own failures. A `None` means "try the next strategy".
use async_trait::async_trait;
use scraper::Html;
use std::sync::Arc;
use tracing::{info, warn};

use super::fetch::HtmlFetcher;
use super::html_text::parse_posting;
use super::site_rules::SiteRule;
use super::types::JobPosting;
use super::url_policy::ResolvedUrl;

#[async_trait]
pub trait StructuredSource: Send + Sync {
    /// A posting whose description clears the structured threshold, or `None`.
    async fn fetch_structured(&self, site: &SiteRule, job_id: &str) -> Option<JobPosting>;
}

#[async_trait]
pub trait GuestPageSource: Send + Sync {
    /// Whatever description the static guest page offers, however short.
    async fn fetch_guest(&self, target: &ResolvedUrl) -> Option<JobPosting>;
}

pub struct JobBoardScraper {
    fetcher: Arc<dyn HtmlFetcher>,
    structured_min_chars: usize,
}

impl JobBoardScraper {
    pub fn new(fetcher: Arc<dyn HtmlFetcher>, structured_min_chars: usize) -> Self {
        Self {
            fetcher,
            structured_min_chars,
        }
    }

    async fn fetch_posting(&self, url: &str, site: &SiteRule) -> Option<JobPosting> {
        let html = match self.fetcher.get_html(url).await {
            Ok(html) => html,
            Err(e) => {
                warn!("Fetching {} failed: {}", url, e);
                return None;
            }
        };

        let document = Html::parse_document(&html);
        let posting = parse_posting(&document, &site.selectors, 1);
        if posting.is_none() {
            warn!("No description container found at {}", url);
        }
        posting
    }
}

#[async_trait]
impl StructuredSource for JobBoardScraper {
    async fn fetch_structured(&self, site: &SiteRule, job_id: &str) -> Option<JobPosting> {
        let url = site.structured_url(job_id)?;
        info!("Fetching structured posting {} from {}", job_id, site.name);

        let posting = self.fetch_posting(&url, site).await?;
        if posting.is_viable(self.structured_min_chars) {
            info!(
                "Structured posting accepted ({} chars)",
                posting.description_len()
            );
            Some(posting)
        } else {
            info!(
                "Structured posting too short ({} < {} chars)",
                posting.description_len(),
                self.structured_min_chars
            );
            None
        }
    }
}

#[async_trait]
impl GuestPageSource for JobBoardScraper {
    async fn fetch_guest(&self, target: &ResolvedUrl) -> Option<JobPosting> {
        let url = target
            .job_id
            .as_deref()
            .and_then(|id| target.site.guest_url(id))
            .unwrap_or_else(|| target.url.clone());
        info!("Fetching guest view {}", url);
        self.fetch_posting(&url, &target.site).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job_acquisition::fetch::FetchError;
    use crate::job_acquisition::site_rules::SiteRules;
    use crate::job_acquisition::url_policy::resolve_job_url;
    use std::sync::Mutex;

    struct StaticFetcher {
        body: Result<String, u16>,
        requested: Mutex<Vec<String>>,
    }

    impl StaticFetcher {
        fn ok(body: String) -> Self {
            Self {
                body: Ok(body),
                requested: Mutex::new(Vec::new()),
            }
        }

        fn status(code: u16) -> Self {
            Self {
                body: Err(code),
                requested: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl HtmlFetcher for StaticFetcher {
        async fn get_html(&self, url: &str) -> Result<String, FetchError> {
            self.requested.lock().unwrap().push(url.to_string());
            self.body.clone().map_err(FetchError::Status)
        }
    }

    fn guest_api_page(description: &str) -> String {
        format!(
            r#"<html><body>
                <section class="top-card-layout">
                  <h2 class="top-card-layout__title">Platform Engineer</h2>
                  <a class="topcard__org-name-link">Acme</a>
                  <span class="topcard__flavor topcard__flavor--bullet">Paris, France</span>
                </section>
                <div class="show-more-less-html__markup"><p>{}</p><ul><li>Rust</li><li>Kubernetes</li></ul></div>
              </body></html>"#,
            description
        )
    }

    #[tokio::test]
    async fn test_structured_posting_accepted() {
        let fetcher = Arc::new(StaticFetcher::ok(guest_api_page(&"a".repeat(220))));
        let scraper = JobBoardScraper::new(fetcher.clone(), 200);
        let rules = SiteRules::embedded().unwrap();
        let site = rules.find("www.linkedin.com").unwrap();

        let posting = scraper.fetch_structured(&site, "123456789").await.unwrap();

        assert_eq!(posting.title.as_deref(), Some("Platform Engineer"));
        assert_eq!(posting.company.as_deref(), Some("Acme"));
        assert_eq!(posting.location.as_deref(), Some("Paris, France"));
        assert_eq!(posting.requirements, "- Rust\n- Kubernetes");
        assert_eq!(
            fetcher.requested.lock().unwrap().as_slice(),
            ["https://www.linkedin.com/jobs-guest/jobs/api/jobPosting/123456789"]
        );
    }

    #[tokio::test]
    async fn test_short_structured_posting_is_none() {
        let fetcher = Arc::new(StaticFetcher::ok(
            "<div class='show-more-less-html__markup'>Too short</div>".to_string(),
        ));
        let scraper = JobBoardScraper::new(fetcher, 200);
        let rules = SiteRules::embedded().unwrap();
        let site = rules.find("linkedin.com").unwrap();

        assert!(scraper.fetch_structured(&site, "123456789").await.is_none());
    }

    #[tokio::test]
    async fn test_http_error_is_swallowed() {
        let fetcher = Arc::new(StaticFetcher::status(429));
        let scraper = JobBoardScraper::new(fetcher, 200);
        let rules = SiteRules::embedded().unwrap();
        let site = rules.find("linkedin.com").unwrap();

        assert!(scraper.fetch_structured(&site, "123456789").await.is_none());
    }

    #[tokio::test]
    async fn test_site_without_structured_surface_makes_no_request() {
        let fetcher = Arc::new(StaticFetcher::ok(String::new()));
        let scraper = JobBoardScraper::new(fetcher.clone(), 200);
        let rules = SiteRules::embedded().unwrap();
        let site = rules.find("www.welcometothejungle.com").unwrap();

        assert!(scraper.fetch_structured(&site, "1").await.is_none());
        assert!(fetcher.requested.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_guest_view_uses_canonical_url_and_keeps_short_text() {
        let fetcher = Arc::new(StaticFetcher::ok(guest_api_page("Short teaser")));
        let scraper = JobBoardScraper::new(fetcher.clone(), 200);
        let rules = SiteRules::embedded().unwrap();
        let target = resolve_job_url(
            "https://www.linkedin.com/jobs/search/?currentJobId=3987654321",
            &rules,
        )
        .unwrap();

        let posting = scraper.fetch_guest(&target).await.unwrap();

        assert!(posting.description.starts_with("Short teaser"));
        assert_eq!(
            fetcher.requested.lock().unwrap().as_slice(),
            ["https://www.linkedin.com/jobs/view/3987654321"]
        );
    }
}
