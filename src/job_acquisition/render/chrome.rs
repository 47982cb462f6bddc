// src/job_acquisition/render/chrome.rs
use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::{BrowserLauncher, BrowserSession, ClientProfile, RenderError, WaitPolicy};

const READY_POLL: Duration = Duration::from_millis(100);

/// Launches a fresh headless Chrome for every session.
pub struct ChromeLauncher {
    chrome_path: Option<PathBuf>,
    viewport: (u32, u32),
}

impl ChromeLauncher {
    pub fn new(chrome_path: Option<PathBuf>, viewport: (u32, u32)) -> Self {
        Self {
            chrome_path,
            viewport,
        }
    }
}

#[async_trait]
impl BrowserLauncher for ChromeLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, RenderError> {
        let path = self.chrome_path.clone();
        let viewport = self.viewport;

        let (browser, tab) = tokio::task::spawn_blocking(move || {
            let options = LaunchOptions::default_builder()
                .headless(true)
                .sandbox(true)
                .window_size(Some(viewport))
                .path(path)
                .build()
                .map_err(|e| RenderError::Launch(e.to_string()))?;
            let browser = Browser::new(options).map_err(|e| RenderError::Launch(e.to_string()))?;
            let tab = browser
                .new_tab()
                .map_err(|e| RenderError::Launch(e.to_string()))?;
            Ok::<_, RenderError>((browser, tab))
        })
        .await
        .map_err(|e| RenderError::Launch(e.to_string()))??;

        debug!("Launched headless Chrome");
        Ok(Box::new(ChromeSession {
            browser: Some(browser),
            tab,
        }))
    }
}

/// One browser process with a single tab. The process is killed when the
/// session is closed or dropped.
pub struct ChromeSession {
    browser: Option<Browser>,
    tab: Arc<Tab>,
}

impl ChromeSession {
    /// headless_chrome is synchronous; run its calls off the async workers.
    async fn on_tab<T, F>(&self, op: F) -> Result<T, RenderError>
    where
        T: Send + 'static,
        F: FnOnce(&Tab) -> Result<T, RenderError> + Send + 'static,
    {
        let tab = self.tab.clone();
        tokio::task::spawn_blocking(move || op(tab.as_ref()))
            .await
            .map_err(|e| RenderError::Session(e.to_string()))?
    }
}

#[async_trait]
impl BrowserSession for ChromeSession {
    async fn configure(&mut self, profile: &ClientProfile) -> Result<(), RenderError> {
        let user_agent = profile.user_agent.clone();
        let language = profile.accept_language.clone();
        self.on_tab(move |tab| {
            tab.set_user_agent(&user_agent, Some(&language), None)
                .map_err(|e| RenderError::Session(e.to_string()))
        })
        .await
    }

    async fn goto(&mut self, url: &str, wait: WaitPolicy, timeout: Duration) -> Result<(), RenderError> {
        let url = url.to_string();
        self.on_tab(move |tab| {
            let deadline = Instant::now() + timeout;
            tab.set_default_timeout(timeout);
            tab.navigate_to(&url)
                .map_err(|e| RenderError::Navigation(e.to_string()))?;
            match wait {
                WaitPolicy::DomContentLoaded => wait_for_dom_ready(tab, deadline),
                WaitPolicy::Load => {
                    tab.set_default_timeout(remaining(deadline, timeout)?);
                    tab.wait_until_navigated()
                        .map(|_| ())
                        .map_err(|e| RenderError::Navigation(e.to_string()))
                }
            }
        })
        .await
    }

    async fn content(&mut self) -> Result<String, RenderError> {
        self.on_tab(|tab| {
            tab.get_content()
                .map_err(|e| RenderError::Session(e.to_string()))
        })
        .await
    }

    async fn click_first(&mut self, selectors: &[String]) -> Result<bool, RenderError> {
        let selectors = selectors.to_vec();
        self.on_tab(move |tab| {
            for selector in &selectors {
                let Ok(element) = tab.find_element(selector) else {
                    continue;
                };
                return element
                    .click()
                    .map(|_| true)
                    .map_err(|e| RenderError::Session(e.to_string()));
            }
            Ok(false)
        })
        .await
    }

    async fn close(mut self: Box<Self>) {
        let closed = self
            .on_tab(|tab| {
                tab.close(false)
                    .map_err(|e| RenderError::Session(e.to_string()))
            })
            .await;
        if let Err(e) = closed {
            warn!("Failed to close browser tab cleanly: {}", e);
        }
        self.browser.take();
        debug!("Closed headless Chrome");
    }
}

fn remaining(deadline: Instant, timeout: Duration) -> Result<Duration, RenderError> {
    let left = deadline.saturating_duration_since(Instant::now());
    if left.is_zero() {
        return Err(RenderError::Navigation(format!(
            "timed out after {}ms",
            timeout.as_millis()
        )));
    }
    Ok(left)
}

/// Poll `document.readyState` until the parser is done with the new document.
fn wait_for_dom_ready(tab: &Tab, deadline: Instant) -> Result<(), RenderError> {
    loop {
        let state = tab
            .evaluate(
                "location.href !== 'about:blank' ? document.readyState : 'loading'",
                false,
            )
            .map_err(|e| RenderError::Navigation(e.to_string()))?;
        if matches!(
            state.value.as_ref().and_then(|v| v.as_str()),
            Some("interactive" | "complete")
        ) {
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(RenderError::Navigation(
                "DOM content not loaded before timeout".to_string(),
            ));
        }
        std::thread::sleep(READY_POLL);
    }
}

impl Drop for ChromeSession {
    fn drop(&mut self) {
        if self.browser.take().is_some() {
            debug!("Browser session dropped without close, process terminated");
        }
    }
}
