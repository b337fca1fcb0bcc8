//! Adapter for JavaScript-rendered portals, driven through headless Chrome.
//!
//! One browser is launched per fetch and closed afterwards; every listing
//! page and detail page of the source is rendered in it. The page's own
//! sub-resources are loaded by the browser; only the page URLs themselves go
//! through robots.txt and the host throttle.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use chrono_tz::Tz;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

use super::civicclerk::attach_text_endpoints;
use super::static_html::{compile_for, ListingPages};
use super::{ListingExtractor, SiteAdapter};
use crate::config::{Readiness, SourceConfig};
use crate::error::{FetchError, FetchResult, SourceResult};
use crate::politeness::Politeness;
use crate::types::RawRecord;

/// How often a readiness selector is polled.
const READINESS_POLL: Duration = Duration::from_millis(250);

pub struct RenderedPortalAdapter {
    politeness: Arc<Politeness>,
    timezone: Tz,
    chrome_executable: Option<PathBuf>,
    navigation_timeout: Duration,
}

impl RenderedPortalAdapter {
    pub fn new(politeness: Arc<Politeness>, timezone: Tz) -> Self {
        Self {
            politeness,
            timezone,
            chrome_executable: None,
            navigation_timeout: Duration::from_secs(30),
        }
    }

    /// Use a specific Chrome binary instead of auto-detection.
    pub fn with_chrome_executable(mut self, path: Option<impl Into<PathBuf>>) -> Self {
        self.chrome_executable = path.map(Into::into);
        self
    }

    pub fn with_navigation_timeout(mut self, timeout: Duration) -> Self {
        self.navigation_timeout = timeout;
        self
    }

    async fn launch(&self, url: &str) -> FetchResult<BrowserSession> {
        let browser_err = |e: &dyn std::fmt::Display| FetchError::Browser {
            url: url.to_string(),
            message: e.to_string(),
        };

        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .request_timeout(self.navigation_timeout)
            .arg(format!("--user-agent={}", self.politeness.user_agent()));
        if let Some(path) = &self.chrome_executable {
            builder = builder.chrome_executable(path);
        }
        let config = builder.build().map_err(|e| browser_err(&e))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| browser_err(&e))?;
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        Ok(BrowserSession {
            browser,
            handler_task,
        })
    }

    /// Admitted render of one page.
    async fn render(
        &self,
        session: &BrowserSession,
        url: &str,
        readiness: Option<&Readiness>,
    ) -> SourceResult<String> {
        self.politeness.admit(url).await?;
        Ok(session.render(url, readiness).await?)
    }

    async fn scrape(
        &self,
        session: &BrowserSession,
        extractor: &ListingExtractor,
        source: &SourceConfig,
        urls: Vec<String>,
    ) -> SourceResult<Vec<RawRecord>> {
        let detail_readiness = source
            .selectors
            .as_ref()
            .and_then(|s| s.detail.as_ref())
            .and_then(|d| d.readiness_condition.as_ref());

        let mut pages = ListingPages::default();
        for url in urls {
            let page_url = Url::parse(&url).map_err(|_| FetchError::InvalidUrl { url: url.clone() })?;
            let html = match self.render(session, &url, source.readiness_condition.as_ref()).await {
                Ok(html) => html,
                Err(e) => {
                    pages.failed(source, &url, e);
                    continue;
                }
            };

            let listed = extractor.extract(&html, &page_url, source);
            let records = extractor
                .follow_details(listed, &page_url, source, move |detail_url: String| async move {
                    self.render(session, &detail_url, detail_readiness).await
                })
                .await;
            pages.scraped(records);
        }
        pages.finish()
    }
}

/// A launched browser and the task draining its CDP events.
struct BrowserSession {
    browser: Browser,
    handler_task: JoinHandle<()>,
}

impl BrowserSession {
    /// Load `url` in a new tab, wait for readiness, return the rendered DOM.
    async fn render(&self, url: &str, readiness: Option<&Readiness>) -> FetchResult<String> {
        let browser_err = |e: &dyn std::fmt::Display| FetchError::Browser {
            url: url.to_string(),
            message: e.to_string(),
        };

        let page = self.browser.new_page(url).await.map_err(|e| browser_err(&e))?;
        let result = async {
            page.wait_for_navigation()
                .await
                .map_err(|e| browser_err(&e))?;
            wait_ready(&page, url, readiness).await?;
            page.content().await.map_err(|e| browser_err(&e))
        }
        .await;

        if let Err(e) = page.close().await {
            debug!(url = %url, error = %e, "Failed to close tab");
        }
        result
    }

    async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!(error = %e, "Failed to close browser cleanly");
        }
        let _ = self.browser.wait().await;
        self.handler_task.abort();
    }
}

async fn wait_ready(page: &Page, url: &str, readiness: Option<&Readiness>) -> FetchResult<()> {
    match readiness {
        None => Ok(()),
        Some(Readiness::Delay { ms }) => {
            tokio::time::sleep(Duration::from_millis(*ms)).await;
            Ok(())
        }
        Some(Readiness::Selector {
            selector,
            timeout_ms,
        }) => {
            let deadline = Instant::now() + Duration::from_millis(*timeout_ms);
            loop {
                if page.find_element(selector.as_str()).await.is_ok() {
                    debug!(url = %url, selector = %selector, "Readiness selector present");
                    return Ok(());
                }
                if Instant::now() >= deadline {
                    warn!(url = %url, selector = %selector, "Readiness selector never appeared");
                    return Err(FetchError::Timeout {
                        url: url.to_string(),
                    });
                }
                tokio::time::sleep(READINESS_POLL).await;
            }
        }
    }
}

#[async_trait]
impl SiteAdapter for RenderedPortalAdapter {
    async fn fetch(&self, source: &SourceConfig) -> SourceResult<Vec<RawRecord>> {
        let extractor = compile_for(source)?;
        let today = Utc::now().with_timezone(&self.timezone).date_naive();
        let urls = source.listing_urls(today);
        let Some(first) = urls.first() else {
            return Ok(Vec::new());
        };

        // A disallowed first page never launches a browser
        self.politeness.check(first).await?;

        let started = Instant::now();
        let session = self.launch(first).await?;
        let result = self.scrape(&session, &extractor, source, urls).await;
        session.close().await;

        let mut records = result?;
        attach_text_endpoints(source, &mut records);

        info!(
            source_id = %source.id,
            records = records.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Rendered portal scraped"
        );
        Ok(records)
    }

    fn name(&self) -> &str {
        "rendered"
    }
}
