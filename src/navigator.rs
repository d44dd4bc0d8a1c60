//! Page navigation with overlay waits, pacing and bounded retry

use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::Config;
use crate::engine::RenderPage;

/// Marker text of the site's transient "content loading, N seconds left"
/// overlay.
const LOADING_OVERLAY_MARKER: &str = "内容加载中";

/// How long to wait for the overlay to show up at all.
const OVERLAY_APPEAR_BOUND: Duration = Duration::from_secs(2);
/// How long to wait for a visible overlay to go away.
const OVERLAY_HIDE_BOUND: Duration = Duration::from_secs(10);
/// Fixed settle delay when the overlay never resolves.
const OVERLAY_FALLBACK_SETTLE: Duration = Duration::from_secs(7);
/// How long to wait for an optional target content selector.
const SELECTOR_BOUND: Duration = Duration::from_secs(5);
/// Poll interval for overlay/selector waits.
const POLL_INTERVAL: Duration = Duration::from_millis(250);
/// Linear backoff step between navigation retries.
const RETRY_BACKOFF_STEP: Duration = Duration::from_secs(2);

/// Loads URLs on the shared page, waiting out the site's loading overlay and
/// enforcing the global crawl-delay after every successful navigation.
pub struct Navigator {
    crawl_delay: Duration,
    nav_timeout: Duration,
    max_retries: u32,
}

impl Navigator {
    pub fn new(config: &Config) -> Self {
        Self {
            crawl_delay: config.crawl_delay,
            nav_timeout: config.nav_timeout,
            max_retries: config.max_retries,
        }
    }

    /// Navigate to `url` and wait for the page to become usable.
    ///
    /// Returns false when every attempt failed; callers treat that as
    /// best-effort and continue with whatever state the page is in.
    pub async fn load(
        &self,
        page: &dyn RenderPage,
        url: &str,
        wait_selector: Option<&str>,
    ) -> bool {
        for attempt in 0..=self.max_retries {
            match page.goto(url, self.nav_timeout).await {
                Ok(()) => {
                    self.settle(page).await;
                    if let Some(selector) = wait_selector {
                        // Layouts vary across sections; absence is tolerated.
                        if !self.wait_for_selector(page, selector).await {
                            debug!("selector {selector} absent on {url}");
                        }
                    }
                    self.pace().await;
                    return true;
                }
                Err(e) => {
                    warn!(
                        "navigation attempt {}/{} failed for {url}: {e}",
                        attempt + 1,
                        self.max_retries + 1
                    );
                    if attempt < self.max_retries {
                        sleep(RETRY_BACKOFF_STEP * (attempt + 1)).await;
                    }
                }
            }
        }
        false
    }

    /// Wait out the transient loading overlay. Used on its own after in-page
    /// clicks (tab switches, pagination) where no navigation happens.
    pub async fn settle(&self, page: &dyn RenderPage) {
        if !self
            .wait_for_marker(page, LOADING_OVERLAY_MARKER, true, OVERLAY_APPEAR_BOUND)
            .await
        {
            // Overlay never showed; page content was served directly.
            return;
        }
        if !self
            .wait_for_marker(page, LOADING_OVERLAY_MARKER, false, OVERLAY_HIDE_BOUND)
            .await
        {
            debug!("loading overlay did not resolve, settling for fallback delay");
            sleep(OVERLAY_FALLBACK_SETTLE).await;
        }
    }

    /// The mandatory crawl-delay. Fires exactly once per navigation or
    /// pagination action, regardless of which wait path was taken.
    pub async fn pace(&self) {
        sleep(self.crawl_delay).await;
    }

    async fn wait_for_selector(&self, page: &dyn RenderPage, selector: &str) -> bool {
        let deadline = tokio::time::Instant::now() + SELECTOR_BOUND;
        loop {
            if let Ok(handles) = page.query(selector).await {
                if !handles.is_empty() {
                    return true;
                }
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    /// Poll the document for `marker` until its presence equals `present`.
    async fn wait_for_marker(
        &self,
        page: &dyn RenderPage,
        marker: &str,
        present: bool,
        bound: Duration,
    ) -> bool {
        let deadline = tokio::time::Instant::now() + bound;
        loop {
            match page.content().await {
                Ok(html) if html.contains(marker) == present => return true,
                _ => {}
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            sleep(POLL_INTERVAL).await;
        }
    }
}
