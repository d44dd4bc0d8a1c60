//! Chromiumoxide-backed implementation of the render-engine traits

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::fetch::{
    ContinueRequestParams, EnableParams as FetchEnableParams, FailRequestParams,
};
use chromiumoxide::cdp::browser_protocol::network::{ErrorReason, ResourceType};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::element::Element;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{gate, ElementHandle, RenderPage, ResourceDecision, ResourceKind};
use crate::config::Config;
use crate::error::HarvestError;

impl ResourceKind {
    fn from_cdp(kind: &ResourceType) -> Self {
        match kind {
            ResourceType::Document => Self::Document,
            ResourceType::Stylesheet => Self::Stylesheet,
            ResourceType::Image => Self::Image,
            ResourceType::Media => Self::Media,
            ResourceType::Font => Self::Font,
            ResourceType::Script => Self::Script,
            ResourceType::Xhr | ResourceType::Fetch => Self::Xhr,
            _ => Self::Other,
        }
    }
}

/// Owns the browser process and its CDP event loop.
pub struct ChromiumEngine {
    browser: Browser,
    handler_task: JoinHandle<()>,
}

impl ChromiumEngine {
    pub async fn launch(config: &Config) -> Result<Self> {
        let mut builder = BrowserConfig::builder()
            .viewport(Viewport {
                width: 1280,
                height: 800,
                ..Viewport::default()
            })
            .window_size(1280, 800);
        if !config.headless {
            builder = builder.with_head();
        }
        let browser_config = builder
            .build()
            .map_err(|e| anyhow::anyhow!("browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(browser_config).await?;

        // Drive the CDP message loop for the lifetime of the browser.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("CDP handler event error: {e}");
                }
            }
        });

        Ok(Self {
            browser,
            handler_task,
        })
    }

    /// Open the single page the run drives, with the user agent applied and
    /// outbound requests routed through the resource gate.
    pub async fn new_page(&self, config: &Config) -> Result<ChromiumPage> {
        let page = self.browser.new_page("about:blank").await?;
        page.set_user_agent(config.user_agent.as_str()).await?;

        page.execute(FetchEnableParams::default()).await?;
        let mut paused_events = page
            .event_listener::<chromiumoxide::cdp::browser_protocol::fetch::EventRequestPaused>()
            .await?;

        let intercept_page = page.clone();
        let gate_task = tokio::spawn(async move {
            while let Some(event) = paused_events.next().await {
                let kind = ResourceKind::from_cdp(&event.resource_type);
                let url = event.request.url.clone();
                let request_id = event.request_id.clone();

                let outcome = match gate::decide(kind, &url) {
                    ResourceDecision::Allow => intercept_page
                        .execute(ContinueRequestParams::new(request_id))
                        .await
                        .map(|_| ()),
                    ResourceDecision::Block => intercept_page
                        .execute(FailRequestParams::new(
                            request_id,
                            ErrorReason::BlockedByClient,
                        ))
                        .await
                        .map(|_| ()),
                };
                if let Err(e) = outcome {
                    debug!("request gate for {url}: {e}");
                }
            }
        });

        Ok(ChromiumPage {
            page,
            gate_task: Some(gate_task),
        })
    }

    pub async fn close(mut self) -> Result<()> {
        if let Err(e) = self.browser.close().await {
            warn!("browser close: {e}");
        }
        self.handler_task.abort();
        Ok(())
    }
}

/// `RenderPage` over a chromiumoxide page.
pub struct ChromiumPage {
    page: Page,
    gate_task: Option<JoinHandle<()>>,
}

impl Drop for ChromiumPage {
    fn drop(&mut self) {
        if let Some(task) = self.gate_task.take() {
            task.abort();
        }
    }
}

#[async_trait]
impl RenderPage for ChromiumPage {
    async fn goto(&self, url: &str, timeout: Duration) -> crate::error::Result<()> {
        let navigation = async {
            self.page
                .goto(url)
                .await
                .map_err(HarvestError::navigation)?;
            self.page
                .wait_for_navigation()
                .await
                .map_err(HarvestError::navigation)?;
            Ok::<(), HarvestError>(())
        };
        tokio::time::timeout(timeout, navigation)
            .await
            .map_err(|_| HarvestError::Navigation(format!("timed out loading {url}")))?
    }

    async fn query(&self, selector: &str) -> crate::error::Result<Vec<Arc<dyn ElementHandle>>> {
        let elements = self
            .page
            .find_elements(selector)
            .await
            .map_err(HarvestError::element)?;
        Ok(elements
            .into_iter()
            .map(|el| Arc::new(ChromiumElement { element: el }) as Arc<dyn ElementHandle>)
            .collect())
    }

    async fn content(&self) -> crate::error::Result<String> {
        self.page.content().await.map_err(HarvestError::element)
    }

    async fn current_url(&self) -> crate::error::Result<String> {
        let url = self.page.url().await.map_err(HarvestError::element)?;
        Ok(url.unwrap_or_default())
    }

    async fn title(&self) -> crate::error::Result<String> {
        let title = self.page.get_title().await.map_err(HarvestError::element)?;
        Ok(title.unwrap_or_default())
    }

    async fn screenshot_page(&self, path: &Path, full_page: bool) -> crate::error::Result<()> {
        self.page
            .save_screenshot(
                ScreenshotParams::builder().full_page(full_page).build(),
                path,
            )
            .await
            .map_err(HarvestError::persistence)?;
        Ok(())
    }
}

struct ChromiumElement {
    element: Element,
}

#[async_trait]
impl ElementHandle for ChromiumElement {
    async fn is_visible(&self) -> crate::error::Result<bool> {
        // A clickable point only resolves for elements that are rendered
        // and on screen; treat its absence as "not visible".
        Ok(self.element.clickable_point().await.is_ok())
    }

    async fn attribute(&self, name: &str) -> crate::error::Result<Option<String>> {
        self.element
            .attribute(name)
            .await
            .map_err(HarvestError::element)
    }

    async fn inner_text(&self) -> crate::error::Result<String> {
        let text = self
            .element
            .inner_text()
            .await
            .map_err(HarvestError::element)?;
        Ok(text.unwrap_or_default())
    }

    async fn click(&self) -> crate::error::Result<()> {
        self.element.click().await.map_err(HarvestError::element)?;
        Ok(())
    }

    async fn screenshot(&self) -> crate::error::Result<Vec<u8>> {
        self.element
            .screenshot(CaptureScreenshotFormat::Png)
            .await
            .map_err(HarvestError::element)
    }
}
