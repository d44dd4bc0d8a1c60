//! Render-engine boundary: traits the pipeline drives the browser through
//!
//! The pipeline never touches the underlying engine directly; everything goes
//! through `RenderPage` and `ElementHandle`. The chromiumoxide adapter lives
//! in `chromium`, the request gating policy in `gate`.

pub mod chromium;
pub mod gate;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

/// Resource kind of an outbound request, as reported by the render engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Document,
    Stylesheet,
    Image,
    Media,
    Font,
    Script,
    Xhr,
    Other,
}

/// Verdict of the resource gate for one outbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceDecision {
    Allow,
    Block,
}

/// A live handle to one DOM element.
#[async_trait]
pub trait ElementHandle: Send + Sync {
    async fn is_visible(&self) -> Result<bool>;

    async fn attribute(&self, name: &str) -> Result<Option<String>>;

    async fn inner_text(&self) -> Result<String>;

    async fn click(&self) -> Result<()>;

    /// Capture the element as an isolated PNG image.
    async fn screenshot(&self) -> Result<Vec<u8>>;
}

/// The single long-lived page that drives the whole traversal.
#[async_trait]
pub trait RenderPage: Send + Sync {
    /// Navigate with a "structure loaded" completion criterion, not full
    /// resource completion.
    async fn goto(&self, url: &str, timeout: Duration) -> Result<()>;

    /// All elements currently matching a CSS selector.
    async fn query(&self, selector: &str) -> Result<Vec<Arc<dyn ElementHandle>>>;

    /// Full HTML of the current document.
    async fn content(&self) -> Result<String>;

    async fn current_url(&self) -> Result<String>;

    async fn title(&self) -> Result<String>;

    async fn screenshot_page(&self, path: &Path, full_page: bool) -> Result<()>;
}
