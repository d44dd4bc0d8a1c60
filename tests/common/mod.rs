//! In-memory render-page fake driving the pipeline tests
#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use yanyue_harvester::engine::{ElementHandle, RenderPage};
use yanyue_harvester::error::Result;
use yanyue_harvester::ocr::Recognizer;

pub type ClickFn = Arc<dyn Fn() + Send + Sync>;

/// A scripted DOM element.
pub struct FakeElement {
    text: String,
    attrs: HashMap<String, String>,
    visible: bool,
    on_click: Option<ClickFn>,
    image: Vec<u8>,
}

impl FakeElement {
    pub fn anchor(text: &str, href: &str) -> Self {
        let mut attrs = HashMap::new();
        attrs.insert("href".to_string(), href.to_string());
        Self {
            text: text.to_string(),
            attrs,
            visible: true,
            on_click: None,
            image: Vec::new(),
        }
    }

    pub fn labeled(text: &str) -> Self {
        Self {
            text: text.to_string(),
            attrs: HashMap::new(),
            visible: true,
            on_click: None,
            image: Vec::new(),
        }
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn on_click(mut self, action: ClickFn) -> Self {
        self.on_click = Some(action);
        self
    }

    pub fn with_image(mut self, bytes: &[u8]) -> Self {
        self.image = bytes.to_vec();
        self
    }
}

#[async_trait]
impl ElementHandle for FakeElement {
    async fn is_visible(&self) -> Result<bool> {
        Ok(self.visible)
    }

    async fn attribute(&self, name: &str) -> Result<Option<String>> {
        Ok(self.attrs.get(name).cloned())
    }

    async fn inner_text(&self) -> Result<String> {
        Ok(self.text.clone())
    }

    async fn click(&self) -> Result<()> {
        if let Some(action) = &self.on_click {
            action();
        }
        Ok(())
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        Ok(self.image.clone())
    }
}

/// One addressable page state: what the fake serves while "at" a URL.
#[derive(Default, Clone)]
pub struct PageState {
    pub title: String,
    pub html: String,
    pub elements: HashMap<String, Vec<Arc<FakeElement>>>,
}

impl PageState {
    pub fn with_elements(mut self, selector: &str, elements: Vec<FakeElement>) -> Self {
        self.elements
            .insert(selector.to_string(), elements.into_iter().map(Arc::new).collect());
        self
    }

    pub fn with_html(mut self, html: &str) -> Self {
        self.html = html.to_string();
        self
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }
}

struct Inner {
    states: HashMap<String, PageState>,
    current: String,
    goto_log: Vec<String>,
    failing: Vec<String>,
}

/// Scripted `RenderPage`: a set of URL-keyed states plus a navigation log.
/// Navigating to an unknown URL "succeeds" but leaves the page where it was,
/// mirroring a render engine left in a best-effort state.
#[derive(Clone)]
pub struct FakePage {
    inner: Arc<Mutex<Inner>>,
}

impl FakePage {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                states: HashMap::new(),
                current: String::new(),
                goto_log: Vec::new(),
                failing: Vec::new(),
            })),
        }
    }

    pub fn add_state(&self, url: &str, state: PageState) {
        self.inner
            .lock()
            .unwrap()
            .states
            .insert(url.to_string(), state);
    }

    pub fn set_current(&self, url: &str) {
        self.inner.lock().unwrap().current = url.to_string();
    }

    pub fn goto_log(&self) -> Vec<String> {
        self.inner.lock().unwrap().goto_log.clone()
    }

    /// Make every navigation to `url` fail with a navigation error.
    pub fn fail_goto(&self, url: &str) {
        self.inner.lock().unwrap().failing.push(url.to_string());
    }

    /// A click action that moves the fake to `url`.
    pub fn click_to(&self, url: &str) -> ClickFn {
        let inner = Arc::clone(&self.inner);
        let url = url.to_string();
        Arc::new(move || {
            inner.lock().unwrap().current = url.clone();
        })
    }

    /// A click action that replaces one selector's element set on `url`.
    pub fn click_swaps(&self, url: &str, selector: &str, elements: Vec<FakeElement>) -> ClickFn {
        let inner = Arc::clone(&self.inner);
        let url = url.to_string();
        let selector = selector.to_string();
        let elements: Vec<Arc<FakeElement>> = elements.into_iter().map(Arc::new).collect();
        Arc::new(move || {
            if let Some(state) = inner.lock().unwrap().states.get_mut(&url) {
                state.elements.insert(selector.clone(), elements.clone());
            }
        })
    }
}

#[async_trait]
impl RenderPage for FakePage {
    async fn goto(&self, url: &str, _timeout: Duration) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.goto_log.push(url.to_string());
        if inner.failing.iter().any(|u| u == url) {
            return Err(yanyue_harvester::error::HarvestError::Navigation(format!(
                "scripted failure for {url}"
            )));
        }
        if inner.states.contains_key(url) {
            inner.current = url.to_string();
        }
        Ok(())
    }

    async fn query(&self, selector: &str) -> Result<Vec<Arc<dyn ElementHandle>>> {
        let inner = self.inner.lock().unwrap();
        let elements = inner
            .states
            .get(&inner.current)
            .and_then(|state| state.elements.get(selector))
            .cloned()
            .unwrap_or_default();
        Ok(elements
            .into_iter()
            .map(|el| el as Arc<dyn ElementHandle>)
            .collect())
    }

    async fn content(&self) -> Result<String> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .states
            .get(&inner.current)
            .map(|state| state.html.clone())
            .unwrap_or_default())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.inner.lock().unwrap().current.clone())
    }

    async fn title(&self) -> Result<String> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .states
            .get(&inner.current)
            .map(|state| state.title.clone())
            .unwrap_or_default())
    }

    async fn screenshot_page(&self, path: &Path, _full_page: bool) -> Result<()> {
        std::fs::write(path, b"\x89PNG")?;
        Ok(())
    }
}

/// Recognizer returning a fixed string for every image.
pub struct FakeRecognizer {
    pub response: String,
}

#[async_trait]
impl Recognizer for FakeRecognizer {
    async fn recognize(&self, _image: &[u8]) -> Result<String> {
        Ok(self.response.clone())
    }
}

/// Recognizer keyed by exact image bytes; unknown images yield nothing.
pub struct MappingRecognizer {
    pub map: Vec<(Vec<u8>, String)>,
}

#[async_trait]
impl Recognizer for MappingRecognizer {
    async fn recognize(&self, image: &[u8]) -> Result<String> {
        Ok(self
            .map
            .iter()
            .find(|(bytes, _)| bytes == image)
            .map(|(_, text)| text.clone())
            .unwrap_or_default())
    }
}
