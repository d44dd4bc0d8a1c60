//! Brand/category enumeration across a section's tab widgets

use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info};
use url::Url;

use crate::anchors::{collect_anchors, dedup_entries, AnchorFilter};
use crate::engine::RenderPage;
use crate::models::CatalogEntry;

/// Settle delay after activating a tab control.
const TAB_SETTLE: Duration = Duration::from_millis(800);

/// CSS selectors for the section's navigation widgets.
#[derive(Debug, Clone)]
pub struct CatalogSelectors {
    /// The primary tab-switch widget, when the section has one.
    pub primary_widget: String,
    /// Tab controls inside the primary widget, in display order.
    pub primary_tabs: String,
    /// The primary widget's "current tab" marker.
    pub primary_current: String,
    /// Generic role-based tab controls, the second-tier fallback.
    pub generic_tabs: String,
    /// Scope under which brand anchors are collected.
    pub brand_anchors: String,
}

impl Default for CatalogSelectors {
    fn default() -> Self {
        Self {
            primary_widget: ".nav-tabs, .tab-hd".to_string(),
            primary_tabs: ".nav-tabs li a, .tab-hd a".to_string(),
            primary_current: ".nav-tabs li.active a, .tab-hd a.on".to_string(),
            generic_tabs: "[role=\"tab\"], .tabs a".to_string(),
            brand_anchors: ".brand-list a, .sort-list a, .main a".to_string(),
        }
    }
}

/// Discovers brand entries under a section root, walking tab widgets when
/// present and deduplicating across them.
pub struct CatalogEnumerator {
    base: Url,
    selectors: CatalogSelectors,
    filter: AnchorFilter,
}

impl CatalogEnumerator {
    pub fn new(base: Url, selectors: CatalogSelectors, filter: AnchorFilter) -> Self {
        Self {
            base,
            selectors,
            filter,
        }
    }

    /// Enumerate the brand entries currently reachable on the page.
    ///
    /// Three-tier strategy, first applicable tier wins: the primary tab
    /// widget, a generic role-based widget, or a single pass under the
    /// label "default".
    pub async fn enumerate(&self, page: &dyn RenderPage) -> Vec<CatalogEntry> {
        let mut entries = Vec::new();

        let primary = page
            .query(&self.selectors.primary_widget)
            .await
            .unwrap_or_default();
        if !primary.is_empty() {
            let initial_label = self.current_tab_label(page).await;
            entries.extend(self.collect(page, &initial_label).await);
            entries.extend(self.walk_tabs(page, &self.selectors.primary_tabs).await);
        } else {
            let generic = page
                .query(&self.selectors.generic_tabs)
                .await
                .unwrap_or_default();
            if !generic.is_empty() {
                entries.extend(self.collect(page, "default").await);
                entries.extend(self.walk_tabs(page, &self.selectors.generic_tabs).await);
            } else {
                entries.extend(self.collect(page, "default").await);
            }
        }

        let deduped = dedup_entries(entries);
        info!("enumerated {} catalog entries", deduped.len());
        deduped
    }

    /// Activate each tab control in order and record the entry set visible
    /// under it. A tab that fails to click is skipped, not fatal.
    async fn walk_tabs(&self, page: &dyn RenderPage, tab_selector: &str) -> Vec<CatalogEntry> {
        let tabs = page.query(tab_selector).await.unwrap_or_default();
        let mut entries = Vec::new();

        for (index, _) in tabs.iter().enumerate() {
            // Re-query before each activation; the click may have replaced
            // the widget's DOM.
            let current = page.query(tab_selector).await.unwrap_or_default();
            let Some(tab) = current.get(index) else {
                break;
            };

            let label = match tab.inner_text().await {
                Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
                _ => format!("tab_{index}"),
            };

            if let Err(e) = tab.click().await {
                debug!("tab {label} not activatable, skipping: {e}");
                continue;
            }
            sleep(TAB_SETTLE).await;

            entries.extend(self.collect(page, &label).await);
        }
        entries
    }

    async fn collect(&self, page: &dyn RenderPage, tag: &str) -> Vec<CatalogEntry> {
        collect_anchors(
            page,
            &self.selectors.brand_anchors,
            &self.base,
            &self.filter,
            tag,
        )
        .await
    }

    async fn current_tab_label(&self, page: &dyn RenderPage) -> String {
        if let Ok(handles) = page.query(&self.selectors.primary_current).await {
            if let Some(handle) = handles.first() {
                if let Ok(text) = handle.inner_text().await {
                    let text = text.trim();
                    if !text.is_empty() {
                        return text.to_string();
                    }
                }
            }
        }
        "default".to_string()
    }
}
