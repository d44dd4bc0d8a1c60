//! Listing traversal: walk "next page" links collecting product references

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info};
use url::Url;

use crate::anchors::{canonical_href, collect_anchors, AnchorFilter};
use crate::engine::{ElementHandle, RenderPage};
use crate::models::ProductRef;
use crate::navigator::Navigator;

/// One way of locating the "next page" control. Candidates are tried in
/// order; the first visible match wins.
#[derive(Debug, Clone)]
pub enum NextPageLocator {
    /// A plain CSS selector, e.g. `a[rel="next"]`.
    Selector(String),
    /// An anchor whose trimmed text equals the given string.
    Text(String),
}

fn default_next_locators() -> Vec<NextPageLocator> {
    vec![
        NextPageLocator::Selector("a[rel=\"next\"]".to_string()),
        NextPageLocator::Text("下一页".to_string()),
        NextPageLocator::Text("下一页»".to_string()),
        NextPageLocator::Text(">".to_string()),
    ]
}

/// Walks a multi-page product listing, deduplicating item hrefs across pages.
pub struct Paginator {
    base: Url,
    /// Scope under which item anchors are collected on each page.
    item_scope: String,
    item_filter: AnchorFilter,
    next_locators: Vec<NextPageLocator>,
}

impl Paginator {
    pub fn new(base: Url, item_scope: String, item_filter: AnchorFilter) -> Self {
        Self {
            base,
            item_scope,
            item_filter,
            next_locators: default_next_locators(),
        }
    }

    /// Collect product references across up to `max_pages` listing pages.
    ///
    /// Running out of "next" candidates is the terminal condition, not an
    /// error. Returns the deduplicated union keyed by href.
    pub async fn collect(
        &self,
        page: &dyn RenderPage,
        navigator: &Navigator,
        listing_url: &str,
        max_pages: u32,
    ) -> Vec<ProductRef> {
        let at_listing = page
            .current_url()
            .await
            .map(|current| current == listing_url)
            .unwrap_or(false);
        if !at_listing && !navigator.load(page, listing_url, None).await {
            debug!("listing {listing_url} unreachable, collecting from current state");
        }

        // Insertion-ordered dedup by canonical href; first name seen wins.
        let mut products: Vec<ProductRef> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        for page_num in 1..=max_pages {
            let entries = collect_anchors(
                page,
                &self.item_scope,
                &self.base,
                &self.item_filter,
                "listing",
            )
            .await;

            let mut added = 0;
            for entry in entries {
                if seen.insert(canonical_href(&entry.href)) {
                    products.push(ProductRef {
                        name: entry.name,
                        href: entry.href,
                    });
                    added += 1;
                }
            }
            debug!("listing page {page_num}: {added} new items");

            if page_num == max_pages {
                debug!("page cap reached at page {page_num}");
                break;
            }
            let Some(next) = self.find_next_control(page).await else {
                debug!("no next-page control on page {page_num}, listing complete");
                break;
            };
            if let Err(e) = next.click().await {
                debug!("next-page control not clickable, stopping: {e}");
                break;
            }
            navigator.settle(page).await;
            navigator.pace().await;
        }

        info!("collected {} products from {listing_url}", products.len());
        products
    }

    /// Try each next-page locator in priority order; return the first
    /// visible match.
    async fn find_next_control(&self, page: &dyn RenderPage) -> Option<Arc<dyn ElementHandle>> {
        for locator in &self.next_locators {
            match locator {
                NextPageLocator::Selector(selector) => {
                    let handles = page.query(selector).await.unwrap_or_default();
                    for handle in handles {
                        if handle.is_visible().await.unwrap_or(false) {
                            return Some(handle);
                        }
                    }
                }
                NextPageLocator::Text(text) => {
                    let handles = page.query("a").await.unwrap_or_default();
                    for handle in handles {
                        if !handle.is_visible().await.unwrap_or(false) {
                            continue;
                        }
                        match handle.inner_text().await {
                            Ok(t) if t.trim() == text => return Some(handle),
                            _ => {}
                        }
                    }
                }
            }
        }
        None
    }
}
