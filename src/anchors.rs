//! Shared anchor-collection primitive used by catalog enumeration and
//! listing pagination

use tracing::debug;
use url::Url;

use crate::engine::RenderPage;
use crate::models::CatalogEntry;

/// Filtering rules applied to every candidate anchor.
#[derive(Debug, Clone, Default)]
pub struct AnchorFilter {
    /// When set, the resolved absolute href must start with
    /// `<origin><path_prefix>`.
    pub path_prefix: Option<String>,
    /// Link texts containing any of these phrases are dropped.
    pub exclude_phrases: Vec<String>,
}

impl AnchorFilter {
    pub fn with_prefix(prefix: &str) -> Self {
        Self {
            path_prefix: Some(prefix.to_string()),
            ..Self::default()
        }
    }

    pub fn exclude(mut self, phrases: &[&str]) -> Self {
        self.exclude_phrases = phrases.iter().map(|p| (*p).to_string()).collect();
        self
    }
}

/// Canonical identity key for an href: query and fragment stripped, host and
/// path lowercased. Links that differ only in tracking parameters or letter
/// case compare equal under this key.
pub fn canonical_href(href: &str) -> String {
    let Ok(mut url) = Url::parse(href) else {
        return href.trim().to_lowercase();
    };
    url.set_query(None);
    url.set_fragment(None);
    let path = url.path().to_lowercase();
    url.set_path(&path);
    url.to_string()
}

/// Collect the currently visible anchors under `scope_selector`, filter them,
/// resolve their hrefs against `base`, and tag each survivor with `tag`.
///
/// Per-anchor failures are logged and skipped; they never abort the scan.
/// No dedup happens here; callers dedup across the scopes they combine.
pub async fn collect_anchors(
    page: &dyn RenderPage,
    scope_selector: &str,
    base: &Url,
    filter: &AnchorFilter,
    tag: &str,
) -> Vec<CatalogEntry> {
    let handles = match page.query(scope_selector).await {
        Ok(handles) => handles,
        Err(e) => {
            debug!("anchor scan failed for {scope_selector}: {e}");
            return Vec::new();
        }
    };

    let mut entries = Vec::new();
    for handle in handles {
        let visible = match handle.is_visible().await {
            Ok(v) => v,
            Err(e) => {
                debug!("visibility check failed, skipping anchor: {e}");
                continue;
            }
        };
        if !visible {
            continue;
        }

        let href = match handle.attribute("href").await {
            Ok(Some(href)) => href,
            Ok(None) => continue,
            Err(e) => {
                debug!("href read failed, skipping anchor: {e}");
                continue;
            }
        };
        if href.is_empty() || href.starts_with("javascript:") || href.starts_with('#') {
            continue;
        }

        let text = match handle.inner_text().await {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                debug!("text read failed, skipping anchor: {e}");
                continue;
            }
        };
        if text.is_empty() {
            continue;
        }
        if filter.exclude_phrases.iter().any(|p| text.contains(p)) {
            continue;
        }

        let resolved = match base.join(&href) {
            Ok(url) => url.to_string(),
            Err(e) => {
                debug!("unresolvable href {href}: {e}");
                continue;
            }
        };
        if let Some(prefix) = &filter.path_prefix {
            let required = match base.join(prefix) {
                Ok(url) => url.to_string(),
                Err(_) => continue,
            };
            if !resolved.starts_with(&required) {
                continue;
            }
        }

        entries.push(CatalogEntry {
            name: text,
            href: resolved,
            tag: tag.to_string(),
        });
    }
    entries
}

/// Dedup by (name, href); the first occurrence wins, so its tag is the one
/// recorded.
pub fn dedup_entries(entries: Vec<CatalogEntry>) -> Vec<CatalogEntry> {
    let mut seen = std::collections::HashSet::new();
    entries
        .into_iter()
        .filter(|e| seen.insert((e.name.clone(), e.href.clone())))
        .collect()
}
