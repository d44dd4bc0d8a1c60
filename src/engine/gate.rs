//! Outbound request gating
//!
//! Non-text resources are blocked to cut bandwidth, with two exceptions:
//! stylesheets always load (the loading overlay is layout-dependent), and
//! images load only when they are the site's anti-scraping value images,
//! which the pipeline has to read back via OCR.

use super::{ResourceDecision, ResourceKind};

/// URL marker of the anti-scraping value images.
const ANTI_SCRAPING_IMAGE_MARKER: &str = "genpic";

/// Decide whether the engine may fetch one outbound request. Pure function
/// of (kind, url); no state is kept across requests.
pub fn decide(kind: ResourceKind, url: &str) -> ResourceDecision {
    match kind {
        ResourceKind::Stylesheet => ResourceDecision::Allow,
        ResourceKind::Image => {
            if url.contains(ANTI_SCRAPING_IMAGE_MARKER) {
                ResourceDecision::Allow
            } else {
                ResourceDecision::Block
            }
        }
        ResourceKind::Media | ResourceKind::Font => ResourceDecision::Block,
        _ => ResourceDecision::Allow,
    }
}
