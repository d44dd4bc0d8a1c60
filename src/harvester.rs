//! Top-level crawl orchestration: targets -> brands -> listings -> details

use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::anchors::{canonical_href, AnchorFilter};
use crate::catalog::{CatalogEnumerator, CatalogSelectors};
use crate::config::{Config, Target, BASE_URL, TARGETS};
use crate::detail::{DetailExtractor, DetailSelectors};
use crate::engine::RenderPage;
use crate::models::CatalogEntry;
use crate::navigator::Navigator;
use crate::ocr::{OcrNormalizer, Recognizer};
use crate::pagination::Paginator;
use crate::store::SectionStore;

/// Brand pages live under this path prefix.
const BRAND_PATH_PREFIX: &str = "/sort_";
/// Product detail pages live under this path prefix.
const PRODUCT_PATH_PREFIX: &str = "/pp_";

/// Link texts never collected as catalog entries.
const CATALOG_EXCLUDES: &[&str] = &["高级搜索"];
/// Link texts never collected as product items.
const LISTING_EXCLUDES: &[&str] = &["更多信息", "点评"];

/// Anchor scope for product items inside a listing page.
const LISTING_ITEM_SCOPE: &str = ".product-list a, .goods-list a, .list a";

/// Drives the whole traversal over one shared page and one recognizer.
pub struct Harvester {
    config: Config,
    page: Arc<dyn RenderPage>,
    navigator: Navigator,
    ocr: OcrNormalizer,
    extractor: DetailExtractor,
    base: Url,
}

impl Harvester {
    pub fn new(
        config: Config,
        page: Arc<dyn RenderPage>,
        recognizer: Arc<dyn Recognizer>,
    ) -> Result<Self> {
        let navigator = Navigator::new(&config);
        let extractor = DetailExtractor::new(DetailSelectors::default())?;
        let base = Url::parse(BASE_URL)?;
        Ok(Self {
            config,
            page,
            navigator,
            ocr: OcrNormalizer::new(recognizer, None),
            extractor,
            base,
        })
    }

    /// Process every configured target in order. Per-target failures are
    /// logged and the run moves on.
    pub async fn run(&mut self) -> Result<()> {
        for target in TARGETS {
            info!("harvesting section {}", target.name);
            if let Err(e) = self.harvest_section(target).await {
                error!("section {} failed: {e}", target.name);
            }
        }
        Ok(())
    }

    pub async fn harvest_section(&mut self, target: &Target) -> Result<()> {
        let store = SectionStore::new(&self.config.output_root, target.name)?;
        let section_url = format!("{BASE_URL}{}", target.path);

        if !self
            .navigator
            .load(self.page.as_ref(), &section_url, None)
            .await
        {
            warn!("section root {section_url} unreachable, continuing with current page state");
        }

        let title = self.page.title().await.unwrap_or_default();
        info!("{} 标题: {title}", target.name);

        let screenshot = store.dir().join(format!("yanyue_{}.png", target.name));
        if let Err(e) = self.page.screenshot_page(&screenshot, true).await {
            warn!("section screenshot failed: {e}");
        }

        let enumerator = CatalogEnumerator::new(
            self.base.clone(),
            CatalogSelectors::default(),
            AnchorFilter::with_prefix(BRAND_PATH_PREFIX).exclude(CATALOG_EXCLUDES),
        );
        let brands = enumerator.enumerate(self.page.as_ref()).await;
        if let Err(e) = store.write_brand_snapshot(&brands) {
            warn!("brand snapshot for {} failed: {e}", target.name);
        }

        let brand_cap = self.config.max_brands.unwrap_or(usize::MAX);
        for brand in brands.iter().take(brand_cap) {
            if let Err(e) = self.harvest_brand(&store, brand).await {
                error!("brand {} ({}) failed: {e}", brand.name, brand.href);
            }
        }
        Ok(())
    }

    pub async fn harvest_brand(&mut self, store: &SectionStore, brand: &CatalogEntry) -> Result<()> {
        info!("harvesting brand {} under {}", brand.name, brand.tag);
        let brand_store = store.brand_store(brand)?;
        self.ocr.set_capture_dir(Some(brand_store.capture_dir()));

        if !self
            .navigator
            .load(self.page.as_ref(), &brand.href, None)
            .await
        {
            warn!("brand page {} unreachable, continuing", brand.href);
        }
        if let Err(e) = self
            .page
            .screenshot_page(&brand_store.screenshot_path(), true)
            .await
        {
            debug!("brand screenshot failed: {e}");
        }

        // The product list is reused across reruns when a snapshot exists.
        let products = match brand_store.load_products() {
            Some(products) => products,
            None => {
                let paginator = Paginator::new(
                    self.base.clone(),
                    LISTING_ITEM_SCOPE.to_string(),
                    AnchorFilter::with_prefix(PRODUCT_PATH_PREFIX).exclude(LISTING_EXCLUDES),
                );
                let products = paginator
                    .collect(
                        self.page.as_ref(),
                        &self.navigator,
                        &brand.href,
                        self.config.max_list_pages,
                    )
                    .await;
                if let Err(e) = brand_store.write_products(&products) {
                    warn!("product snapshot for {} failed: {e}", brand_store.key());
                }
                products
            }
        };

        // Resumability: hrefs already in the stream are skipped without
        // re-navigating. Membership is keyed on the canonical href, so a
        // query-string variant of a recorded page is still a skip.
        let recorded = brand_store.recorded_hrefs();
        let detail_cap = self.config.max_details.unwrap_or(usize::MAX);
        let mut processed = 0;

        for product in &products {
            if processed >= detail_cap {
                debug!("detail cap reached for {}", brand_store.key());
                break;
            }
            if recorded.contains(&canonical_href(&product.href)) {
                debug!("already recorded, skipping {}", product.href);
                continue;
            }

            if !self
                .navigator
                .load(self.page.as_ref(), &product.href, None)
                .await
            {
                warn!("detail page {} unreachable, skipping", product.href);
                continue;
            }

            let mut detail = self.extractor.extract(self.page.as_ref(), &self.ocr).await;
            if detail.href.is_empty() {
                detail.href = product.href.clone();
            }
            if let Err(e) = brand_store.append_detail(&detail) {
                warn!("detail append for {} failed: {e}", detail.href);
            }
            processed += 1;
        }

        // Snapshot the full stream so JSON/CSV snapshots and the append log
        // agree at end of brand.
        let all_details = brand_store.read_stream();
        brand_store.write_detail_snapshot(&all_details)?;

        info!(
            "brand {} complete: {} new, {} total",
            brand_store.key(),
            processed,
            all_details.len()
        );
        Ok(())
    }
}
