//! Product detail-page extraction
//!
//! Combines free-text pattern matching over the detail container with a
//! structured attribute walk; values rendered as anti-scraping images are
//! routed through the OCR normalizer. Every sub-step degrades to an empty
//! field; extraction never raises past this boundary.

use anyhow::Result;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::engine::RenderPage;
use crate::models::ProductDetail;
use crate::ocr::OcrNormalizer;

/// Bilingual attribute labels, checked in order against each row title.
/// More specific labels come before their substrings (filter length before
/// length).
const LABEL_MAP: &[(&[&str], &str)] = &[
    (&["品牌", "brand"], "brand"),
    (&["类型", "type"], "kind"),
    (&["焦油量", "tar"], "tar"),
    (&["烟气烟碱量", "烟碱", "nicotine"], "nicotine"),
    (&["烟气一氧化碳量", "一氧化碳", "carbon monoxide"], "co"),
    (&["过滤嘴长度", "filter length"], "filter_length"),
    (&["烟支长度", "length"], "length"),
    (&["烟支圆周", "circumference"], "circumference"),
    (&["包装形式", "packaging"], "packaging"),
    (&["主色调", "color"], "colors"),
    (&["每盒支数", "per pack"], "per_pack_count"),
    (&["每条盒数", "packs per carton"], "packs_per_carton"),
    (&["单盒参考价", "小盒参考价", "pack price"], "pack_price"),
    (&["条盒参考价", "carton price"], "carton_price"),
    (&["小盒条形码", "pack barcode"], "pack_barcode"),
    (&["条盒条形码", "carton barcode"], "carton_barcode"),
];

/// Free-text fields pulled from the detail container.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct PageStats {
    pub heat: String,
    pub flavor: String,
    pub appearance: String,
    pub value: String,
    pub overall: String,
}

/// CSS selectors for the detail page layout.
#[derive(Debug, Clone)]
pub struct DetailSelectors {
    /// Name sources, tried in order; page title is the final fallback.
    pub headings: Vec<String>,
    /// The detail container whose text feeds the free-text patterns.
    pub container: String,
    /// One structured attribute row (title/content pair).
    pub attr_rows: String,
    pub attr_title: String,
    pub attr_value: String,
}

impl Default for DetailSelectors {
    fn default() -> Self {
        Self {
            headings: vec![
                ".goods-intro h1".to_string(),
                ".product-name h1".to_string(),
                "h1".to_string(),
                ".title h2".to_string(),
            ],
            container: ".product-detail, .goods-detail, .main, body".to_string(),
            attr_rows: "ul.param li, table.param-table tr, .params li".to_string(),
            attr_title: ".title, th, dt".to_string(),
            attr_value: ".content, td, dd".to_string(),
        }
    }
}

/// Parses a detail page into a canonical `ProductDetail`.
pub struct DetailExtractor {
    selectors: DetailSelectors,
    heat_re: Regex,
    flavor_re: Regex,
    appearance_re: Regex,
    value_re: Regex,
    overall_re: Regex,
}

impl DetailExtractor {
    pub fn new(selectors: DetailSelectors) -> Result<Self> {
        Ok(Self {
            selectors,
            heat_re: labeled_count_pattern("人气")?,
            flavor_re: labeled_score_pattern("口味")?,
            appearance_re: labeled_score_pattern("外观")?,
            value_re: labeled_score_pattern("性价比")?,
            overall_re: labeled_score_pattern("综合")?,
        })
    }

    /// Extract a detail record from the page's current state.
    ///
    /// Fields the page does not yield stay empty; failures in one sub-step
    /// never lose the fields already filled.
    pub async fn extract(&self, page: &dyn RenderPage, ocr: &OcrNormalizer) -> ProductDetail {
        let mut detail = ProductDetail {
            href: page.current_url().await.unwrap_or_default(),
            ..ProductDetail::default()
        };

        let html = match page.content().await {
            Ok(html) => html,
            Err(e) => {
                debug!("detail page content unavailable: {e}");
                return detail;
            }
        };

        // Name, free-text stats and the attribute rows come from the parsed
        // document; the document must be dropped before any await.
        let mut image_fields: Vec<(String, String, String)> = Vec::new();
        {
            let document = Html::parse_document(&html);

            detail.name = self.extract_name(&document);

            let text = self.container_text(&document);
            let stats = self.parse_stats(&text);
            detail.heat = stats.heat;
            detail.flavor_score = stats.flavor;
            detail.appearance_score = stats.appearance;
            detail.value_score = stats.value;
            detail.overall_score = stats.overall;
            detail.raw_text = text;

            self.extract_attributes(&document, &mut detail, &mut image_fields);
        }

        if detail.name.is_empty() {
            detail.name = page.title().await.unwrap_or_default();
        }

        // Image-rendered values: capture the live element and recognize it.
        for (key, src, fallback) in image_fields {
            let value = match self.recognize_value_image(page, ocr, &key, &src).await {
                Some(text) if !text.is_empty() => text,
                _ => fallback,
            };
            detail.set_attribute(&key, value);
        }

        detail
    }

    fn extract_name(&self, document: &Html) -> String {
        for selector_str in &self.selectors.headings {
            let Ok(selector) = Selector::parse(selector_str) else {
                continue;
            };
            if let Some(el) = document.select(&selector).next() {
                let text = el.text().collect::<String>().trim().to_string();
                if !text.is_empty() {
                    return text;
                }
            }
        }
        String::new()
    }

    fn container_text(&self, document: &Html) -> String {
        let Ok(selector) = Selector::parse(&self.selectors.container) else {
            return String::new();
        };
        document
            .select(&selector)
            .next()
            .map(|el| el.text().collect::<String>())
            .unwrap_or_default()
    }

    /// Apply the labeled-number patterns; missing matches leave fields empty.
    pub fn parse_stats(&self, text: &str) -> PageStats {
        let capture = |re: &Regex| {
            re.captures(text)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string())
                .unwrap_or_default()
        };
        PageStats {
            heat: capture(&self.heat_re),
            flavor: capture(&self.flavor_re),
            appearance: capture(&self.appearance_re),
            value: capture(&self.value_re),
            overall: capture(&self.overall_re),
        }
    }

    /// Walk the structured attribute rows. Rows whose value is an embedded
    /// image are deferred into `image_fields` for live capture.
    fn extract_attributes(
        &self,
        document: &Html,
        detail: &mut ProductDetail,
        image_fields: &mut Vec<(String, String, String)>,
    ) {
        let (Ok(rows), Ok(title_sel), Ok(value_sel), Ok(img_sel)) = (
            Selector::parse(&self.selectors.attr_rows),
            Selector::parse(&self.selectors.attr_title),
            Selector::parse(&self.selectors.attr_value),
            Selector::parse("img"),
        ) else {
            return;
        };

        for row in document.select(&rows) {
            let Some(title_el) = row.select(&title_sel).next() else {
                continue;
            };
            let label = element_text(&title_el);
            if label.is_empty() {
                continue;
            }
            let key = map_label(&label)
                .map(str::to_string)
                .unwrap_or_else(|| label.clone());

            let Some(value_el) = row.select(&value_sel).next() else {
                continue;
            };
            let cell_text = element_text(&value_el);

            if let Some(img) = value_el.select(&img_sel).next() {
                if let Some(src) = img.value().attr("src") {
                    image_fields.push((key, src.to_string(), cell_text));
                    continue;
                }
            }
            detail.set_attribute(&key, cell_text);
        }
    }

    /// Screenshot the live `<img>` carrying the value and run it through the
    /// recognizer. Any failure yields None; the caller falls back to the
    /// cell's own text.
    async fn recognize_value_image(
        &self,
        page: &dyn RenderPage,
        ocr: &OcrNormalizer,
        key: &str,
        src: &str,
    ) -> Option<String> {
        let selector = format!("img[src=\"{}\"]", src.replace('"', "\\\""));
        let handles = page.query(&selector).await.ok()?;
        let handle = handles.first()?;
        let bytes = match handle.screenshot().await {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!("value image capture failed for {key}: {e}");
                return None;
            }
        };
        Some(ocr.recognize(&bytes, key).await)
    }
}

fn element_text(el: &ElementRef) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// Map an on-page label to its canonical field key.
fn map_label(label: &str) -> Option<&'static str> {
    let lowered = label.to_lowercase();
    for (needles, key) in LABEL_MAP {
        if needles.iter().any(|n| lowered.contains(n)) {
            return Some(key);
        }
    }
    None
}

/// `<label>: <integer>` with optional full-width colon and whitespace inside
/// the label.
fn labeled_count_pattern(label: &str) -> Result<Regex> {
    Ok(Regex::new(&format!(
        r"{}\s*[:：]?\s*(\d+)",
        spaced_label(label)
    ))?)
}

/// `<label>: <0-10 with one decimal>分`.
fn labeled_score_pattern(label: &str) -> Result<Regex> {
    Ok(Regex::new(&format!(
        r"{}\s*[:：]?\s*(\d{{1,2}}(?:\.\d)?)\s*分",
        spaced_label(label)
    ))?)
}

/// Tolerate embedded whitespace inside multi-character labels.
fn spaced_label(label: &str) -> String {
    label
        .chars()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(r"\s*")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> DetailExtractor {
        DetailExtractor::new(DetailSelectors::default()).unwrap()
    }

    #[test]
    fn stats_parse_with_halfwidth_colon() {
        let stats = extractor().parse_stats("人气:10086 口味:8.4分 外观:7.9分 性价比:6.2分 综合:7.8分");
        assert_eq!(stats.heat, "10086");
        assert_eq!(stats.flavor, "8.4");
        assert_eq!(stats.overall, "7.8");
    }

    #[test]
    fn stats_parse_with_fullwidth_colon_and_spacing() {
        let stats = extractor().parse_stats("人 气： 3021\n性 价 比： 9.1 分");
        assert_eq!(stats.heat, "3021");
        assert_eq!(stats.value, "9.1");
    }

    #[test]
    fn missing_stats_stay_empty() {
        let stats = extractor().parse_stats("没有任何评分信息");
        assert_eq!(stats, PageStats::default());
    }

    #[test]
    fn label_mapping_prefers_specific_over_substring() {
        assert_eq!(map_label("过滤嘴长度"), Some("filter_length"));
        assert_eq!(map_label("烟支长度"), Some("length"));
        assert_eq!(map_label("小盒条形码"), Some("pack_barcode"));
        assert_eq!(map_label("上市时间"), None);
    }
}
