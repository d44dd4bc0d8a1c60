//! Data models for catalog entries, product references and product details

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A brand/category link discovered while enumerating a catalog section.
///
/// Identity is (name, href) within one section; entries are never mutated
/// after creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CatalogEntry {
    pub name: String,
    /// Absolute URL, resolved against the site origin.
    pub href: String,
    /// Label of the tab or section the entry was first seen under.
    pub tag: String,
}

impl CatalogEntry {
    pub const CSV_HEADER: [&'static str; 3] = ["name", "href", "tab"];

    pub fn csv_record(&self) -> [&str; 3] {
        [&self.name, &self.href, &self.tag]
    }
}

/// A link to one product detail page, collected from a listing.
/// Identity is the href alone; names repeat across brands.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProductRef {
    pub name: String,
    pub href: String,
}

/// A fully extracted product detail record.
///
/// Written once per href; reruns over the same href are no-ops. Every field
/// other than `href` may legitimately be empty when the page did not yield it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductDetail {
    pub name: String,
    pub href: String,

    /// Popularity counter, kept as text.
    pub heat: String,
    /// 0-10 scores with one decimal, kept as text.
    pub flavor_score: String,
    pub appearance_score: String,
    pub value_score: String,
    pub overall_score: String,

    // Canonical attribute fields. OCR output wins when the on-page value was
    // rendered as an image; otherwise the cell's own text is used.
    pub brand: String,
    pub kind: String,
    pub tar: String,
    pub nicotine: String,
    pub co: String,
    pub length: String,
    pub filter_length: String,
    pub circumference: String,
    pub packaging: String,
    pub colors: String,
    pub per_pack_count: String,
    pub packs_per_carton: String,
    pub pack_price: String,
    pub carton_price: String,
    pub pack_barcode: String,
    pub carton_barcode: String,

    /// Attributes whose on-page label mapped to no canonical key, keyed by
    /// the raw label text.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,

    /// Verbatim full-page text backup. JSON-only; excluded from CSV output.
    #[serde(default)]
    pub raw_text: String,

    #[serde(default = "Utc::now")]
    pub discovered_at: DateTime<Utc>,
}

impl Default for ProductDetail {
    fn default() -> Self {
        Self {
            name: String::new(),
            href: String::new(),
            heat: String::new(),
            flavor_score: String::new(),
            appearance_score: String::new(),
            value_score: String::new(),
            overall_score: String::new(),
            brand: String::new(),
            kind: String::new(),
            tar: String::new(),
            nicotine: String::new(),
            co: String::new(),
            length: String::new(),
            filter_length: String::new(),
            circumference: String::new(),
            packaging: String::new(),
            colors: String::new(),
            per_pack_count: String::new(),
            packs_per_carton: String::new(),
            pack_price: String::new(),
            carton_price: String::new(),
            pack_barcode: String::new(),
            carton_barcode: String::new(),
            extra: BTreeMap::new(),
            raw_text: String::new(),
            discovered_at: Utc::now(),
        }
    }
}

impl ProductDetail {
    /// Fixed CSV column order. `extra` and `raw_text` are JSON-only.
    pub const CSV_HEADER: [&'static str; 23] = [
        "name",
        "href",
        "heat",
        "flavor_score",
        "appearance_score",
        "value_score",
        "overall_score",
        "brand",
        "kind",
        "tar",
        "nicotine",
        "co",
        "length",
        "filter_length",
        "circumference",
        "packaging",
        "colors",
        "per_pack_count",
        "packs_per_carton",
        "pack_price",
        "carton_price",
        "pack_barcode",
        "carton_barcode",
    ];

    pub fn csv_record(&self) -> [&str; 23] {
        [
            &self.name,
            &self.href,
            &self.heat,
            &self.flavor_score,
            &self.appearance_score,
            &self.value_score,
            &self.overall_score,
            &self.brand,
            &self.kind,
            &self.tar,
            &self.nicotine,
            &self.co,
            &self.length,
            &self.filter_length,
            &self.circumference,
            &self.packaging,
            &self.colors,
            &self.per_pack_count,
            &self.packs_per_carton,
            &self.pack_price,
            &self.carton_price,
            &self.pack_barcode,
            &self.carton_barcode,
        ]
    }

    /// Store an attribute under its canonical field, or in the `extra` side
    /// map when the label is unknown.
    pub fn set_attribute(&mut self, key: &str, value: String) {
        match key {
            "brand" => self.brand = value,
            "kind" => self.kind = value,
            "tar" => self.tar = value,
            "nicotine" => self.nicotine = value,
            "co" => self.co = value,
            "length" => self.length = value,
            "filter_length" => self.filter_length = value,
            "circumference" => self.circumference = value,
            "packaging" => self.packaging = value,
            "colors" => self.colors = value,
            "per_pack_count" => self.per_pack_count = value,
            "packs_per_carton" => self.packs_per_carton = value,
            "pack_price" => self.pack_price = value,
            "carton_price" => self.carton_price = value,
            "pack_barcode" => self.pack_barcode = value,
            "carton_barcode" => self.carton_barcode = value,
            other => {
                self.extra.insert(other.to_string(), value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_record_matches_header_width() {
        let detail = ProductDetail::default();
        assert_eq!(detail.csv_record().len(), ProductDetail::CSV_HEADER.len());
    }

    #[test]
    fn csv_excludes_raw_text() {
        assert!(!ProductDetail::CSV_HEADER.contains(&"raw_text"));
        assert!(!ProductDetail::CSV_HEADER.contains(&"extra"));
    }

    #[test]
    fn unknown_attribute_goes_to_extra() {
        let mut detail = ProductDetail::default();
        detail.set_attribute("pack_price", "¥25.00".to_string());
        detail.set_attribute("上市时间", "2019".to_string());
        assert_eq!(detail.pack_price, "¥25.00");
        assert_eq!(detail.extra.get("上市时间").map(String::as_str), Some("2019"));
    }
}
