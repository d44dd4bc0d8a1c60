//! Crawl-state persistence: snapshots, append-only streams, resumability
//!
//! One directory per crawl section holds the brand snapshots; each brand gets
//! a subdirectory with its product list, an append-only detail stream (the
//! resumability log) and final snapshots. Checkpoints are not stored as their
//! own entity; they are reconstructed by reading the stream back.

use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::anchors::canonical_href;
use crate::error::Result;
use crate::models::{CatalogEntry, ProductDetail, ProductRef};

/// Persistence for one crawl section (`yanyue_<section>_output/`).
pub struct SectionStore {
    dir: PathBuf,
    section: String,
}

impl SectionStore {
    pub fn new(output_root: &Path, section: &str) -> Result<Self> {
        let dir = output_root.join(format!("yanyue_{section}_output"));
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            section: section.to_string(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Full JSON snapshot plus fixed-column CSV of the section's brands.
    pub fn write_brand_snapshot(&self, entries: &[CatalogEntry]) -> Result<()> {
        let json_path = self.dir.join(format!("brands_{}.json", self.section));
        let json = serde_json::to_string_pretty(entries)?;
        std::fs::write(&json_path, json)?;

        let csv_path = self.dir.join(format!("brands_{}.csv", self.section));
        let mut writer = csv::Writer::from_path(&csv_path)?;
        writer.write_record(CatalogEntry::CSV_HEADER)?;
        for entry in entries {
            writer.write_record(entry.csv_record())?;
        }
        writer.flush()?;

        info!("wrote {} brands to {}", entries.len(), json_path.display());
        Ok(())
    }

    /// Open (creating if needed) the per-brand directory, keyed by the
    /// brand href's numeric path segment (`/sort_14` -> `sort_14`).
    pub fn brand_store(&self, entry: &CatalogEntry) -> Result<BrandStore> {
        let key = brand_key(&entry.href);
        let dir = self.dir.join(&key);
        std::fs::create_dir_all(&dir)?;
        Ok(BrandStore { dir, key })
    }
}

/// Persistence for one brand's listing and details.
pub struct BrandStore {
    dir: PathBuf,
    key: String,
}

impl BrandStore {
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Directory the anti-scraping value images are captured into.
    pub fn capture_dir(&self) -> PathBuf {
        self.dir.join("genpic")
    }

    pub fn screenshot_path(&self) -> PathBuf {
        self.dir.join("page.png")
    }

    fn products_json(&self) -> PathBuf {
        self.dir.join(format!("{}_products.json", self.key))
    }

    fn details_stream(&self) -> PathBuf {
        self.dir.join(format!("{}_details.ndjson", self.key))
    }

    fn details_stream_csv(&self) -> PathBuf {
        self.dir.join(format!("{}_details_stream.csv", self.key))
    }

    /// Product list from a previous run, when one exists.
    pub fn load_products(&self) -> Option<Vec<ProductRef>> {
        let path = self.products_json();
        let file = File::open(&path).ok()?;
        match serde_json::from_reader(BufReader::new(file)) {
            Ok(products) => {
                debug!("reusing product snapshot {}", path.display());
                Some(products)
            }
            Err(e) => {
                warn!("unreadable product snapshot {}: {e}", path.display());
                None
            }
        }
    }

    pub fn write_products(&self, products: &[ProductRef]) -> Result<()> {
        let json = serde_json::to_string_pretty(products)?;
        std::fs::write(self.products_json(), json)?;

        let csv_path = self.dir.join(format!("{}_products.csv", self.key));
        let mut writer = csv::Writer::from_path(csv_path)?;
        writer.write_record(["name", "href"])?;
        for product in products {
            writer.write_record([&product.name, &product.href])?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Canonical hrefs already present in the detail stream. This is the
    /// crawl checkpoint: membership here makes reprocessing a no-op. Keys
    /// come from `canonical_href`, so query-string and case variants of a
    /// recorded page count as recorded.
    pub fn recorded_hrefs(&self) -> HashSet<String> {
        let path = self.details_stream();
        let Ok(file) = File::open(&path) else {
            return HashSet::new();
        };
        let mut hrefs = HashSet::new();
        for line in BufReader::new(file).lines() {
            let Ok(line) = line else { break };
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<ProductDetail>(&line) {
                Ok(detail) => {
                    hrefs.insert(canonical_href(&detail.href));
                }
                Err(e) => warn!("skipping unparsable stream line in {}: {e}", path.display()),
            }
        }
        hrefs
    }

    /// Read the full detail stream back, preserving append order.
    pub fn read_stream(&self) -> Vec<ProductDetail> {
        let Ok(file) = File::open(self.details_stream()) else {
            return Vec::new();
        };
        BufReader::new(file)
            .lines()
            .map_while(std::result::Result::ok)
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| serde_json::from_str(&line).ok())
            .collect()
    }

    /// Append one detail record to the NDJSON stream and the matching CSV.
    /// A record is only ever appended once per href (callers check
    /// `recorded_hrefs` first); the stream is never rewritten.
    pub fn append_detail(&self, detail: &ProductDetail) -> Result<()> {
        let line = serde_json::to_string(detail)?;
        let mut stream = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.details_stream())?;
        writeln!(stream, "{line}")?;

        let csv_path = self.details_stream_csv();
        let new_file = !csv_path.exists();
        let file = OpenOptions::new().create(true).append(true).open(csv_path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if new_file {
            writer.write_record(ProductDetail::CSV_HEADER)?;
        }
        writer.write_record(detail.csv_record())?;
        writer.flush()?;
        Ok(())
    }

    /// Final full snapshot of the brand's details, written at end of brand
    /// processing. JSON keeps the raw-text backup; the CSV does not.
    pub fn write_detail_snapshot(&self, details: &[ProductDetail]) -> Result<()> {
        let json_path = self.dir.join(format!("{}_details.json", self.key));
        std::fs::write(&json_path, serde_json::to_string_pretty(details)?)?;

        let csv_path = self.dir.join(format!("{}_details.csv", self.key));
        let mut writer = csv::Writer::from_path(csv_path)?;
        writer.write_record(ProductDetail::CSV_HEADER)?;
        for detail in details {
            writer.write_record(detail.csv_record())?;
        }
        writer.flush()?;

        info!(
            "wrote {} detail records to {}",
            details.len(),
            json_path.display()
        );
        Ok(())
    }
}

/// Stable directory key for a brand href: its last path segment carrying a
/// digit, falling back to an md5 of the href.
pub fn brand_key(href: &str) -> String {
    let path = href.split('#').next().unwrap_or(href);
    let path = path.split('?').next().unwrap_or(path);
    let candidate = path
        .trim_end_matches('/')
        .rsplit('/')
        .find(|segment| !segment.is_empty() && segment.chars().any(|c| c.is_ascii_digit()));
    match candidate {
        Some(segment) => segment.to_string(),
        None => format!("{:x}", md5::compute(href)),
    }
}
