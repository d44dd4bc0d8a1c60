//! Image-to-text recognition and field-specific normalization
//!
//! The site renders prices, barcodes and measurements as small raster images.
//! This module preprocesses a captured image, feeds it to the recognizer, and
//! cleans the raw output according to the field it belongs to.

pub mod tesseract;

use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use tracing::{debug, warn};

use crate::error::{HarvestError, Result};

/// Images whose longer dimension is below this are upscaled 2x before
/// recognition; tiny digit stamps recognize poorly at native size.
const SMALL_IMAGE_THRESHOLD: u32 = 64;

/// The external recognition model, reduced to its one capability.
#[async_trait]
pub trait Recognizer: Send + Sync {
    async fn recognize(&self, image: &[u8]) -> Result<String>;
}

/// Normalization class of a canonical field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldClass {
    /// Pack/carton prices: digits, decimal point and currency symbol.
    Currency,
    /// Barcodes: digits only.
    Identifier,
    /// Measurements and counts: digits and decimal point, bare points
    /// repaired.
    Numeric,
    /// Everything else passes through unchanged.
    Text,
}

impl FieldClass {
    pub fn for_key(key: &str) -> Self {
        match key {
            "pack_price" | "carton_price" => Self::Currency,
            "pack_barcode" | "carton_barcode" => Self::Identifier,
            "tar" | "nicotine" | "co" | "length" | "filter_length" | "circumference"
            | "per_pack_count" | "packs_per_carton" => Self::Numeric,
            _ => Self::Text,
        }
    }
}

/// Clean one raw recognizer string for the given field.
pub fn normalize(raw: &str, field_key: &str) -> String {
    // The site uses the full-width currency glyph; fold it first.
    let folded = raw.replace('￥', "¥");

    match FieldClass::for_key(field_key) {
        FieldClass::Currency => folded
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '¥')
            .collect(),
        FieldClass::Identifier => folded.chars().filter(char::is_ascii_digit).collect(),
        FieldClass::Numeric => {
            let mut cleaned: String = folded
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.')
                .collect();
            if cleaned.starts_with('.') {
                cleaned.insert(0, '0');
            }
            if cleaned.ends_with('.') {
                cleaned.pop();
            }
            cleaned
        }
        FieldClass::Text => folded.trim().to_string(),
    }
}

/// Recognizes captured value images and normalizes the output per field.
pub struct OcrNormalizer {
    recognizer: Arc<dyn Recognizer>,
    capture_dir: Option<PathBuf>,
}

impl OcrNormalizer {
    pub fn new(recognizer: Arc<dyn Recognizer>, capture_dir: Option<PathBuf>) -> Self {
        Self {
            recognizer,
            capture_dir,
        }
    }

    /// Point further captures at a different directory (one per brand).
    pub fn set_capture_dir(&mut self, dir: Option<PathBuf>) {
        self.capture_dir = dir;
    }

    /// Recognize one captured value image. Recognizer failure or empty
    /// output yields an empty string, never an error.
    pub async fn recognize(&self, image: &[u8], field_key: &str) -> String {
        self.capture(image, field_key);

        let processed = match preprocess(image) {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!("preprocess failed for {field_key}, using raw bytes: {e}");
                image.to_vec()
            }
        };

        let mut raw = match self.recognizer.recognize(&processed).await {
            Ok(text) => text,
            Err(e) => {
                warn!("recognition failed for {field_key}: {e}");
                String::new()
            }
        };
        if raw.trim().is_empty() {
            // Preprocessing occasionally destroys an already-clean stamp.
            raw = self.recognizer.recognize(image).await.unwrap_or_default();
        }
        if raw.trim().is_empty() {
            return String::new();
        }

        normalize(&raw, field_key)
    }

    /// Best-effort copy of the captured image for offline inspection.
    fn capture(&self, image: &[u8], field_key: &str) {
        let Some(dir) = &self.capture_dir else {
            return;
        };
        let name = format!("{field_key}_{:x}.png", md5::compute(image));
        if let Err(e) = std::fs::create_dir_all(dir)
            .and_then(|()| std::fs::write(dir.join(&name), image))
        {
            debug!("image capture failed for {name}: {e}");
        }
    }
}

/// Grayscale, stretch contrast, upscale small stamps 2x, sharpen lightly.
fn preprocess(bytes: &[u8]) -> Result<Vec<u8>> {
    let decoded = image::load_from_memory(bytes).map_err(HarvestError::recognition)?;
    let mut gray = decoded.grayscale().to_luma8();

    let (mut min, mut max) = (u8::MAX, u8::MIN);
    for pixel in gray.pixels() {
        min = min.min(pixel.0[0]);
        max = max.max(pixel.0[0]);
    }
    if max > min {
        let range = f32::from(max - min);
        for pixel in gray.pixels_mut() {
            let stretched = f32::from(pixel.0[0] - min) / range * 255.0;
            pixel.0[0] = stretched.round() as u8;
        }
    }

    let mut processed = DynamicImage::ImageLuma8(gray);
    let (width, height) = (processed.width(), processed.height());
    if width.max(height) < SMALL_IMAGE_THRESHOLD {
        processed = processed.resize(width * 2, height * 2, FilterType::Nearest);
    }
    let processed = processed.unsharpen(1.0, 2);

    let mut out = Vec::new();
    processed
        .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
        .map_err(HarvestError::recognition)?;
    Ok(out)
}
