//! Structured product-catalog harvester for yanyue.cn
//!
//! The site renders prices, barcodes and measurements as small images to
//! defeat text scraping. This crate reconstructs the catalog (brands ->
//! listings -> details) through a gated browser page, reading image-rendered
//! values back via OCR, with a resumable append-only crawl state.

pub mod anchors;
pub mod catalog;
pub mod config;
pub mod detail;
pub mod engine;
pub mod error;
pub mod harvester;
pub mod models;
pub mod navigator;
pub mod ocr;
pub mod pagination;
pub mod store;
