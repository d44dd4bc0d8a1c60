//! Error taxonomy for the harvesting pipeline
//!
//! Each variant maps to a distinct containment policy: navigation failures are
//! retried with backoff, element failures skip the single element, recognition
//! failures blank the single field, persistence failures are logged and the
//! crawl continues.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HarvestError {
    /// Timeout or transport failure reaching a URL.
    #[error("navigation failed: {0}")]
    Navigation(String),

    /// Selector stale, detached, or momentarily not actionable.
    #[error("element access failed: {0}")]
    Element(String),

    /// Recognizer absent, empty output, or image decode failure.
    #[error("recognition failed: {0}")]
    Recognition(String),

    /// Snapshot or append-log write failure.
    #[error("persistence failed: {0}")]
    Persistence(String),
}

impl HarvestError {
    pub fn navigation(err: impl ToString) -> Self {
        Self::Navigation(err.to_string())
    }

    pub fn element(err: impl ToString) -> Self {
        Self::Element(err.to_string())
    }

    pub fn recognition(err: impl ToString) -> Self {
        Self::Recognition(err.to_string())
    }

    pub fn persistence(err: impl ToString) -> Self {
        Self::Persistence(err.to_string())
    }
}

impl From<std::io::Error> for HarvestError {
    fn from(err: std::io::Error) -> Self {
        Self::Persistence(err.to_string())
    }
}

impl From<csv::Error> for HarvestError {
    fn from(err: csv::Error) -> Self {
        Self::Persistence(err.to_string())
    }
}

impl From<serde_json::Error> for HarvestError {
    fn from(err: serde_json::Error) -> Self {
        Self::Persistence(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, HarvestError>;
