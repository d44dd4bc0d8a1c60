//! Recognizer backend shelling out to the Tesseract binary

use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::Recognizer;
use crate::error::{HarvestError, Result};

/// Runs `tesseract stdin stdout` per image. The value images are single
/// short lines, hence page segmentation mode 7.
pub struct TesseractRecognizer {
    languages: String,
}

impl TesseractRecognizer {
    pub fn new() -> Self {
        Self {
            languages: "chi_sim+eng".to_string(),
        }
    }

    pub fn with_languages(languages: &str) -> Self {
        Self {
            languages: languages.to_string(),
        }
    }
}

impl Default for TesseractRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Recognizer for TesseractRecognizer {
    async fn recognize(&self, image: &[u8]) -> Result<String> {
        let mut child = Command::new("tesseract")
            .args(["stdin", "stdout", "-l", &self.languages, "--psm", "7"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| HarvestError::Recognition(format!("tesseract unavailable: {e}")))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(image)
                .await
                .map_err(HarvestError::recognition)?;
            // Closing stdin signals end of input.
            drop(stdin);
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(HarvestError::recognition)?;
        if !output.status.success() {
            return Err(HarvestError::Recognition(format!(
                "tesseract exited with {}",
                output.status
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}
