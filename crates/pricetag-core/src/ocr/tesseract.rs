//! Tesseract command-line backend.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use super::TextExtractor;
use super::preprocessing::ImagePreprocessor;
use crate::error::OcrError;
use crate::models::config::OcrConfig;

/// Runs the `tesseract` binary on a preprocessed copy of the image.
pub struct TesseractExtractor {
    command: PathBuf,
    preprocessor: ImagePreprocessor,
}

impl TesseractExtractor {
    pub fn new(command: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
            preprocessor: ImagePreprocessor::default(),
        }
    }

    pub fn from_config(config: &OcrConfig) -> Self {
        Self::new(&config.tesseract_cmd)
    }

    pub fn with_preprocessor(mut self, preprocessor: ImagePreprocessor) -> Self {
        self.preprocessor = preprocessor;
        self
    }

    pub fn command(&self) -> &Path {
        &self.command
    }

    fn args(input: &Path, language: &str) -> Vec<String> {
        vec![
            input.display().to_string(),
            "stdout".to_string(),
            "-l".to_string(),
            language.to_string(),
            "--oem".to_string(),
            "3".to_string(),
            "--psm".to_string(),
            "6".to_string(),
        ]
    }
}

impl Default for TesseractExtractor {
    fn default() -> Self {
        Self::new("tesseract")
    }
}

impl TextExtractor for TesseractExtractor {
    fn extract_text(&self, image: &Path, language: &str) -> Result<String, OcrError> {
        let prepared = self.preprocessor.prepare_file(image)?;
        debug!("Running {} on {}", self.command.display(), image.display());

        let output = Command::new(&self.command)
            .args(Self::args(prepared.path(), language))
            .output()
            .map_err(|e| OcrError::Launch {
                command: self.command.display().to_string(),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(OcrError::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}
