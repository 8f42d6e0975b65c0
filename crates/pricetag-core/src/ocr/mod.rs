//! Local OCR used by the text-rule sorter.

mod preprocessing;
mod tesseract;

pub use preprocessing::ImagePreprocessor;
pub use tesseract::TesseractExtractor;

use std::path::Path;

use crate::error::OcrError;

/// Turns an image into plain text.
pub trait TextExtractor: Send + Sync {
    /// Extract trimmed text from `image` using the given language model.
    fn extract_text(&self, image: &Path, language: &str) -> Result<String, OcrError>;
}
