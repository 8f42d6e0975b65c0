//! Error types for the pricetag-core library.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the pricetag library.
#[derive(Error, Debug)]
pub enum PricetagError {
    /// Label engine error.
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    /// Local OCR error.
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    /// Extraction service error.
    #[error("extraction service error: {0}")]
    Vision(#[from] pricetag_vision::VisionError),

    /// Image processing error.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A root directory required by the operation does not exist.
    #[error("directory {} not found", .0.display())]
    DirectoryNotFound(PathBuf),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl PricetagError {
    /// Whether the error is a transport-level failure worth retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Vision(e) => e.is_retryable(),
            _ => false,
        }
    }
}

/// Errors raised by label engines.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The extractor never produced a label accepted by the validator.
    #[error("schema validation failed: {reason}. Raw: {raw}")]
    SchemaViolation {
        /// First violated rule.
        reason: String,
        /// Raw text of the final extractor reply.
        raw: String,
    },

    /// No engine registered under the requested name.
    #[error("unknown engine '{name}'. Available: {available}")]
    UnknownEngine { name: String, available: String },
}

/// Errors related to local OCR.
#[derive(Error, Debug)]
pub enum OcrError {
    /// The OCR binary could not be started.
    #[error("failed to run {command}: {reason}")]
    Launch { command: String, reason: String },

    /// The OCR binary exited with an error.
    #[error("OCR exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    /// Image preprocessing failed.
    #[error("preprocessing failed: {0}")]
    Preprocessing(String),
}

/// A text rule failed to evaluate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("rule '{rule}' failed: {message}")]
pub struct RuleError {
    pub rule: String,
    pub message: String,
}

impl RuleError {
    pub fn new(rule: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            rule: rule.into(),
            message: message.into(),
        }
    }
}

/// Result type for the pricetag library.
pub type Result<T> = std::result::Result<T, PricetagError>;
