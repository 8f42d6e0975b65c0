//! Extraction service implementations.

#[cfg(feature = "openai")]
pub mod openai;

pub mod scripted;

use async_trait::async_trait;

use crate::{Result, Turn};

/// Response shape requested from the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    /// Free text.
    Text,
    /// A single JSON object.
    JsonObject,
}

/// Trait for vision-model extraction services.
///
/// This trait abstracts over the concrete model provider so the label
/// engine can run against a hosted API in production and a scripted double
/// in tests.
#[async_trait]
pub trait ExtractionService: Send + Sync {
    /// Short backend name used in logs.
    fn name(&self) -> &str;

    /// Send the conversation and return the raw text of the reply.
    ///
    /// # Errors
    /// `VisionError::RateLimited` when throttled, `VisionError::Transient`
    /// for network or server failures, other variants for non-retryable
    /// failures.
    async fn complete(&self, turns: &[Turn], format: ResponseFormat) -> Result<String>;
}
