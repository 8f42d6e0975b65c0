//! Extraction service abstraction layer for pricetag.
//!
//! This crate provides a unified interface for sending a price-tag image to a
//! vision-capable language model and getting a JSON document back:
//! - `OpenAiService` for any OpenAI-compatible chat completions endpoint
//! - `ScriptedService` as a deterministic double for tests

mod backend;
mod error;
mod message;

pub use backend::{ExtractionService, ResponseFormat};
pub use backend::scripted::{RecordedRequest, ScriptedService};
pub use error::VisionError;
pub use message::{ContentPart, ImagePayload, Role, Turn};

#[cfg(feature = "openai")]
pub use backend::openai::{OpenAiService, OpenAiSettings};

/// Result type for extraction service operations.
pub type Result<T> = std::result::Result<T, VisionError>;
