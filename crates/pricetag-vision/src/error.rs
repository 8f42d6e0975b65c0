//! Error types for the extraction service layer.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while talking to an extraction service.
#[derive(Error, Debug)]
pub enum VisionError {
    /// The service throttled the request.
    #[error("rate limited{}", format_hint(.retry_after))]
    RateLimited {
        /// Wait advertised by the service, if any.
        retry_after: Option<Duration>,
    },

    /// Network failure or server-side error worth retrying.
    #[error("transient service error: {0}")]
    Transient(String),

    /// The service rejected the request.
    #[error("service error {status}: {message}")]
    Api { status: u16, message: String },

    /// No API key available for the backend.
    #[error("missing credentials: {0}")]
    MissingCredentials(String),

    /// The service answered with a body we could not interpret.
    #[error("failed to decode service response: {0}")]
    Decode(String),

    /// I/O error while reading the image.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl VisionError {
    /// Whether the failure is worth another attempt.
    ///
    /// Undecodable replies are treated like transient failures.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Transient(_) | Self::Decode(_))
    }
}

fn format_hint(retry_after: &Option<Duration>) -> String {
    match retry_after {
        Some(wait) => format!(" (retry after {:.1}s)", wait.as_secs_f64()),
        None => String::new(),
    }
}
