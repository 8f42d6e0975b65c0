//! Transport-level retry around a whole extraction.

use std::future::Future;
use std::time::Duration;

use pricetag_vision::VisionError;
use tracing::warn;

use crate::error::{PricetagError, Result};
use crate::models::config::RetryConfig;

/// Backoff policy for rate limits and transient service errors.
///
/// Undecodable replies back off like transient errors. Schema violations
/// and local errors are never retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub rate_limit_step: Duration,
    pub rate_limit_ceiling: Duration,
    pub transient_step: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            rate_limit_step: Duration::from_millis(config.rate_limit_step_ms),
            rate_limit_ceiling: Duration::from_millis(config.rate_limit_ceiling_ms),
            transient_step: Duration::from_millis(config.transient_step_ms),
        }
    }
}

impl RetryPolicy {
    /// A policy that gives up after the first failure.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Wait before the next attempt, `None` if the error is not retryable.
    ///
    /// `attempt` is the 1-based number of the attempt that just failed.
    pub fn delay_for(&self, error: &PricetagError, attempt: u32) -> Option<Duration> {
        match error {
            PricetagError::Vision(VisionError::RateLimited { retry_after }) => Some(
                retry_after.unwrap_or_else(|| (self.rate_limit_step * attempt).min(self.rate_limit_ceiling)),
            ),
            PricetagError::Vision(VisionError::Transient(_) | VisionError::Decode(_)) => {
                Some(self.transient_step * attempt)
            }
            _ => None,
        }
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(error) => {
                    let delay = match self.delay_for(&error, attempt) {
                        Some(delay) if attempt < self.max_attempts => delay,
                        _ => return Err(error),
                    };
                    warn!(
                        "Attempt {}/{} failed ({}), retrying in {:?}",
                        attempt, self.max_attempts, error, delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
