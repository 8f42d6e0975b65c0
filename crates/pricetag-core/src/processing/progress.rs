//! Progress reporting for directory processing.
//!
//! The orchestrator emits [`ProgressEvent`]s; the CLI renders them with a
//! progress bar, tests use [`NoProgress`] or record them.

use std::path::PathBuf;
use std::time::Duration;

use tracing::info;

use crate::models::label::PromoCode;

/// How one candidate ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    /// Label written.
    Saved { promo: PromoCode },
    /// Engine or filesystem failure for this image only.
    Failed { error: String },
}

/// A single progress event.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Work is about to start.
    Started { total: usize },
    /// Candidate `index` (1-based) is being processed.
    Item {
        index: usize,
        total: usize,
        path: PathBuf,
        promo: Option<PromoCode>,
    },
    /// Candidate `index` finished.
    Finished {
        index: usize,
        total: usize,
        outcome: ItemOutcome,
        elapsed: Duration,
        eta: Option<Duration>,
    },
}

/// Receives progress events from the orchestrator.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// Reporter writing one log line per event.
pub struct LogProgress;

impl ProgressReporter for LogProgress {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Started { total } => info!("Processing {} images", total),
            ProgressEvent::Item {
                index,
                total,
                path,
                promo,
            } => {
                let pct = index as f64 / total.max(1) as f64 * 100.0;
                let note = promo.map(|p| format!(" promo={}", p)).unwrap_or_default();
                info!("[{}/{} | {:.1}%] Processing {}{}", index, total, pct, path.display(), note);
            }
            ProgressEvent::Finished { eta: Some(eta), .. } if !eta.is_zero() => {
                info!("Estimated time remaining: {}", format_duration(eta));
            }
            ProgressEvent::Finished { .. } => {}
        }
    }
}

/// Remaining time from the running average cost per item.
pub fn estimate_remaining(elapsed: Duration, done: usize, total: usize) -> Option<Duration> {
    if done == 0 {
        return None;
    }
    let remaining = total.saturating_sub(done);
    Some(elapsed.div_f64(done as f64).mul_f64(remaining as f64))
}

/// Render a duration as `1h 2m 3s`, `2m 3s` or `3s`.
pub fn format_duration(duration: Duration) -> String {
    let seconds = duration.as_secs();
    let (minutes, secs) = (seconds / 60, seconds % 60);
    let (hours, minutes) = (minutes / 60, minutes % 60);

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}
