//! Directory processing: discovery, orchestration, progress and revalidation.

pub mod discovery;
pub mod orchestrator;
pub mod progress;
pub mod revalidate;

pub use discovery::{Candidate, ImageDiscovery, ProcessingPlan, label_path, promo_hint};
pub use orchestrator::{DirectoryProcessor, ItemRecord, ProcessingSummary, save_label};
pub use progress::{
    ItemOutcome, LogProgress, NoProgress, ProgressEvent, ProgressReporter, estimate_remaining, format_duration,
};
pub use revalidate::{RevalidationSummary, Revalidator, ReviewDecision};
