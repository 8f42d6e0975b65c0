//! Directory orchestration: discover, label, persist, report.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::discovery::{Candidate, ImageDiscovery, ProcessingPlan, label_path};
use super::progress::{ItemOutcome, NoProgress, ProgressEvent, ProgressReporter, estimate_remaining};
use crate::engine::LabelEngine;
use crate::error::Result;
use crate::models::config::PricetagConfig;
use crate::models::label::{Label, SchemaVariant};

/// Record of one processed candidate.
#[derive(Debug, Clone)]
pub struct ItemRecord {
    pub path: PathBuf,
    pub outcome: ItemOutcome,
    pub elapsed: Duration,
}

/// Aggregate result of a run.
#[derive(Debug, Clone)]
pub struct ProcessingSummary {
    pub started_at: DateTime<Utc>,
    pub total: usize,
    pub processed: usize,
    pub failed: usize,
    pub elapsed: Duration,
    pub items: Vec<ItemRecord>,
}

impl ProcessingSummary {
    fn empty() -> Self {
        Self {
            started_at: Utc::now(),
            total: 0,
            processed: 0,
            failed: 0,
            elapsed: Duration::ZERO,
            items: Vec::new(),
        }
    }

    /// Percentage of attempted candidates that produced a label.
    pub fn success_rate(&self) -> f64 {
        let attempted = self.processed + self.failed;
        if attempted == 0 {
            return 0.0;
        }
        self.processed as f64 / attempted as f64 * 100.0
    }

    /// Failed candidates with their error messages.
    pub fn failures(&self) -> impl Iterator<Item = (&Path, &str)> {
        self.items.iter().filter_map(|item| match &item.outcome {
            ItemOutcome::Failed { error } => Some((item.path.as_path(), error.as_str())),
            ItemOutcome::Saved { .. } => None,
        })
    }
}

/// Drives a [`LabelEngine`] over every unlabelled image under a root.
///
/// Candidates are processed one at a time; a failure on one image is
/// logged and never aborts the run.
pub struct DirectoryProcessor {
    engine: Arc<dyn LabelEngine>,
    discovery: ImageDiscovery,
    schema: SchemaVariant,
    pacing: Duration,
    reporter: Arc<dyn ProgressReporter>,
}

impl DirectoryProcessor {
    pub fn new(engine: Arc<dyn LabelEngine>, schema: SchemaVariant) -> Self {
        Self {
            engine,
            discovery: ImageDiscovery::default(),
            schema,
            pacing: Duration::ZERO,
            reporter: Arc::new(NoProgress),
        }
    }

    pub fn from_config(engine: Arc<dyn LabelEngine>, config: &PricetagConfig) -> Self {
        Self::new(engine, config.extraction.schema)
            .with_discovery(ImageDiscovery::from_config(&config.processing))
            .with_pacing(Duration::from_millis(config.processing.pacing_ms))
    }

    pub fn with_discovery(mut self, discovery: ImageDiscovery) -> Self {
        self.discovery = discovery;
        self
    }

    /// Delay after each successful extraction.
    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Ordered candidates under `root`.
    pub fn plan(&self, root: &Path) -> Result<ProcessingPlan> {
        self.discovery.plan(root, self.schema)
    }

    /// Label every unlabelled image under `root`.
    ///
    /// # Errors
    /// Only a missing root is fatal; per-image failures are recorded in the
    /// summary.
    pub async fn process_directory(&self, root: &Path) -> Result<ProcessingSummary> {
        let plan = self.plan(root)?;

        if plan.is_empty() {
            info!("All images under {} already have labels", root.display());
            return Ok(ProcessingSummary::empty());
        }

        info!("Order by folder (ascending): {}", plan.preview());
        Ok(self.process_plan(&plan).await)
    }

    /// Run an already computed plan.
    pub async fn process_plan(&self, plan: &ProcessingPlan) -> ProcessingSummary {
        let mut summary = ProcessingSummary::empty();
        let total = plan.len();
        summary.total = total;
        self.reporter.report(ProgressEvent::Started { total });

        let start = Instant::now();
        for (i, candidate) in plan.candidates().iter().enumerate() {
            let index = i + 1;
            let item_start = Instant::now();
            self.reporter.report(ProgressEvent::Item {
                index,
                total,
                path: candidate.path.clone(),
                promo: candidate.promo_hint,
            });

            let outcome = match self.label_one(candidate).await {
                Ok(label) => {
                    summary.processed += 1;
                    if !self.pacing.is_zero() {
                        tokio::time::sleep(self.pacing).await;
                    }
                    ItemOutcome::Saved { promo: label.promo() }
                }
                Err(e) => {
                    summary.failed += 1;
                    warn!("Failed to process {}: {}", candidate.path.display(), e);
                    ItemOutcome::Failed { error: e.to_string() }
                }
            };

            let elapsed = start.elapsed();
            self.reporter.report(ProgressEvent::Finished {
                index,
                total,
                outcome: outcome.clone(),
                elapsed,
                eta: estimate_remaining(elapsed, index, total),
            });
            summary.items.push(ItemRecord {
                path: candidate.path.clone(),
                outcome,
                elapsed: item_start.elapsed(),
            });
        }

        summary.elapsed = start.elapsed();
        info!(
            "Processing completed: {} processed, {} errors, {:.1}% success",
            summary.processed,
            summary.failed,
            summary.success_rate()
        );
        summary
    }

    async fn label_one(&self, candidate: &Candidate) -> Result<Label> {
        let label = self
            .engine
            .generate_label(&candidate.path, candidate.promo_hint)
            .await?;
        let path = save_label(&candidate.path, &label)?;
        info!("Saved {}", path.display());
        Ok(label)
    }
}

/// Write a label next to its image as indented UTF-8 JSON.
pub fn save_label(image: &Path, label: &Label) -> Result<PathBuf> {
    let path = label_path(image);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, label.to_pretty_json())?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{RetryPolicy, VisionLabelEngine};
    use crate::models::label::PromoCode;
    use crate::validation::Validator;
    use pretty_assertions::assert_eq;
    use pricetag_vision::ScriptedService;
    use serde_json::Value;
    use std::sync::Mutex;

    const WIDGET: &str = r#"{"name":"Widget","price":9.99,"promo":"DISC","promo_args":"20"}"#;

    fn processor(service: Arc<ScriptedService>) -> DirectoryProcessor {
        let engine = VisionLabelEngine::new(service, Validator::new(SchemaVariant::Compact))
            .with_retry(RetryPolicy::none());
        DirectoryProcessor::new(Arc::new(engine), SchemaVariant::Compact)
    }

    fn touch(root: &Path, relative: &str) -> PathBuf {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"img").unwrap();
        path
    }

    #[derive(Default)]
    struct Recorder(Mutex<Vec<ProgressEvent>>);

    impl ProgressReporter for Recorder {
        fn report(&self, event: ProgressEvent) {
            self.0.lock().unwrap().push(event);
        }
    }

    #[tokio::test]
    async fn test_end_to_end_forced_promo_from_folder() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "disc/foo.jpg");
        let service = Arc::new(ScriptedService::new().with_reply(WIDGET));

        let summary = processor(service.clone()).process_directory(dir.path()).await.unwrap();
        assert_eq!(summary.processed, 1);
        assert_eq!(summary.failed, 0);

        let written = std::fs::read_to_string(dir.path().join("disc/foo.json")).unwrap();
        let value: Value = serde_json::from_str(&written).unwrap();
        assert_eq!(value, serde_json::from_str::<Value>(WIDGET).unwrap());
        assert_eq!(value.as_object().unwrap().len(), 4);

        let request = &service.requests()[0];
        assert!(request.turns[1].text().contains("Promo is fixed to DISC"));
    }

    #[tokio::test]
    async fn test_rerun_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "disc/foo.jpg");
        let service = Arc::new(ScriptedService::new().with_reply(WIDGET));
        let processor = processor(service.clone());

        processor.process_directory(dir.path()).await.unwrap();
        let second = processor.process_directory(dir.path()).await.unwrap();

        assert_eq!(second.total, 0);
        assert_eq!(second.processed, 0);
        assert_eq!(service.call_count(), 1);
    }

    #[tokio::test]
    async fn test_failure_does_not_abort_batch() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "misc/a.jpg");
        touch(dir.path(), "misc/b.jpg");
        let service = Arc::new(
            ScriptedService::new()
                .with_reply("nope")
                .with_reply("still nope")
                .with_reply(r#"{"name":"Chleb","price":null,"promo":"NONE","promo_args":""}"#),
        );
        let recorder = Arc::new(Recorder::default());

        let summary = processor(service.clone())
            .with_reporter(recorder.clone())
            .process_directory(dir.path())
            .await
            .unwrap();

        assert_eq!(summary.total, 2);
        assert_eq!(summary.processed, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.success_rate(), 50.0);
        assert!(!dir.path().join("misc/a.json").exists());
        assert!(dir.path().join("misc/b.json").exists());

        let failures: Vec<_> = summary.failures().collect();
        assert_eq!(failures.len(), 1);
        assert!(failures[0].1.contains("Raw: still nope"));

        let events = recorder.0.lock().unwrap();
        assert_eq!(events.len(), 5);
        assert!(matches!(events[0], ProgressEvent::Started { total: 2 }));
        assert!(matches!(
            events[4],
            ProgressEvent::Finished {
                index: 2,
                outcome: ItemOutcome::Saved { promo: PromoCode::None },
                eta: Some(Duration::ZERO),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_zero_candidates_is_success() {
        let dir = tempfile::tempdir().unwrap();
        let service = Arc::new(ScriptedService::new());
        let summary = processor(service.clone()).process_directory(dir.path()).await.unwrap();

        assert_eq!(summary.total, 0);
        assert_eq!(summary.success_rate(), 0.0);
        assert_eq!(service.call_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_root_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let service = Arc::new(ScriptedService::new());
        let result = processor(service).process_directory(&dir.path().join("missing")).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_save_label_keeps_unicode() {
        let dir = tempfile::tempdir().unwrap();
        let image = touch(dir.path(), "tag.jpg");
        let label = Label::from_json(
            r#"{"name":"Żółty ser","price":12.5,"promo":"SUP","promo_args":""}"#,
            &Validator::new(SchemaVariant::Compact),
        )
        .unwrap();

        let path = save_label(&image, &label).unwrap();
        let written = std::fs::read_to_string(path).unwrap();
        assert!(written.contains("Żółty ser"));
        assert!(written.starts_with("{\n  \"name\""));
    }
}
