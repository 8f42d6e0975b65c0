//! Re-check existing labels against their images.
//!
//! This is a maintenance pass and it deletes files: labels that no longer
//! validate and labels whose promotion resolves to `NONE` are removed.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::discovery::ImageDiscovery;
use super::orchestrator::save_label;
use crate::engine::LabelEngine;
use crate::error::Result;
use crate::models::label::{Label, PromoCode};
use crate::validation::Validator;

/// What happened to one label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewDecision {
    /// Service confirmed the label.
    Unchanged,
    /// Service returned a different valid label; it replaced the file.
    Updated,
    /// Label failed validation on its own and was deleted.
    DeletedInvalid,
    /// Reviewed label has promo `NONE` and was deleted.
    DeletedNone,
    /// Review failed; the label was kept.
    Error,
    /// No image next to the label; left alone.
    Orphan,
}

/// Counts per decision.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RevalidationSummary {
    pub checked: usize,
    pub unchanged: usize,
    pub updated: usize,
    pub deleted_invalid: usize,
    pub deleted_none: usize,
    pub errors: usize,
    pub orphans: usize,
}

impl RevalidationSummary {
    fn record(&mut self, decision: ReviewDecision) {
        if decision != ReviewDecision::Orphan {
            self.checked += 1;
        }
        match decision {
            ReviewDecision::Unchanged => self.unchanged += 1,
            ReviewDecision::Updated => self.updated += 1,
            ReviewDecision::DeletedInvalid => self.deleted_invalid += 1,
            ReviewDecision::DeletedNone => self.deleted_none += 1,
            ReviewDecision::Error => self.errors += 1,
            ReviewDecision::Orphan => self.orphans += 1,
        }
    }
}

/// Runs the review protocol over every label under a root.
pub struct Revalidator {
    engine: Arc<dyn LabelEngine>,
    validator: Validator,
    discovery: ImageDiscovery,
    dry_run: bool,
}

impl Revalidator {
    pub fn new(engine: Arc<dyn LabelEngine>, validator: Validator) -> Self {
        Self {
            engine,
            validator,
            discovery: ImageDiscovery::default(),
            dry_run: false,
        }
    }

    pub fn with_discovery(mut self, discovery: ImageDiscovery) -> Self {
        self.discovery = discovery;
        self
    }

    /// Report decisions without touching any file.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Review every `.json` label under `root`.
    pub async fn revalidate_directory(&self, root: &Path) -> Result<RevalidationSummary> {
        let mut summary = RevalidationSummary::default();

        for label_file in ImageDiscovery::walk(root, "*.json")? {
            let decision = self.revalidate_label(&label_file).await;
            debug!("{}: {:?}", label_file.display(), decision);
            summary.record(decision);
        }

        info!(
            "Revalidation completed: {} checked, {} unchanged, {} updated, {} deleted (invalid), {} deleted (NONE), {} errors, {} orphans",
            summary.checked,
            summary.unchanged,
            summary.updated,
            summary.deleted_invalid,
            summary.deleted_none,
            summary.errors,
            summary.orphans
        );
        Ok(summary)
    }

    /// Review one label file.
    pub async fn revalidate_label(&self, label_file: &Path) -> ReviewDecision {
        let Some(image) = self.discovery.image_for_label(label_file) else {
            return ReviewDecision::Orphan;
        };

        let text = match std::fs::read_to_string(label_file) {
            Ok(text) => text,
            Err(e) => {
                warn!("Cannot read {}: {}", label_file.display(), e);
                return ReviewDecision::Error;
            }
        };

        let existing = match Label::from_json(&text, &self.validator) {
            Ok(label) => label,
            Err(reason) => {
                warn!("Deleting invalid label {}: {}", label_file.display(), reason);
                return self.delete(label_file, ReviewDecision::DeletedInvalid);
            }
        };

        let reviewed = match self.engine.review_label(&image, &existing).await {
            Ok(label) => label,
            Err(e) => {
                warn!("Review failed for {}: {}", label_file.display(), e);
                return ReviewDecision::Error;
            }
        };

        if reviewed.promo() == PromoCode::None {
            info!("Deleting {} (no promotion)", label_file.display());
            return self.delete(label_file, ReviewDecision::DeletedNone);
        }

        if reviewed.as_map() == existing.as_map() {
            return ReviewDecision::Unchanged;
        }

        if !self.dry_run {
            if let Err(e) = save_label(&image, &reviewed) {
                warn!("Cannot update {}: {}", label_file.display(), e);
                return ReviewDecision::Error;
            }
        }
        info!("Updated {}", label_file.display());
        ReviewDecision::Updated
    }

    fn delete(&self, path: &Path, decision: ReviewDecision) -> ReviewDecision {
        if self.dry_run {
            return decision;
        }
        match std::fs::remove_file(path) {
            Ok(()) => decision,
            Err(e) => {
                warn!("Cannot delete {}: {}", path.display(), e);
                ReviewDecision::Error
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{RetryPolicy, VisionLabelEngine};
    use crate::models::label::SchemaVariant;
    use pretty_assertions::assert_eq;
    use pricetag_vision::ScriptedService;
    use std::path::PathBuf;

    const DISC: &str = r#"{"name":"Kawa","price":19.99,"promo":"DISC","promo_args":"30"}"#;

    fn revalidator(service: Arc<ScriptedService>) -> Revalidator {
        let validator = Validator::new(SchemaVariant::Compact);
        let engine = VisionLabelEngine::new(service, validator.clone()).with_retry(RetryPolicy::none());
        Revalidator::new(Arc::new(engine), validator)
    }

    fn write(root: &Path, relative: &str, content: &str) -> PathBuf {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, content).unwrap();
        path
    }

    #[tokio::test]
    async fn test_decisions() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();

        // a: confirmed, b: corrected, c: becomes NONE, d: invalid standalone,
        // e: bad review reply, f: orphan
        for stem in ["a", "b", "c", "d", "e"] {
            write(root, &format!("disc/{stem}.jpg"), "img");
        }
        write(root, "disc/a.json", DISC);
        write(root, "disc/b.json", DISC);
        write(root, "disc/c.json", DISC);
        write(root, "disc/d.json", r#"{"name":"Kawa"}"#);
        write(root, "disc/e.json", DISC);
        write(root, "disc/f.json", DISC);

        let service = Arc::new(
            ScriptedService::new()
                .with_reply(DISC)
                .with_reply(r#"{"name":"Kawa","price":19.99,"promo":"DISC","promo_args":"35"}"#)
                .with_reply(r#"{"name":"Kawa","price":19.99,"promo":"NONE","promo_args":""}"#)
                .with_reply("garbage"),
        );

        let summary = revalidator(service.clone()).revalidate_directory(root).await.unwrap();

        assert_eq!(
            summary,
            RevalidationSummary {
                checked: 5,
                unchanged: 1,
                updated: 1,
                deleted_invalid: 1,
                deleted_none: 1,
                errors: 1,
                orphans: 1,
            }
        );
        assert_eq!(service.call_count(), 4);
        assert!(root.join("disc/a.json").exists());
        assert!(std::fs::read_to_string(root.join("disc/b.json")).unwrap().contains("\"35\""));
        assert!(!root.join("disc/c.json").exists());
        assert!(!root.join("disc/d.json").exists());
        assert!(root.join("disc/e.json").exists());
        assert!(root.join("disc/f.json").exists());
    }

    #[tokio::test]
    async fn test_dry_run_touches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "x/a.jpg", "img");
        write(root, "x/a.json", "[]");
        write(root, "x/b.png", "img");
        write(root, "x/b.json", DISC);

        let service = Arc::new(
            ScriptedService::new().with_reply(r#"{"name":"Kawa","price":null,"promo":"NONE","promo_args":""}"#),
        );
        let summary = revalidator(service)
            .dry_run(true)
            .revalidate_directory(root)
            .await
            .unwrap();

        assert_eq!(summary.deleted_invalid, 1);
        assert_eq!(summary.deleted_none, 1);
        assert!(root.join("x/a.json").exists());
        assert!(root.join("x/b.json").exists());
    }
}
