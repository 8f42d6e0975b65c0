//! OCR-driven sorting of images into promo-code buckets.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::rules::TextRulesEngine;
use crate::dataset::{TransferMode, transfer_file};
use crate::error::{OcrError, PricetagError, Result};
use crate::models::config::{OcrConfig, ProcessingConfig};
use crate::ocr::TextExtractor;
use crate::processing::ImageDiscovery;

/// Cache directory for extracted text inside the output root.
pub const TEXT_DUMP_DIR: &str = "_ocr_text";

/// Counts from one sorting run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortSummary {
    /// Images that went through OCR and classification.
    pub processed: usize,
    /// Images skipped because an output bucket already holds the name.
    pub pre_skipped: usize,
    pub copied: usize,
    pub moved: usize,
    /// Destination already existed.
    pub skipped: usize,
    /// Images no rule matched.
    pub unknown: usize,
    /// OCR or transfer failures.
    pub failed: usize,
}

/// Sorts the top-level images of a directory by OCR text.
pub struct FileSorter {
    extractor: Arc<dyn TextExtractor>,
    rules: TextRulesEngine,
    discovery: ImageDiscovery,
    unknown_dir: String,
    language: String,
    dump_text: bool,
    mode: TransferMode,
}

impl FileSorter {
    pub fn new(extractor: Arc<dyn TextExtractor>) -> Self {
        Self {
            extractor,
            rules: TextRulesEngine::default(),
            discovery: ImageDiscovery::default(),
            unknown_dir: "UNKNOWN".to_string(),
            language: "pol".to_string(),
            dump_text: true,
            mode: TransferMode::Copy,
        }
    }

    pub fn from_config(extractor: Arc<dyn TextExtractor>, processing: &ProcessingConfig, ocr: &OcrConfig) -> Self {
        Self::new(extractor)
            .with_discovery(ImageDiscovery::from_config(processing))
            .with_unknown_dir(processing.unknown_dir.trim())
            .with_language(&ocr.language)
            .with_dump_text(ocr.dump_text)
    }

    pub fn with_rules(mut self, rules: TextRulesEngine) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_discovery(mut self, discovery: ImageDiscovery) -> Self {
        self.discovery = discovery;
        self
    }

    pub fn with_unknown_dir(mut self, unknown_dir: impl Into<String>) -> Self {
        self.unknown_dir = unknown_dir.into();
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Cache OCR text under `<output>/_ocr_text`.
    pub fn with_dump_text(mut self, dump_text: bool) -> Self {
        self.dump_text = dump_text;
        self
    }

    pub fn with_mode(mut self, mode: TransferMode) -> Self {
        self.mode = mode;
        self
    }

    /// Classify every top-level image of `input` into `<output>/<PROMO>/`.
    ///
    /// # Errors
    /// A missing input directory or an unusable output root is fatal;
    /// per-image failures are counted.
    pub fn sort_files(&self, input: &Path, output: &Path) -> Result<SortSummary> {
        if !input.is_dir() {
            return Err(PricetagError::DirectoryNotFound(input.to_path_buf()));
        }

        std::fs::create_dir_all(output)?;
        let dump_dir = if self.dump_text {
            let dir = output.join(TEXT_DUMP_DIR);
            std::fs::create_dir_all(&dir)?;
            Some(dir)
        } else {
            None
        };

        let images = self.top_level_images(input)?;
        let mut summary = SortSummary::default();
        if images.is_empty() {
            info!("No images found to sort in {}", input.display());
            return Ok(summary);
        }

        let existing = existing_outputs(output)?;
        let found = images.len();
        let pending: Vec<_> = images
            .into_iter()
            .filter(|image| !image.file_name().is_some_and(|name| existing.contains(&*name.to_string_lossy())))
            .collect();
        summary.pre_skipped = found - pending.len();
        if summary.pre_skipped > 0 {
            info!(
                "Pre-skip: {} already present in output. Will process {}.",
                summary.pre_skipped,
                pending.len()
            );
        }

        let total = pending.len();
        for (i, image) in pending.iter().enumerate() {
            let index = i + 1;
            let prefix = format!("[{}/{} | left {}]", index, total, total - index);

            let text = match self.ocr_text(image, dump_dir.as_deref()) {
                Ok(text) => text,
                Err(e) => {
                    warn!("{} OCR failed for {}: {}", prefix, image.display(), e);
                    summary.failed += 1;
                    continue;
                }
            };
            summary.processed += 1;

            let bucket = match self.rules.classify(&text) {
                Some(promo) => promo.as_str().to_string(),
                None => {
                    warn!("{} Could not classify: {}", prefix, image.display());
                    summary.unknown += 1;
                    self.unknown_dir.clone()
                }
            };

            self.place(image, &output.join(&bucket), &prefix, &mut summary);
        }

        info!(
            "Done. Processed {} images (pre-skipped {}). {} {}. Unknown: {}. Output: {}",
            summary.processed,
            summary.pre_skipped,
            self.mode.verb(),
            summary.copied + summary.moved,
            summary.unknown,
            output.display()
        );
        Ok(summary)
    }

    fn top_level_images(&self, input: &Path) -> Result<Vec<PathBuf>> {
        let mut images = Vec::new();
        for entry in std::fs::read_dir(input)? {
            let path = entry?.path();
            if path.is_file() && self.discovery.is_image(&path) {
                images.push(path);
            }
        }
        images.sort();
        Ok(images)
    }

    /// OCR text for one image, reusing the cached dump when present.
    fn ocr_text(&self, image: &Path, dump_dir: Option<&Path>) -> std::result::Result<String, OcrError> {
        let Some(dump_dir) = dump_dir else {
            return self.extractor.extract_text(image, &self.language);
        };

        let stem = image.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
        let dump_file = dump_dir.join(format!("{}.txt", stem));
        if let Ok(text) = std::fs::read_to_string(&dump_file) {
            debug!("Using cached OCR text {}", dump_file.display());
            return Ok(text);
        }

        let text = self.extractor.extract_text(image, &self.language)?;
        if let Err(e) = std::fs::write(&dump_file, &text) {
            warn!("Cannot cache OCR text {}: {}", dump_file.display(), e);
        }
        Ok(text)
    }

    fn place(&self, image: &Path, bucket: &Path, prefix: &str, summary: &mut SortSummary) {
        let Some(name) = image.file_name() else {
            return;
        };
        let destination = bucket.join(name);
        if destination.exists() {
            info!("{} Exists: {}", prefix, destination.display());
            summary.skipped += 1;
            return;
        }

        match transfer_file(image, &destination, self.mode) {
            Ok(()) => {
                match self.mode {
                    TransferMode::Copy => summary.copied += 1,
                    TransferMode::Move => summary.moved += 1,
                }
                info!("{} {} -> {}", prefix, self.mode.verb(), destination.display());
            }
            Err(e) => {
                warn!("{} Error transferring {}: {}", prefix, image.display(), e);
                summary.failed += 1;
            }
        }
    }
}

/// File names already present in any bucket of the output root.
fn existing_outputs(output: &Path) -> Result<HashSet<String>> {
    let mut names = HashSet::new();
    for bucket in std::fs::read_dir(output)? {
        let bucket = bucket?.path();
        if !bucket.is_dir() || bucket.file_name().is_some_and(|n| n == TEXT_DUMP_DIR) {
            continue;
        }
        for file in std::fs::read_dir(&bucket)? {
            let file = file?.path();
            if file.is_file() {
                if let Some(name) = file.file_name() {
                    names.insert(name.to_string_lossy().into_owned());
                }
            }
        }
    }
    Ok(names)
}
