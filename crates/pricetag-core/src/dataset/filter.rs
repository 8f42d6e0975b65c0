//! Keep only labelled images: copy or move image/label pairs.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::Result;
use crate::processing::{ImageDiscovery, label_path};

/// Whether files are duplicated or relocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransferMode {
    #[default]
    Copy,
    Move,
}

impl TransferMode {
    pub fn from_move_flag(move_files: bool) -> Self {
        if move_files { Self::Move } else { Self::Copy }
    }

    pub fn verb(&self) -> &'static str {
        match self {
            Self::Copy => "copied",
            Self::Move => "moved",
        }
    }
}

/// Copy or move one file, creating the destination directory.
///
/// A move falls back to copy and delete when a rename is not possible,
/// e.g. across filesystems.
pub fn transfer_file(source: &Path, destination: &Path, mode: TransferMode) -> std::io::Result<()> {
    if let Some(parent) = destination.parent() {
        std::fs::create_dir_all(parent)?;
    }
    match mode {
        TransferMode::Copy => std::fs::copy(source, destination).map(|_| ()),
        TransferMode::Move => {
            if std::fs::rename(source, destination).is_ok() {
                return Ok(());
            }
            std::fs::copy(source, destination)?;
            std::fs::remove_file(source)
        }
    }
}

/// Counts from one filter run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSummary {
    /// Pairs transferred.
    pub transferred: usize,
    /// Images without a label.
    pub skipped: usize,
    pub failed: usize,
    pub mode: TransferMode,
    pub output: PathBuf,
}

/// Transfers every image that has a sibling label, preserving relative paths.
#[derive(Debug, Clone, Default)]
pub struct PairFilter {
    discovery: ImageDiscovery,
}

impl PairFilter {
    pub fn new(discovery: ImageDiscovery) -> Self {
        Self { discovery }
    }

    /// # Errors
    /// Only a missing source directory is fatal.
    pub fn filter(&self, source: &Path, destination: &Path, mode: TransferMode) -> Result<FilterSummary> {
        let files = ImageDiscovery::walk(source, "*")?;
        std::fs::create_dir_all(destination)?;

        let mut summary = FilterSummary {
            mode,
            output: destination.to_path_buf(),
            ..FilterSummary::default()
        };

        for image in files.iter().filter(|path| self.discovery.is_image(path)) {
            let label = label_path(image);
            if !label.is_file() {
                summary.skipped += 1;
                continue;
            }

            let relative = image.strip_prefix(source).unwrap_or(image);
            let out_image = destination.join(relative);
            let out_label = label_path(&out_image);

            let result = transfer_file(image, &out_image, mode).and_then(|_| transfer_file(&label, &out_label, mode));
            match result {
                Ok(()) => summary.transferred += 1,
                Err(e) => {
                    warn!("Error processing {}: {}", image.display(), e);
                    summary.failed += 1;
                }
            }
        }

        info!(
            "Done. {} {} images with JSON. Skipped (no JSON): {}. Output: {}",
            capitalize(mode.verb()),
            summary.transferred,
            summary.skipped,
            destination.display()
        );
        Ok(summary)
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
