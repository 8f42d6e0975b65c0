//! JSONL training-set export.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::error::{PricetagError, Result};
use crate::processing::ImageDiscovery;

/// Sibling image extensions tried for each label, in order.
const IMAGE_EXTENSIONS: [&str; 2] = ["jpg", "png"];

/// One line of the export.
#[derive(Debug, Serialize)]
struct TrainingRecord<'a> {
    image_path: &'a str,
    /// The label serialized as a compact JSON string.
    label: String,
}

/// Result of an export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub processed: usize,
    pub errors: usize,
    pub output: PathBuf,
}

/// Writes every label under a directory as one JSONL record.
#[derive(Debug, Clone)]
pub struct JsonlExporter {
    image_prefix: String,
}

impl JsonlExporter {
    pub fn new(image_prefix: impl Into<String>) -> Self {
        Self {
            image_prefix: image_prefix.into().trim_end_matches('/').to_string(),
        }
    }

    /// Export all labels under `data_dir` to `output`.
    ///
    /// # Errors
    /// A missing `data_dir` or an unwritable `output` is fatal; labels with
    /// no image or unreadable content are counted and skipped.
    pub fn export(&self, data_dir: &Path, output: &Path) -> Result<ExportSummary> {
        let labels = ImageDiscovery::walk(data_dir, "*.json")?;

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut writer = BufWriter::new(File::create(output)?);

        let mut summary = ExportSummary {
            processed: 0,
            errors: 0,
            output: output.to_path_buf(),
        };

        for label_file in labels {
            match self.record_line(data_dir, &label_file) {
                Ok(line) => {
                    writeln!(writer, "{}", line)?;
                    summary.processed += 1;
                }
                Err(e) => {
                    warn!("Skipping {}: {}", label_file.display(), e);
                    summary.errors += 1;
                }
            }
        }
        writer.flush()?;

        info!(
            "Exported {} records ({} errors) to {}",
            summary.processed,
            summary.errors,
            output.display()
        );
        Ok(summary)
    }

    fn record_line(&self, data_dir: &Path, label_file: &Path) -> Result<String> {
        let image = IMAGE_EXTENSIONS
            .iter()
            .map(|ext| label_file.with_extension(ext))
            .find(|candidate| candidate.is_file())
            .ok_or_else(|| {
                PricetagError::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "no .jpg or .png image next to label",
                ))
            })?;

        let value: Value = serde_json::from_str(&std::fs::read_to_string(label_file)?)?;
        let image_path = self.image_path(data_dir, &image);
        let record = TrainingRecord {
            image_path: &image_path,
            label: serde_json::to_string(&value)?,
        };
        Ok(serde_json::to_string(&record)?)
    }

    fn image_path(&self, data_dir: &Path, image: &Path) -> String {
        let relative = image.strip_prefix(data_dir).unwrap_or(image);
        let relative = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        if self.image_prefix.is_empty() {
            relative
        } else {
            format!("{}/{}", self.image_prefix, relative)
        }
    }
}

impl Default for JsonlExporter {
    fn default() -> Self {
        Self::new("images")
    }
}
