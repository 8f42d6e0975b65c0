//! Candidate discovery and processing order.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};
use tracing::debug;

use crate::error::{PricetagError, Result};
use crate::models::config::ProcessingConfig;
use crate::models::label::{PromoCode, SchemaVariant};

/// An image that still needs a label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub path: PathBuf,
    /// Parent directory name, trimmed and upper-cased.
    pub folder: String,
    /// Promo code implied by the parent directory, if any.
    pub promo_hint: Option<PromoCode>,
}

/// Ordered work list for one run.
#[derive(Debug, Clone, Default)]
pub struct ProcessingPlan {
    candidates: Vec<Candidate>,
    folders: Vec<(String, usize)>,
}

impl ProcessingPlan {
    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Folders with their candidate counts, in visiting order.
    pub fn folders(&self) -> &[(String, usize)] {
        &self.folders
    }

    /// `folder:count` pairs in visiting order, e.g. `B:1, A:3, C:5`.
    pub fn preview(&self) -> String {
        self.folders
            .iter()
            .map(|(folder, count)| format!("{}:{}", folder, count))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Finds images under a root directory.
#[derive(Debug, Clone)]
pub struct ImageDiscovery {
    extensions: Vec<String>,
    unknown_dir: String,
}

impl ImageDiscovery {
    pub fn new<I, S>(extensions: I, unknown_dir: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            extensions: extensions
                .into_iter()
                .map(|e| e.as_ref().trim_start_matches('.').to_lowercase())
                .collect(),
            unknown_dir: unknown_dir.into().trim().to_uppercase(),
        }
    }

    pub fn from_config(config: &ProcessingConfig) -> Self {
        Self::new(&config.image_extensions, config.unknown_dir.as_str())
    }

    /// Whether the path has an allowed image extension (case-insensitive).
    pub fn is_image(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| self.extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(e)))
            .unwrap_or(false)
    }

    /// Whether the file sits directly in the excluded bucket directory.
    pub fn in_unknown_bucket(&self, path: &Path) -> bool {
        folder_key(path) == self.unknown_dir
    }

    /// First existing image sibling of a label file, in extension order.
    pub fn image_for_label(&self, label: &Path) -> Option<PathBuf> {
        self.extensions
            .iter()
            .map(|ext| label.with_extension(ext))
            .find(|candidate| candidate.is_file())
    }

    /// All files under `root` matching `file_pattern`, sorted.
    pub fn walk(root: &Path, file_pattern: &str) -> Result<Vec<PathBuf>> {
        if !root.is_dir() {
            return Err(PricetagError::DirectoryNotFound(root.to_path_buf()));
        }

        let pattern = format!(
            "{}/**/{}",
            Pattern::escape(&root.to_string_lossy()),
            file_pattern
        );
        let options = MatchOptions {
            case_sensitive: false,
            require_literal_separator: true,
            require_literal_leading_dot: false,
        };

        let mut files: Vec<PathBuf> = glob::glob_with(&pattern, options)
            .map_err(|e| PricetagError::Config(format!("invalid glob pattern: {}", e)))?
            .filter_map(|entry| entry.ok())
            .filter(|path| path.is_file())
            .collect();
        files.sort();
        Ok(files)
    }

    /// Every image under `root`, excluding the unknown bucket.
    pub fn images(&self, root: &Path) -> Result<Vec<PathBuf>> {
        Ok(Self::walk(root, "*")?
            .into_iter()
            .filter(|path| self.is_image(path) && !self.in_unknown_bucket(path))
            .collect())
    }

    /// Images without a label, grouped and ordered for processing.
    ///
    /// Folders are visited by ascending candidate count, ties broken by
    /// name; files within a folder are visited in path order.
    pub fn plan(&self, root: &Path, schema: SchemaVariant) -> Result<ProcessingPlan> {
        let mut buckets: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
        for path in self.images(root)? {
            if label_path(&path).exists() {
                continue;
            }
            buckets.entry(folder_key(&path)).or_default().push(path);
        }

        let mut folders: Vec<(String, Vec<PathBuf>)> = buckets.into_iter().collect();
        folders.sort_by(|(a_name, a), (b_name, b)| a.len().cmp(&b.len()).then_with(|| a_name.cmp(b_name)));

        let mut plan = ProcessingPlan::default();
        for (folder, mut paths) in folders {
            paths.sort();
            plan.folders.push((folder.clone(), paths.len()));
            plan.candidates.extend(paths.into_iter().map(|path| Candidate {
                promo_hint: promo_hint(&path, schema),
                folder: folder.clone(),
                path,
            }));
        }

        debug!("Discovered {} candidates under {}", plan.len(), root.display());
        Ok(plan)
    }
}

impl Default for ImageDiscovery {
    fn default() -> Self {
        Self::from_config(&ProcessingConfig::default())
    }
}

/// Label side-file for an image: same directory, same stem, `.json`.
pub fn label_path(image: &Path) -> PathBuf {
    image.with_extension("json")
}

/// Promo code implied by the image's parent directory name.
pub fn promo_hint(image: &Path, schema: SchemaVariant) -> Option<PromoCode> {
    image
        .parent()
        .and_then(|p| p.file_name())
        .and_then(|n| n.to_str())
        .and_then(|name| schema.normalize_promo_name(name))
}

fn folder_key(path: &Path) -> String {
    path.parent()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().trim().to_uppercase())
        .unwrap_or_default()
}
