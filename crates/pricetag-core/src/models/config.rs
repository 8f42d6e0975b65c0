//! Configuration structures for the labelling pipeline.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PricetagError, Result};
use crate::models::label::SchemaVariant;

/// Main configuration for pricetag.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PricetagConfig {
    /// Extraction service configuration.
    pub extraction: ExtractionConfig,

    /// Transport retry configuration.
    pub retry: RetryConfig,

    /// Directory processing configuration.
    pub processing: ProcessingConfig,

    /// Local OCR configuration.
    pub ocr: OcrConfig,
}

/// Extraction service and label schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Registered engine name.
    pub engine: String,

    /// Model identifier sent to the service.
    pub model: String,

    /// Completion token cap.
    pub max_tokens: u32,

    pub temperature: f32,

    /// Base URL of the OpenAI-compatible API.
    pub base_url: String,

    /// Environment variable holding the API key.
    pub api_key_env: String,

    /// Request timeout in seconds.
    pub timeout_secs: u64,

    /// Label schema in force.
    pub schema: SchemaVariant,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            engine: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            max_tokens: 120,
            temperature: 0.0,
            base_url: "https://api.openai.com/v1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_secs: 60,
            schema: SchemaVariant::Compact,
        }
    }
}

#[cfg(feature = "openai")]
impl ExtractionConfig {
    /// Connection settings for the OpenAI backend.
    pub fn openai_settings(&self) -> pricetag_vision::OpenAiSettings {
        pricetag_vision::OpenAiSettings {
            base_url: self.base_url.clone(),
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            api_key_env: self.api_key_env.clone(),
            timeout: std::time::Duration::from_secs(self.timeout_secs),
        }
    }
}

/// Retry behaviour for rate limits and transient transport errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Attempts of the whole extraction, including the first.
    pub max_attempts: u32,

    /// Rate-limit backoff step per attempt (ms).
    pub rate_limit_step_ms: u64,

    /// Upper bound of the rate-limit backoff (ms).
    pub rate_limit_ceiling_ms: u64,

    /// Transient-error backoff step per attempt (ms).
    pub transient_step_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            rate_limit_step_ms: 2000,
            rate_limit_ceiling_ms: 5000,
            transient_step_ms: 500,
        }
    }
}

/// Directory processing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Root directory of images and labels.
    pub data_dir: PathBuf,

    /// Image extensions considered, lowercase without dot.
    pub image_extensions: Vec<String>,

    /// Bucket directory excluded from processing.
    pub unknown_dir: String,

    /// Delay after each successful extraction (ms).
    pub pacing_ms: u64,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            image_extensions: ["jpg", "jpeg", "png", "webp", "bmp"]
                .into_iter()
                .map(String::from)
                .collect(),
            unknown_dir: "UNKNOWN".to_string(),
            pacing_ms: 0,
        }
    }
}

/// Local OCR configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Tesseract language code.
    pub language: String,

    /// Tesseract executable.
    pub tesseract_cmd: String,

    /// Keep extracted OCR text next to the sorted output.
    pub dump_text: bool,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            language: "pol".to_string(),
            tesseract_cmd: "tesseract".to_string(),
            dump_text: true,
        }
    }
}

impl PricetagConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| PricetagError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Load from `path` when it exists, defaults otherwise.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Apply `DATA_DIR`, `OPENAI_MODEL`, `OPENAI_MAX_TOKENS` and
    /// `TESSERACT_CMD` from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(dir) = lookup("DATA_DIR") {
            self.processing.data_dir = PathBuf::from(dir);
        }
        if let Some(model) = lookup("OPENAI_MODEL") {
            self.extraction.model = model;
        }
        if let Some(tokens) = lookup("OPENAI_MAX_TOKENS") {
            self.extraction.max_tokens = tokens.trim().parse().map_err(|_| {
                PricetagError::Config(format!("OPENAI_MAX_TOKENS is not a number: {}", tokens))
            })?;
        }
        if let Some(cmd) = lookup("TESSERACT_CMD") {
            self.ocr.tesseract_cmd = cmd;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = PricetagConfig::default();
        assert_eq!(config.extraction.engine, "openai");
        assert_eq!(config.extraction.max_tokens, 120);
        assert_eq!(config.extraction.schema, SchemaVariant::Compact);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.processing.unknown_dir, "UNKNOWN");
        assert_eq!(config.ocr.language, "pol");
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"extraction": {"schema": "decomposed"}, "processing": {"pacing_ms": 250}}"#).unwrap();

        let config = PricetagConfig::from_file(&path).unwrap();
        assert_eq!(config.extraction.schema, SchemaVariant::Decomposed);
        assert_eq!(config.extraction.model, "gpt-4o-mini");
        assert_eq!(config.processing.pacing_ms, 250);
        assert_eq!(config.processing.image_extensions.len(), 5);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut config = PricetagConfig::default();
        config.ocr.dump_text = false;
        config.save(&path).unwrap();

        let loaded = PricetagConfig::load_or_default(&path).unwrap();
        assert!(!loaded.ocr.dump_text);
        assert!(PricetagConfig::load_or_default(&dir.path().join("missing.json")).is_ok());
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ nope").unwrap();
        assert!(matches!(PricetagConfig::from_file(&path), Err(PricetagError::Config(_))));
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("DATA_DIR", "/srv/tags"),
            ("OPENAI_MODEL", "gpt-4o"),
            ("OPENAI_MAX_TOKENS", "200"),
            ("TESSERACT_CMD", ""),
        ]
        .into_iter()
        .collect();

        let mut config = PricetagConfig::default();
        config
            .apply_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.processing.data_dir, PathBuf::from("/srv/tags"));
        assert_eq!(config.extraction.model, "gpt-4o");
        assert_eq!(config.extraction.max_tokens, 200);
        assert_eq!(config.ocr.tesseract_cmd, "tesseract");

        let result = config.apply_overrides(|key| (key == "OPENAI_MAX_TOKENS").then(|| "lots".to_string()));
        assert!(matches!(result, Err(PricetagError::Config(_))));
    }
}
