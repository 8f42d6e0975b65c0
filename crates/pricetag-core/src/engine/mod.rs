//! Label engines and their registry.

pub mod prompt;
pub mod retry;
pub mod vision;

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use pricetag_vision::Turn;

use crate::error::{EngineError, Result};
use crate::models::config::PricetagConfig;
use crate::models::label::{Label, PromoCode};

pub use retry::RetryPolicy;
pub use vision::VisionLabelEngine;

/// Trait for engines that turn a price-tag image into a validated label.
#[async_trait]
pub trait LabelEngine: Send + Sync {
    /// Registry name of the engine.
    fn name(&self) -> &str;

    /// Conversation sent for one image.
    fn build_request(&self, image: &Path, forced_promo: Option<PromoCode>) -> Result<Vec<Turn>>;

    /// Produce a label accepted by the validator.
    ///
    /// # Errors
    /// `EngineError::SchemaViolation` when no acceptable label was produced,
    /// service errors once retries are exhausted.
    async fn generate_label(&self, image: &Path, forced_promo: Option<PromoCode>) -> Result<Label>;

    /// Re-check an existing label against its image with a single call.
    async fn review_label(&self, image: &Path, existing: &Label) -> Result<Label>;
}

/// Builds an engine from the active configuration.
pub type EngineFactory = Box<dyn Fn(&PricetagConfig) -> Result<Arc<dyn LabelEngine>> + Send + Sync>;

/// Registry of label engines, looked up by name.
pub struct EngineRegistry {
    factories: BTreeMap<String, EngineFactory>,
}

impl EngineRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Registry with the built-in engines.
    pub fn with_defaults() -> Self {
        #[allow(unused_mut)]
        let mut registry = Self::new();

        #[cfg(feature = "openai")]
        registry.register("openai", |config: &PricetagConfig| {
            let service = pricetag_vision::OpenAiService::new(config.extraction.openai_settings())?;
            let engine = VisionLabelEngine::new(
                Arc::new(service),
                crate::validation::Validator::new(config.extraction.schema),
            )
            .with_name("openai")
            .with_retry(RetryPolicy::from(&config.retry));
            Ok(Arc::new(engine) as Arc<dyn LabelEngine>)
        });

        registry
    }

    /// Register an engine constructor, replacing any previous one.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(&PricetagConfig) -> Result<Arc<dyn LabelEngine>> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Box::new(factory));
    }

    /// Construct the engine registered under `name`.
    pub fn create(&self, name: &str, config: &PricetagConfig) -> Result<Arc<dyn LabelEngine>> {
        match self.factories.get(name) {
            Some(factory) => factory(config),
            None => Err(self.unknown(name).into()),
        }
    }

    /// Fail with [`EngineError::UnknownEngine`] unless `name` is registered.
    ///
    /// Unlike [`create`](Self::create) this never touches credentials.
    pub fn ensure(&self, name: &str) -> Result<()> {
        if self.contains(name) {
            Ok(())
        } else {
            Err(self.unknown(name).into())
        }
    }

    fn unknown(&self, name: &str) -> EngineError {
        EngineError::UnknownEngine {
            name: name.to_string(),
            available: self.list().join(", "),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn list(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }
}

impl Default for EngineRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
