//! Label engine backed by a vision extraction service.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use pricetag_vision::{ExtractionService, ImagePayload, ResponseFormat, Turn};
use tracing::{debug, warn};

use super::prompt::{correction_instruction, review_instruction, system_instruction, user_instruction};
use super::retry::RetryPolicy;
use super::LabelEngine;
use crate::error::{EngineError, Result};
use crate::models::label::{Label, PromoCode};
use crate::validation::Validator;

/// Produces labels by asking an [`ExtractionService`] and gating its replies
/// through the [`Validator`].
///
/// Every extraction costs at most two service calls: the request and one
/// correction turn. Transport failures restart the whole exchange according
/// to the [`RetryPolicy`].
pub struct VisionLabelEngine {
    name: String,
    service: Arc<dyn ExtractionService>,
    validator: Validator,
    retry: RetryPolicy,
}

impl VisionLabelEngine {
    pub fn new(service: Arc<dyn ExtractionService>, validator: Validator) -> Self {
        Self {
            name: service.name().to_string(),
            service,
            validator,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    fn decode(&self, raw: &str) -> std::result::Result<Label, String> {
        Label::from_json(raw, &self.validator)
    }

    /// Request plus at most one correction turn.
    async fn extract_with_correction(&self, turns: &[Turn], image: &Path) -> Result<Label> {
        let raw = self.service.complete(turns, ResponseFormat::JsonObject).await?;
        let reason = match self.decode(&raw) {
            Ok(label) => return Ok(label),
            Err(reason) => reason,
        };

        warn!(
            "Invalid response for {} ({}). Raw: {}",
            file_name(image),
            reason,
            raw
        );

        let mut correction = turns.to_vec();
        correction.push(Turn::assistant(raw));
        correction.push(Turn::user(correction_instruction(&reason)));

        let raw = self.service.complete(&correction, ResponseFormat::JsonObject).await?;
        self.decode(&raw).map_err(|reason| {
            warn!("Invalid correction for {}. Raw: {}", file_name(image), raw);
            EngineError::SchemaViolation { reason, raw }.into()
        })
    }

    /// Single call, no correction turn.
    async fn review_once(&self, turns: &[Turn]) -> Result<Label> {
        let raw = self.service.complete(turns, ResponseFormat::JsonObject).await?;
        self.decode(&raw)
            .map_err(|reason| EngineError::SchemaViolation { reason, raw }.into())
    }
}

#[async_trait]
impl LabelEngine for VisionLabelEngine {
    fn name(&self) -> &str {
        &self.name
    }

    fn build_request(&self, image: &Path, forced_promo: Option<PromoCode>) -> Result<Vec<Turn>> {
        let schema = self.validator.schema();
        let payload = ImagePayload::from_path(image)?;

        debug!(
            "Built request for {} (forced promo: {})",
            image.display(),
            forced_promo.map(|p| p.as_str()).unwrap_or("-")
        );

        Ok(vec![
            Turn::system(system_instruction(schema)),
            Turn::user_with_image(user_instruction(schema, forced_promo), payload),
        ])
    }

    async fn generate_label(&self, image: &Path, forced_promo: Option<PromoCode>) -> Result<Label> {
        let turns = self.build_request(image, forced_promo)?;
        self.retry
            .run(|_| self.extract_with_correction(&turns, image))
            .await
    }

    async fn review_label(&self, image: &Path, existing: &Label) -> Result<Label> {
        let schema = self.validator.schema();
        let turns = vec![
            Turn::system(system_instruction(schema)),
            Turn::user_with_image(review_instruction(existing), ImagePayload::from_path(image)?),
        ];

        self.retry.run(|_| self.review_once(&turns)).await
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PricetagError;
    use crate::models::label::SchemaVariant;
    use pretty_assertions::assert_eq;
    use pricetag_vision::{Role, ScriptedService, VisionError};
    use std::time::Duration;

    const VALID: &str = r#"{"name":"Widget","price":9.99,"promo":"DISC","promo_args":"20"}"#;

    fn image(dir: &tempfile::TempDir) -> std::path::PathBuf {
        let path = dir.path().join("tag.jpg");
        std::fs::write(&path, b"jpeg bytes").unwrap();
        path
    }

    fn engine(service: Arc<ScriptedService>) -> VisionLabelEngine {
        VisionLabelEngine::new(service, Validator::new(SchemaVariant::Compact)).with_retry(RetryPolicy {
            max_attempts: 3,
            rate_limit_step: Duration::from_millis(1),
            rate_limit_ceiling: Duration::from_millis(1),
            transient_step: Duration::from_millis(1),
        })
    }

    #[tokio::test]
    async fn test_valid_first_reply_uses_one_call() {
        let dir = tempfile::tempdir().unwrap();
        let service = Arc::new(ScriptedService::new().with_reply(VALID));
        let label = engine(service.clone()).generate_label(&image(&dir), None).await.unwrap();

        assert_eq!(label.name(), "Widget");
        assert_eq!(service.call_count(), 1);

        let request = &service.requests()[0];
        assert_eq!(request.format, ResponseFormat::JsonObject);
        assert_eq!(request.turns[0].role, Role::System);
        assert!(request.turns[1].has_image());
    }

    #[tokio::test]
    async fn test_correction_turn_recovers() {
        let dir = tempfile::tempdir().unwrap();
        let service = Arc::new(
            ScriptedService::new()
                .with_reply("definitely not json")
                .with_reply(VALID),
        );
        let label = engine(service.clone()).generate_label(&image(&dir), None).await.unwrap();

        assert_eq!(label.promo(), PromoCode::Disc);
        let requests = service.requests();
        assert_eq!(requests.len(), 2);

        let correction = &requests[1].turns;
        assert_eq!(correction.len(), 4);
        assert_eq!(correction[2].role, Role::Assistant);
        assert_eq!(correction[2].text(), "definitely not json");
        assert!(correction[3].text().starts_with("Your previous JSON violated the schema (invalid JSON"));
    }

    #[tokio::test]
    async fn test_bounded_correction() {
        let dir = tempfile::tempdir().unwrap();
        let service = Arc::new(ScriptedService::new().always(r#"{"name":"Widget"}"#));
        let err = engine(service.clone()).generate_label(&image(&dir), None).await.unwrap_err();

        assert_eq!(service.call_count(), 2);
        match err {
            PricetagError::Engine(EngineError::SchemaViolation { reason, raw }) => {
                assert!(reason.starts_with("keys must be exactly"));
                assert_eq!(raw, r#"{"name":"Widget"}"#);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_forced_promo_in_request() {
        let dir = tempfile::tempdir().unwrap();
        let service = Arc::new(ScriptedService::new().with_reply(VALID));
        engine(service.clone())
            .generate_label(&image(&dir), Some(PromoCode::Disc))
            .await
            .unwrap();

        let text = service.requests()[0].turns[1].text();
        assert!(text.contains("Promo is fixed to DISC"));
    }

    #[tokio::test]
    async fn test_rate_limit_restarts_exchange() {
        let dir = tempfile::tempdir().unwrap();
        let service = Arc::new(
            ScriptedService::new()
                .with_error(VisionError::RateLimited {
                    retry_after: Some(Duration::from_millis(1)),
                })
                .with_reply(VALID),
        );
        let label = engine(service.clone()).generate_label(&image(&dir), None).await;

        assert!(label.is_ok());
        assert_eq!(service.call_count(), 2);
    }

    #[tokio::test]
    async fn test_undecodable_reply_is_retried() {
        let dir = tempfile::tempdir().unwrap();
        let service = Arc::new(
            ScriptedService::new()
                .with_error(VisionError::Decode("response has no message content".into()))
                .with_reply(VALID),
        );
        let label = engine(service.clone()).generate_label(&image(&dir), None).await.unwrap();

        assert_eq!(label.promo(), PromoCode::Disc);
        assert_eq!(service.call_count(), 2);
    }

    #[tokio::test]
    async fn test_missing_image_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let service = Arc::new(ScriptedService::new().with_reply(VALID));
        let err = engine(service.clone())
            .generate_label(&dir.path().join("missing.jpg"), None)
            .await
            .unwrap_err();

        assert!(matches!(err, PricetagError::Vision(VisionError::Io(_))));
        assert_eq!(service.call_count(), 0);
    }

    #[tokio::test]
    async fn test_review_is_single_call() {
        let dir = tempfile::tempdir().unwrap();
        let validator = Validator::new(SchemaVariant::Compact);
        let existing = Label::from_json(VALID, &validator).unwrap();

        let service = Arc::new(ScriptedService::new().always("[]"));
        let err = engine(service.clone()).review_label(&image(&dir), &existing).await.unwrap_err();
        assert!(matches!(err, PricetagError::Engine(EngineError::SchemaViolation { .. })));
        assert_eq!(service.call_count(), 1);
        assert!(service.requests()[0].turns[1].text().contains("\"promo_args\": \"20\""));
    }
}
