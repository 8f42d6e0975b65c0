//! OpenAI-compatible chat completions backend.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::backend::{ExtractionService, ResponseFormat};
use crate::error::VisionError;
use crate::message::{ContentPart, Turn};
use crate::Result;

/// Connection settings for [`OpenAiService`].
#[derive(Debug, Clone)]
pub struct OpenAiSettings {
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    pub timeout: Duration,
}

impl Default for OpenAiSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            max_tokens: 120,
            temperature: 0.0,
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

/// Extraction service backed by an OpenAI-compatible `/chat/completions` API.
pub struct OpenAiService {
    client: Client,
    api_key: String,
    settings: OpenAiSettings,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl OpenAiService {
    /// Create a service, reading the API key from the configured variable.
    ///
    /// A `.env` file in the working directory is honoured.
    pub fn new(settings: OpenAiSettings) -> Result<Self> {
        let _ = dotenvy::dotenv();

        let api_key = std::env::var(&settings.api_key_env)
            .map_err(|_| VisionError::MissingCredentials(format!("{} not set", settings.api_key_env)))?;

        Self::with_api_key(settings, api_key)
    }

    /// Create a service with an explicit API key.
    pub fn with_api_key(settings: OpenAiSettings, api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| VisionError::Transient(e.to_string()))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            settings,
        })
    }

    fn request_body(&self, turns: &[Turn], format: ResponseFormat) -> Value {
        let messages: Vec<Value> = turns.iter().map(turn_to_message).collect();

        let mut body = json!({
            "model": self.settings.model,
            "messages": messages,
            "temperature": self.settings.temperature,
            "max_tokens": self.settings.max_tokens,
        });

        if format == ResponseFormat::JsonObject {
            body["response_format"] = json!({ "type": "json_object" });
        }

        body
    }

    async fn send(&self, body: &Value) -> Result<String> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.settings.base_url.trim_end_matches('/')))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| VisionError::Transient(e.to_string()))?;

        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(parse_retry_after);
            return Err(VisionError::RateLimited { retry_after });
        }

        if status.is_server_error() {
            let text = response.text().await.unwrap_or_default();
            return Err(VisionError::Transient(format!("{}: {}", status, text)));
        }

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(VisionError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| VisionError::Decode(e.to_string()))?;

        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| VisionError::Decode("response has no message content".to_string()))?;

        Ok(content.trim().to_string())
    }
}

#[async_trait]
impl ExtractionService for OpenAiService {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, turns: &[Turn], format: ResponseFormat) -> Result<String> {
        debug!(
            model = %self.settings.model,
            turns = turns.len(),
            "Sending chat completion request"
        );

        let body = self.request_body(turns, format);
        match self.send(&body).await {
            // Some models reject `response_format`; retry once as plain text.
            Err(VisionError::Api { status: 400, message }) if format == ResponseFormat::JsonObject => {
                warn!("JSON response format rejected ({}), retrying without it", message);
                let body = self.request_body(turns, ResponseFormat::Text);
                self.send(&body).await
            }
            other => other,
        }
    }
}

fn turn_to_message(turn: &Turn) -> Value {
    let role = match turn.role {
        crate::Role::System => "system",
        crate::Role::User => "user",
        crate::Role::Assistant => "assistant",
    };

    // Plain text turns are sent as a string, mixed turns as a parts array.
    if !turn.has_image() {
        return json!({ "role": role, "content": turn.text() });
    }

    let parts: Vec<Value> = turn
        .content
        .iter()
        .map(|part| match part {
            ContentPart::Text(text) => json!({ "type": "text", "text": text }),
            ContentPart::Image(image) => json!({
                "type": "image_url",
                "image_url": { "url": image.data_uri() },
            }),
        })
        .collect();

    json!({ "role": role, "content": parts })
}

/// Parse a `Retry-After` header given in (possibly fractional) seconds.
fn parse_retry_after(value: &str) -> Option<Duration> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
}
