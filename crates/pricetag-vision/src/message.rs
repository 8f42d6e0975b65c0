//! Conversation turn types sent to an extraction service.

use std::path::Path;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use image::ImageFormat;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::Result;

/// Author of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// An image embedded into a request as a `data:` URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    mime_type: String,
    data_uri: String,
}

impl ImagePayload {
    /// Read an image file and encode it for transport.
    ///
    /// The MIME type is taken from the file extension; unknown extensions
    /// fall back to `image/jpeg`.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let mime_type = ImageFormat::from_path(path)
            .map(|format| format.to_mime_type().to_string())
            .unwrap_or_else(|_| "image/jpeg".to_string());

        debug!("Encoding {} ({} bytes, {})", path.display(), bytes.len(), mime_type);

        Ok(Self::from_bytes(&bytes, mime_type))
    }

    /// Encode raw image bytes with a known MIME type.
    pub fn from_bytes(bytes: &[u8], mime_type: impl Into<String>) -> Self {
        let mime_type = mime_type.into();
        let data_uri = format!("data:{};base64,{}", mime_type, STANDARD.encode(bytes));
        Self { mime_type, data_uri }
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn data_uri(&self) -> &str {
        &self.data_uri
    }
}

/// One piece of a turn's content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentPart {
    Text(String),
    Image(ImagePayload),
}

/// A single conversation turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub role: Role,
    pub content: Vec<ContentPart>,
}

impl Turn {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: vec![ContentPart::Text(text.into())],
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: vec![ContentPart::Text(text.into())],
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: vec![ContentPart::Text(text.into())],
        }
    }

    /// A user turn carrying an instruction followed by one image.
    pub fn user_with_image(text: impl Into<String>, image: ImagePayload) -> Self {
        Self {
            role: Role::User,
            content: vec![ContentPart::Text(text.into()), ContentPart::Image(image)],
        }
    }

    /// Concatenated text parts of the turn.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|part| match part {
                ContentPart::Text(text) => Some(text.as_str()),
                ContentPart::Image(_) => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Whether the turn embeds an image.
    pub fn has_image(&self) -> bool {
        self.content
            .iter()
            .any(|part| matches!(part, ContentPart::Image(_)))
    }
}
