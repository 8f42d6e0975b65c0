//! Data models.

pub mod config;
pub mod label;

pub use config::{ExtractionConfig, OcrConfig, PricetagConfig, ProcessingConfig, RetryConfig};
pub use label::{Label, Offer, PackOffer, PromoCode, SchemaVariant};
