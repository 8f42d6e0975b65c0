//! Core library for price-tag promotion labelling.
//!
//! This crate provides:
//! - The label model and its schema validator (compact and decomposed shapes)
//! - Label engines that drive an extraction service with bounded correction
//! - Directory processing, revalidation and progress reporting
//! - Text-rule classification of OCR output and an OCR-driven file sorter
//! - Dataset tools (JSONL export, labelled-pair filtering)

pub mod classify;
pub mod dataset;
pub mod engine;
pub mod error;
pub mod models;
pub mod ocr;
pub mod processing;
pub mod validation;

pub use classify::{FileSorter, SortSummary, TextRule, TextRulesEngine};
pub use dataset::{ExportSummary, FilterSummary, JsonlExporter, PairFilter, TransferMode};
pub use engine::{EngineRegistry, LabelEngine, RetryPolicy, VisionLabelEngine};
pub use error::{EngineError, OcrError, PricetagError, Result, RuleError};
pub use models::{Label, Offer, PricetagConfig, PromoCode, SchemaVariant};
pub use ocr::{TesseractExtractor, TextExtractor};
pub use processing::{
    DirectoryProcessor, ProcessingPlan, ProcessingSummary, ProgressEvent, ProgressReporter, RevalidationSummary,
    Revalidator,
};
pub use validation::{Validation, ValidationReport, Validator};

/// Re-export extraction service types.
pub use pricetag_vision::{ExtractionService, ScriptedService, Turn, VisionError};

#[cfg(feature = "openai")]
pub use pricetag_vision::{OpenAiService, OpenAiSettings};
