//! Dataset preparation: JSONL export and labelled-pair filtering.

pub mod export;
pub mod filter;

pub use export::{ExportSummary, JsonlExporter};
pub use filter::{FilterSummary, PairFilter, TransferMode, transfer_file};
