//! Text-rule classification of OCR output and the sorter built on it.

pub mod rules;
pub mod sorter;

pub use rules::{Classification, RuleMatch, RuleMatcher, TextRule, TextRulesEngine, default_rules};
pub use sorter::{FileSorter, SortSummary, TEXT_DUMP_DIR};
