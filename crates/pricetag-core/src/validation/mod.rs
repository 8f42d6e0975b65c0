//! Schema validation for extracted labels.
//!
//! [`Validator::validate`] stops at the first failed error-severity rule and
//! is the gate used by the label engine. [`Validator::report`] runs every
//! rule and is meant for diagnostics.

pub mod grammar;
pub mod rules;

use serde::Serialize;
use serde_json::Value;

use crate::models::label::SchemaVariant;
pub use rules::{RuleCheck, RuleFailure, Severity, ValidationRule, default_rules};

/// Short-circuit validation outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validation {
    pub accepted: bool,
    /// First violated rule, empty when accepted.
    pub reason: String,
}

impl Validation {
    pub fn ok() -> Self {
        Self {
            accepted: true,
            reason: String::new(),
        }
    }

    pub fn reject(reason: impl Into<String>) -> Self {
        Self {
            accepted: false,
            reason: reason.into(),
        }
    }
}

/// Result of one rule in diagnostic mode.
#[derive(Debug, Clone, Serialize)]
pub struct RuleOutcome {
    pub rule: &'static str,
    pub description: &'static str,
    pub severity: Severity,
    pub passed: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extra: Vec<String>,
}

/// Full diagnostic report.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub schema: SchemaVariant,
    pub is_valid: bool,
    pub outcomes: Vec<RuleOutcome>,
}

impl ValidationReport {
    pub fn passed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.passed).count()
    }

    pub fn error_count(&self) -> usize {
        self.failed(Severity::Error).count()
    }

    pub fn warning_count(&self) -> usize {
        self.failed(Severity::Warning).count()
    }

    /// Failed outcomes of the given severity.
    pub fn failed(&self, severity: Severity) -> impl Iterator<Item = &RuleOutcome> {
        self.outcomes
            .iter()
            .filter(move |o| !o.passed && o.severity == severity)
    }
}

/// Label validator for one schema variant.
#[derive(Debug, Clone)]
pub struct Validator {
    schema: SchemaVariant,
    rules: Vec<ValidationRule>,
}

impl Validator {
    /// Validator with the default rule table.
    pub fn new(schema: SchemaVariant) -> Self {
        Self {
            schema,
            rules: default_rules(),
        }
    }

    pub fn schema(&self) -> SchemaVariant {
        self.schema
    }

    pub fn rules(&self) -> &[ValidationRule] {
        &self.rules
    }

    /// Append a rule after the defaults.
    pub fn add_rule(&mut self, rule: ValidationRule) {
        self.rules.push(rule);
    }

    /// Remove a rule by name. Returns whether a rule was removed.
    pub fn remove_rule(&mut self, name: &str) -> bool {
        let before = self.rules.len();
        self.rules.retain(|r| r.name != name);
        self.rules.len() != before
    }

    /// Accept or reject a decoded JSON candidate.
    ///
    /// Only error-severity rules are evaluated. Never panics on malformed
    /// input.
    pub fn validate(&self, candidate: &Value) -> Validation {
        for rule in self.rules.iter().filter(|r| r.severity == Severity::Error) {
            if let Err(failure) = (rule.check)(candidate, self.schema) {
                return Validation::reject(failure.message);
            }
        }
        Validation::ok()
    }

    /// Run every rule independently.
    pub fn report(&self, candidate: &Value) -> ValidationReport {
        let outcomes: Vec<RuleOutcome> = self
            .rules
            .iter()
            .map(|rule| {
                let result = (rule.check)(candidate, self.schema);
                let passed = result.is_ok();
                let failure = result.err().unwrap_or_default();
                RuleOutcome {
                    rule: rule.name,
                    description: rule.description,
                    severity: rule.severity,
                    passed,
                    message: failure.message,
                    missing: failure.missing,
                    extra: failure.extra,
                }
            })
            .collect();

        let is_valid = outcomes
            .iter()
            .all(|o| o.passed || o.severity != Severity::Error);

        ValidationReport {
            schema: self.schema,
            is_valid,
            outcomes,
        }
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(SchemaVariant::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn compact(promo: &str, args: &str) -> Value {
        json!({"name": "Widget", "price": 9.99, "promo": promo, "promo_args": args})
    }

    #[test]
    fn test_valid_labels_accept_with_empty_reason() {
        let validator = Validator::new(SchemaVariant::Compact);
        for (promo, args) in [
            ("NONE", ""),
            ("SUP", ""),
            ("SUP", "2"),
            ("DISC", "20"),
            ("DEALPCT", "2:40"),
            ("DEALFIX", "2=5.00"),
            ("BXYG", "1:1"),
            ("PACK", "2x6:50|12"),
        ] {
            assert_eq!(validator.validate(&compact(promo, args)), Validation::ok(), "{promo} {args}");
        }
    }

    #[test]
    fn test_promo_grammar_table() {
        let validator = Validator::new(SchemaVariant::Compact);
        let table = [
            ("DISC", "100", true),
            ("DISC", "101", false),
            ("DISC", "-1", false),
            ("BXYG", "1:1", true),
            ("BXYG", "0:1", false),
            ("BXYG", "1:0", false),
            ("DEALFIX", "2=1.00", true),
            ("DEALFIX", "2=1.0", false),
            ("DEALFIX", "2=1.005", false),
            ("NONE", "5", false),
        ];
        for (promo, args, expected) in table {
            assert_eq!(
                validator.validate(&compact(promo, args)).accepted,
                expected,
                "{promo} {args}"
            );
        }
    }

    #[test]
    fn test_whitespace_rejected_before_grammar() {
        let validator = Validator::new(SchemaVariant::Compact);
        let result = validator.validate(&compact("BXYG", "1 :1"));
        assert!(!result.accepted);
        assert!(result.reason.contains("must not contain spaces"));
    }

    #[test]
    fn test_key_set_exactness() {
        let validator = Validator::new(SchemaVariant::Compact);
        let mut extra = compact("NONE", "");
        extra["note"] = json!("x");
        let missing = json!({"name": "Widget", "price": 1.0, "promo": "NONE"});

        for candidate in [extra, missing] {
            let result = validator.validate(&candidate);
            assert!(!result.accepted);
            assert!(result.reason.starts_with("keys must be exactly [name, price, promo, promo_args]"));
        }
    }

    #[test]
    fn test_check_order() {
        let validator = Validator::new(SchemaVariant::Compact);

        assert_eq!(validator.validate(&json!("text")).reason, "not an object");
        assert_eq!(validator.validate(&json!(null)).reason, "not an object");
        assert_eq!(
            validator.validate(&json!({"name": " ", "price": "x", "promo": "?", "promo_args": ""})).reason,
            "name must be a non-empty string"
        );

        let bad_promo = validator.validate(&compact("FREE", ""));
        assert!(bad_promo.reason.contains("\"FREE\""));
        assert!(bad_promo.reason.contains("BXYG, DEALFIX, DEALPCT, DISC, NONE, PACK, SUP"));

        let null_price = json!({"name": "Widget", "price": null, "promo": "NONE", "promo_args": ""});
        assert!(validator.validate(&null_price).accepted);
    }

    #[test]
    fn test_decomposed_schema() {
        let validator = Validator::new(SchemaVariant::Decomposed);
        let label = |promo: &str, core: &str, cond: &str, nth: &str| {
            json!({"name": "Kawa", "price": 19.99, "promo": promo, "core": core, "cond": cond, "nth": nth})
        };

        assert!(validator.validate(&label("DEALFIX", "9.99", "2", "")).accepted);
        assert!(validator.validate(&label("DISC", "50", "2", "2")).accepted);
        assert!(validator.validate(&label("BXYG", "2:1", "", "")).accepted);
        assert!(!validator.validate(&label("DEALPCT", "", "", "")).accepted);
        assert!(!validator.validate(&label("DEALFIX", "9.99", "", "")).accepted);
        assert!(!validator.validate(&label("DISC", "50", "", "1")).accepted);
        assert!(!validator.validate(&compact("DISC", "50")).accepted);
    }

    #[test]
    fn test_report_runs_every_rule() {
        let validator = Validator::new(SchemaVariant::Compact);
        let report = validator.report(&json!({"name": "", "price": null, "promo": "DISC", "promo_args": "1 0"}));

        assert!(!report.is_valid);
        assert_eq!(report.outcomes.len(), validator.rules().len());
        let failed: Vec<_> = report.outcomes.iter().filter(|o| !o.passed).map(|o| o.rule).collect();
        assert_eq!(failed, ["name", "argument_fields", "promo_grammar", "price_present"]);
        assert_eq!(report.error_count(), 3);
        assert_eq!(report.warning_count(), 1);
    }

    #[test]
    fn test_report_warning_does_not_block() {
        let validator = Validator::new(SchemaVariant::Compact);
        let report = validator.report(&json!({"name": "Ser", "price": null, "promo": "SUP", "promo_args": ""}));

        assert!(report.is_valid);
        assert_eq!(report.warning_count(), 1);
        assert!(validator.validate(&json!({"name": "Ser", "price": null, "promo": "SUP", "promo_args": ""})).accepted);
    }

    #[test]
    fn test_report_structure_details() {
        let validator = Validator::new(SchemaVariant::Compact);
        let report = validator.report(&json!({"name": "Ser", "price": 1.0, "promo": "NONE", "args": ""}));
        let structure = &report.outcomes[0];

        assert_eq!(structure.rule, "structure");
        assert_eq!(structure.missing, vec!["promo_args".to_string()]);
        assert_eq!(structure.extra, vec!["args".to_string()]);
    }

    #[test]
    fn test_custom_rules() {
        fn no_digits_in_name(value: &Value, _: SchemaVariant) -> Result<(), RuleFailure> {
            match value.get("name").and_then(Value::as_str) {
                Some(name) if name.chars().any(|c| c.is_ascii_digit()) => Err("name contains digits".into()),
                _ => Ok(()),
            }
        }

        let mut validator = Validator::new(SchemaVariant::Compact);
        validator.add_rule(ValidationRule::new("name_digits", "no digits", Severity::Error, no_digits_in_name));
        let mut candidate = compact("NONE", "");
        candidate["name"] = json!("Cola 2");

        assert_eq!(validator.validate(&candidate).reason, "name contains digits");
        assert!(validator.remove_rule("name_digits"));
        assert!(!validator.remove_rule("name_digits"));
        assert!(validator.validate(&candidate).accepted);
    }
}
