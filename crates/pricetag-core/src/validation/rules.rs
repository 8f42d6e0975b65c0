//! Label validation rules.
//!
//! Each rule is a plain function over the decoded JSON value. Rules never
//! assume an earlier rule passed: a missing prerequisite is a failure.

use serde_json::{Map, Value};

use super::grammar::{cond_pattern, core_pattern, nth_pattern, promo_args_pattern};
use crate::models::label::{PromoCode, SchemaVariant};

/// How a failed rule affects acceptance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Blocks acceptance.
    Error,
    /// Reported, never blocks.
    Warning,
    /// Informational.
    Info,
}

/// Why a rule failed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleFailure {
    pub message: String,
    /// Required keys absent from the candidate.
    pub missing: Vec<String>,
    /// Keys present but not part of the schema.
    pub extra: Vec<String>,
}

impl From<String> for RuleFailure {
    fn from(message: String) -> Self {
        Self {
            message,
            ..Default::default()
        }
    }
}

impl From<&str> for RuleFailure {
    fn from(message: &str) -> Self {
        message.to_string().into()
    }
}

type RuleResult = std::result::Result<(), RuleFailure>;

/// Signature shared by every rule check.
pub type RuleCheck = fn(&Value, SchemaVariant) -> RuleResult;

/// A named check in the validator's rule table.
#[derive(Debug, Clone)]
pub struct ValidationRule {
    pub name: &'static str,
    pub description: &'static str,
    pub severity: Severity,
    pub check: RuleCheck,
}

impl ValidationRule {
    pub const fn new(
        name: &'static str,
        description: &'static str,
        severity: Severity,
        check: RuleCheck,
    ) -> Self {
        Self {
            name,
            description,
            severity,
            check,
        }
    }
}

/// Default rule table, in evaluation order.
pub fn default_rules() -> Vec<ValidationRule> {
    vec![
        ValidationRule::new(
            "structure",
            "candidate is an object with exactly the schema keys",
            Severity::Error,
            check_structure,
        ),
        ValidationRule::new("name", "name is a non-empty string", Severity::Error, check_name),
        ValidationRule::new("price", "price is null or a finite number", Severity::Error, check_price),
        ValidationRule::new("promo", "promo is an allowed code", Severity::Error, check_promo),
        ValidationRule::new(
            "argument_fields",
            "promotion arguments are strings without whitespace",
            Severity::Error,
            check_argument_fields,
        ),
        ValidationRule::new(
            "promo_grammar",
            "promotion arguments match the grammar of the promo code",
            Severity::Error,
            check_grammar,
        ),
        ValidationRule::new(
            "cross_field",
            "decomposed arguments are consistent with each other",
            Severity::Error,
            check_cross_field,
        ),
        ValidationRule::new(
            "price_present",
            "a promotion normally has a legible price",
            Severity::Warning,
            check_price_present,
        ),
    ]
}

fn object(value: &Value) -> std::result::Result<&Map<String, Value>, RuleFailure> {
    value.as_object().ok_or_else(|| "not an object".into())
}

fn field<'a>(obj: &'a Map<String, Value>, key: &str) -> std::result::Result<&'a Value, RuleFailure> {
    obj.get(key)
        .ok_or_else(|| format!("missing key '{}'", key).into())
}

fn str_field<'a>(obj: &'a Map<String, Value>, key: &str) -> std::result::Result<&'a str, RuleFailure> {
    field(obj, key)?
        .as_str()
        .ok_or_else(|| format!("{} must be a string", key).into())
}

fn promo_code(obj: &Map<String, Value>, schema: SchemaVariant) -> std::result::Result<PromoCode, RuleFailure> {
    let promo = field(obj, "promo")?;
    promo
        .as_str()
        .and_then(|s| s.parse::<PromoCode>().ok())
        .filter(|code| schema.allows(*code))
        .ok_or_else(|| {
            format!(
                "promo {} not in [{}]",
                promo,
                schema.allowed_names().join(", ")
            )
            .into()
        })
}

fn check_structure(value: &Value, schema: SchemaVariant) -> RuleResult {
    let obj = object(value)?;
    let expected = schema.keys();

    let missing: Vec<String> = expected
        .iter()
        .filter(|key| !obj.contains_key(**key))
        .map(|key| key.to_string())
        .collect();
    let mut extra: Vec<String> = obj
        .keys()
        .filter(|key| !expected.contains(&key.as_str()))
        .cloned()
        .collect();
    extra.sort();

    if missing.is_empty() && extra.is_empty() {
        return Ok(());
    }

    let mut message = format!("keys must be exactly [{}]", expected.join(", "));
    if !missing.is_empty() {
        message.push_str(&format!("; missing [{}]", missing.join(", ")));
    }
    if !extra.is_empty() {
        message.push_str(&format!("; extra [{}]", extra.join(", ")));
    }

    Err(RuleFailure {
        message,
        missing,
        extra,
    })
}

fn check_name(value: &Value, _schema: SchemaVariant) -> RuleResult {
    let name = str_field(object(value)?, "name")?;
    if name.trim().is_empty() {
        return Err("name must be a non-empty string".into());
    }
    Ok(())
}

fn check_price(value: &Value, _schema: SchemaVariant) -> RuleResult {
    match field(object(value)?, "price")? {
        Value::Null => Ok(()),
        Value::Number(n) if n.as_f64().is_some_and(f64::is_finite) => Ok(()),
        other => Err(format!("price must be null or a finite number, got {}", other).into()),
    }
}

fn check_promo(value: &Value, schema: SchemaVariant) -> RuleResult {
    promo_code(object(value)?, schema).map(|_| ())
}

fn check_argument_fields(value: &Value, schema: SchemaVariant) -> RuleResult {
    let obj = object(value)?;
    for key in schema.argument_fields() {
        let arg = str_field(obj, key)?;
        if arg.chars().any(char::is_whitespace) {
            return Err(format!("{} must not contain spaces: {:?}", key, arg).into());
        }
    }
    Ok(())
}

fn check_grammar(value: &Value, schema: SchemaVariant) -> RuleResult {
    let obj = object(value)?;
    let promo = promo_code(obj, schema)?;

    match schema {
        SchemaVariant::Compact => {
            let args = str_field(obj, "promo_args")?;
            if !promo_args_pattern(promo).is_match(args) {
                return Err(format!("promo_args {:?} invalid for {}", args, promo).into());
            }
        }
        SchemaVariant::Decomposed => {
            let core = str_field(obj, "core")?;
            let pattern = core_pattern(promo)
                .ok_or_else(|| RuleFailure::from(format!("{} has no core grammar", promo)))?;
            if !pattern.is_match(core) {
                return Err(format!("core {:?} invalid for {}", core, promo).into());
            }

            let cond = str_field(obj, "cond")?;
            if !cond_pattern().is_match(cond) {
                return Err(format!("cond {:?} must be empty, N or AxB(|AxB)*", cond).into());
            }

            let nth = str_field(obj, "nth")?;
            if !nth_pattern().is_match(nth) {
                return Err(format!("nth {:?} must be empty or an integer >= 2", nth).into());
            }
        }
    }

    Ok(())
}

fn check_cross_field(value: &Value, schema: SchemaVariant) -> RuleResult {
    if schema == SchemaVariant::Compact {
        return Ok(());
    }

    let obj = object(value)?;
    let promo = promo_code(obj, schema)?;
    let core = str_field(obj, "core")?;
    let cond = str_field(obj, "cond")?;
    let nth = str_field(obj, "nth")?;

    match promo {
        PromoCode::None if !(core.is_empty() && cond.is_empty() && nth.is_empty()) => {
            Err("NONE requires core, cond and nth to be empty".into())
        }
        PromoCode::Sup | PromoCode::Bxyg if !nth.is_empty() => {
            Err(format!("{} requires nth to be empty", promo).into())
        }
        PromoCode::DealFix if cond.is_empty() => Err("DEALFIX requires a non-empty cond".into()),
        PromoCode::DealFix if !nth.is_empty() => Err("DEALFIX requires nth to be empty".into()),
        PromoCode::Disc if !nth.is_empty() => {
            let same = matches!(
                (nth.parse::<u32>(), cond.parse::<u32>()),
                (Ok(n), Ok(c)) if n == c
            );
            if same {
                Ok(())
            } else {
                Err(format!("DISC nth {:?} must equal cond {:?}", nth, cond).into())
            }
        }
        _ => Ok(()),
    }
}

fn check_price_present(value: &Value, schema: SchemaVariant) -> RuleResult {
    let obj = object(value)?;
    let promo = promo_code(obj, schema)?;
    if promo != PromoCode::None && field(obj, "price")?.is_null() {
        return Err(format!("price is null on a {} label", promo).into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_structure_lists_missing_and_extra() {
        let failure = check_structure(
            &json!({"name": "a", "price": 1.0, "promo": "NONE", "extra": 1}),
            SchemaVariant::Compact,
        )
        .unwrap_err();

        assert_eq!(failure.missing, vec!["promo_args".to_string()]);
        assert_eq!(failure.extra, vec!["extra".to_string()]);
        assert_eq!(
            failure.message,
            "keys must be exactly [name, price, promo, promo_args]; missing [promo_args]; extra [extra]"
        );
    }

    #[test]
    fn test_rules_fail_instead_of_panicking_on_garbage() {
        for rule in default_rules() {
            assert!((rule.check)(&json!([1, 2]), SchemaVariant::Decomposed).is_err(), "{}", rule.name);
            assert!((rule.check)(&json!({}), SchemaVariant::Decomposed).is_err(), "{}", rule.name);
        }
    }

    #[test]
    fn test_cross_field_rules() {
        let label = |promo: &str, core: &str, cond: &str, nth: &str| {
            json!({"name": "x", "price": 1.0, "promo": promo, "core": core, "cond": cond, "nth": nth})
        };
        let d = SchemaVariant::Decomposed;

        assert!(check_cross_field(&label("NONE", "", "", ""), d).is_ok());
        assert!(check_cross_field(&label("NONE", "", "2", ""), d).is_err());
        assert!(check_cross_field(&label("SUP", "", "", "2"), d).is_err());
        assert!(check_cross_field(&label("BXYG", "1:1", "", "3"), d).is_err());
        assert!(check_cross_field(&label("DEALFIX", "1.99", "", ""), d).is_err());
        assert!(check_cross_field(&label("DEALFIX", "1.99", "2", ""), d).is_ok());
        assert!(check_cross_field(&label("DEALFIX", "1.99", "2", "2"), d).is_err());
        assert!(check_cross_field(&label("DISC", "50", "2", "2"), d).is_ok());
        assert!(check_cross_field(&label("DISC", "50", "3", "2"), d).is_err());
        assert!(check_cross_field(&label("DISC", "50", "2x3", "2"), d).is_err());
        assert!(check_cross_field(&label("DISC", "50", "", ""), d).is_ok());
    }

    #[test]
    fn test_price_rules() {
        let c = SchemaVariant::Compact;
        let with_price = |price: Value| json!({"name": "x", "price": price, "promo": "DISC", "promo_args": "10"});

        assert!(check_price(&with_price(json!(null)), c).is_ok());
        assert!(check_price(&with_price(json!(3)), c).is_ok());
        assert!(check_price(&with_price(json!("3.99")), c).is_err());
        assert!(check_price_present(&with_price(json!(null)), c).is_err());
        assert!(check_price_present(&with_price(json!(2.5)), c).is_ok());
    }
}
