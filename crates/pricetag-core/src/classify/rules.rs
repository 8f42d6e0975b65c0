//! Ordered text rules mapping OCR text to a promo code.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use tracing::warn;

use crate::error::RuleError;
use crate::models::label::PromoCode;

lazy_static! {
    // "2+1 gratis"
    static ref BXYG_PLUS: Regex = Regex::new(r"(?i)\b(\d+)\s*\+\s*(\d+)\s*gratis\b").unwrap();

    // "drugi za 1 zł", "3-ty za 0,99 zł"
    static ref DEALFIX_NTH: Regex = Regex::new(
        r"(?i)\b(drugi|\d+-?ty)\b\s*za\s*\d+[,.]?\d*\s*zł"
    ).unwrap();

    // "drugi ... -50% taniej"
    static ref DISC_SECOND: Regex = Regex::new(r"(?is)\bdrugi\b.*?%\s*taniej").unwrap();

    // "20% taniej przy zakupie 2"
    static ref DISC_ON_PURCHASE: Regex = Regex::new(r"(?i)%\s*taniej\s*przy\s*zakupie\s*\d+").unwrap();

    // "30% taniej"
    static ref DISC_STANDALONE: Regex = Regex::new(r"(?i)\b\d+\s*%\s*taniej\b").unwrap();
}

/// Predicate over OCR text.
pub type RuleMatcher = fn(&str) -> Result<bool, RuleError>;

/// A named predicate with the promo code it implies.
#[derive(Debug, Clone)]
pub struct TextRule {
    pub name: String,
    pub promo: PromoCode,
    pub description: String,
    /// Lower runs first.
    pub priority: i32,
    pub matcher: RuleMatcher,
}

impl TextRule {
    pub fn new(
        name: impl Into<String>,
        promo: PromoCode,
        description: impl Into<String>,
        priority: i32,
        matcher: RuleMatcher,
    ) -> Self {
        Self {
            name: name.into(),
            promo,
            description: description.into(),
            priority,
            matcher,
        }
    }
}

/// One rule that matched, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleMatch {
    pub rule: String,
    pub promo: PromoCode,
    pub priority: i32,
}

/// Every matching rule plus the winner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub promo: Option<PromoCode>,
    pub applied_rule: Option<String>,
    pub matches: Vec<RuleMatch>,
}

/// Priority-ordered rule list. The first matching rule wins.
#[derive(Debug, Clone)]
pub struct TextRulesEngine {
    rules: Vec<TextRule>,
}

impl TextRulesEngine {
    /// Engine without any rule.
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Engine with the built-in Polish rules.
    pub fn new() -> Self {
        let mut engine = Self::empty();
        for rule in default_rules() {
            engine.add_rule(rule);
        }
        engine
    }

    /// Insert a rule, keeping the list sorted by priority. Rules with equal
    /// priority keep insertion order.
    pub fn add_rule(&mut self, rule: TextRule) {
        let at = self.rules.partition_point(|r| r.priority <= rule.priority);
        self.rules.insert(at, rule);
    }

    /// Remove a rule by name. Returns whether a rule was removed.
    pub fn remove_rule(&mut self, name: &str) -> bool {
        let before = self.rules.len();
        self.rules.retain(|r| r.name != name);
        self.rules.len() != before
    }

    pub fn list_rules(&self) -> &[TextRule] {
        &self.rules
    }

    /// Promo code of the first matching rule.
    ///
    /// A rule that fails is logged and treated as not matching.
    pub fn classify(&self, text: &str) -> Option<PromoCode> {
        self.rules
            .iter()
            .find(|rule| evaluate(rule, text))
            .map(|rule| rule.promo)
    }

    /// Evaluate every rule.
    pub fn classify_with_details(&self, text: &str) -> Classification {
        let mut result = Classification::default();
        for rule in self.rules.iter().filter(|rule| evaluate(rule, text)) {
            if result.promo.is_none() {
                result.promo = Some(rule.promo);
                result.applied_rule = Some(rule.name.clone());
            }
            result.matches.push(RuleMatch {
                rule: rule.name.clone(),
                promo: rule.promo,
                priority: rule.priority,
            });
        }
        result
    }
}

impl Default for TextRulesEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn evaluate(rule: &TextRule, text: &str) -> bool {
    match (rule.matcher)(text) {
        Ok(matched) => matched,
        Err(e) => {
            warn!("Error applying rule '{}': {}", rule.name, e);
            false
        }
    }
}

/// Built-in rules, in priority order.
pub fn default_rules() -> Vec<TextRule> {
    vec![
        TextRule::new(
            "BXYG - Buy X Get Y Gratis",
            PromoCode::Bxyg,
            "'X+Y gratis' or 'gratis przy zakupie'",
            1,
            match_bxyg,
        ),
        TextRule::new(
            "DEALFIX - Fixed Price Deal",
            PromoCode::DealFix,
            "'drugi za X zł' or 'N-ty za X zł'",
            2,
            match_dealfix,
        ),
        TextRule::new(
            "DISC - Discount",
            PromoCode::Disc,
            "percentage discounts and 'teraz taniej'",
            3,
            match_disc,
        ),
        TextRule::new("SUP - Supercena", PromoCode::Sup, "'supercena' keyword", 4, match_sup),
        TextRule::new(
            "NONE - No Promotion",
            PromoCode::None,
            "'na stałe w ofercie'",
            5,
            match_none,
        ),
    ]
}

fn match_bxyg(text: &str) -> Result<bool, RuleError> {
    Ok(BXYG_PLUS.is_match(text) || text.to_lowercase().contains("gratis"))
}

fn match_dealfix(text: &str) -> Result<bool, RuleError> {
    Ok(DEALFIX_NTH.is_match(text))
}

fn match_disc(text: &str) -> Result<bool, RuleError> {
    let lower = text.to_lowercase();
    if DISC_SECOND.is_match(text) || DISC_ON_PURCHASE.is_match(text) || lower.contains("teraz taniej") {
        return Ok(true);
    }

    // A bare percentage only counts without a purchase condition.
    let conditional = ["przy zakupie", "drugi", "n-ty"]
        .iter()
        .any(|keyword| lower.contains(keyword));
    Ok(DISC_STANDALONE.is_match(text) && !conditional)
}

fn match_sup(text: &str) -> Result<bool, RuleError> {
    Ok(text.to_lowercase().contains("supercena"))
}

fn match_none(text: &str) -> Result<bool, RuleError> {
    Ok(text.to_lowercase().contains("na stałe w ofercie"))
}
