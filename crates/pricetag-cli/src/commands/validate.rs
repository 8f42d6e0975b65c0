//! Validate command - diagnostic report for one label file.

use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, ValueEnum};
use console::style;
use serde_json::Value;

use pricetag_core::validation::{RuleOutcome, Severity};
use pricetag_core::{Label, SchemaVariant, ValidationReport, Validator};

use super::load_config;

/// Arguments for the validate command.
#[derive(Args)]
pub struct ValidateArgs {
    /// Label file to check
    #[arg(required = true)]
    label: PathBuf,

    /// Schema to validate against (default: configured schema)
    #[arg(short, long, value_enum)]
    schema: Option<SchemaArg>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SchemaArg {
    /// {name, price, promo, promo_args}
    Compact,
    /// {name, price, promo, core, cond, nth}
    Decomposed,
}

impl From<SchemaArg> for SchemaVariant {
    fn from(arg: SchemaArg) -> Self {
        match arg {
            SchemaArg::Compact => SchemaVariant::Compact,
            SchemaArg::Decomposed => SchemaVariant::Decomposed,
        }
    }
}

pub async fn run(args: ValidateArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let schema = args.schema.map(SchemaVariant::from).unwrap_or(config.extraction.schema);

    let content =
        fs::read_to_string(&args.label).with_context(|| format!("Failed to read {}", args.label.display()))?;
    let value: Value =
        serde_json::from_str(&content).with_context(|| format!("{} is not valid JSON", args.label.display()))?;

    let validator = Validator::new(schema);
    let report = validator.report(&value);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&args.label, &report);
        if let Some(offer) = Label::from_value(value, &validator).ok().and_then(|label| label.offer()) {
            println!("   Offer: {}", offer);
        }
    }

    if !report.is_valid {
        anyhow::bail!("{} is not a valid {} label", args.label.display(), schema);
    }
    Ok(())
}

fn print_report(path: &std::path::Path, report: &ValidationReport) {
    println!("{} ({} schema)", style(path.display()).bold(), report.schema);

    for outcome in &report.outcomes {
        println!("  {} {:<16} {}", glyph(outcome), outcome.rule, detail(outcome));
    }

    println!();
    println!(
        "   {} passed, {} errors, {} warnings",
        style(report.passed_count()).green(),
        style(report.error_count()).red(),
        style(report.warning_count()).yellow()
    );
}

fn glyph(outcome: &RuleOutcome) -> console::StyledObject<&'static str> {
    match (outcome.passed, outcome.severity) {
        (true, _) => style("✓").green(),
        (false, Severity::Error) => style("✗").red(),
        (false, Severity::Warning) => style("⚠").yellow(),
        (false, Severity::Info) => style("ℹ").blue(),
    }
}

fn detail(outcome: &RuleOutcome) -> String {
    if outcome.passed {
        return outcome.description.to_string();
    }
    let mut text = outcome.message.clone();
    if !outcome.missing.is_empty() {
        text.push_str(&format!(" (missing: {})", outcome.missing.join(", ")));
    }
    if !outcome.extra.is_empty() {
        text.push_str(&format!(" (extra: {})", outcome.extra.join(", ")));
    }
    text
}
