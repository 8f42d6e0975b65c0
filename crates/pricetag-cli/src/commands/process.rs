//! Process command - label every unlabelled image under the data directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use pricetag_core::processing::{ImageDiscovery, ItemOutcome, ProgressEvent, ProgressReporter, format_duration};
use pricetag_core::{DirectoryProcessor, EngineRegistry, ProcessingSummary};

use super::{data_dir, load_config};

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Root directory with promo sub-folders (default: configured data_dir)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Label engine to use (default: configured engine)
    #[arg(short, long)]
    engine: Option<String>,

    /// Write a per-image CSV summary
    #[arg(long)]
    summary: Option<PathBuf>,

    /// Only print the processing plan
    #[arg(long)]
    plan_only: bool,
}

/// Renders orchestrator events on a progress bar.
struct BarReporter {
    bar: ProgressBar,
}

impl BarReporter {
    fn new() -> anyhow::Result<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ETA {prefix} {msg}")?
                .progress_chars("=>-"),
        );
        Ok(Self { bar })
    }
}

impl ProgressReporter for BarReporter {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Started { total } => self.bar.set_length(total as u64),
            ProgressEvent::Item { path, promo, .. } => {
                let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
                match promo {
                    Some(promo) => self.bar.set_message(format!("{} ({})", name, promo)),
                    None => self.bar.set_message(name),
                }
            }
            ProgressEvent::Finished { outcome, eta, .. } => {
                if let ItemOutcome::Failed { error } = outcome {
                    self.bar.println(format!("{} {}", style("✗").red(), error));
                }
                if let Some(eta) = eta {
                    self.bar.set_prefix(format_duration(eta));
                }
                self.bar.inc(1);
            }
        }
    }
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(engine) = args.engine {
        config.extraction.engine = engine;
    }
    let root = data_dir(args.data_dir, &config);

    let registry = EngineRegistry::with_defaults();
    registry.ensure(&config.extraction.engine)?;

    let plan = ImageDiscovery::from_config(&config.processing).plan(&root, config.extraction.schema)?;
    if plan.is_empty() {
        println!(
            "{} All images under {} already have labels.",
            style("ℹ").blue(),
            root.display()
        );
        return Ok(());
    }

    println!(
        "{} Found {} images to label. Order by folder (ascending): {}",
        style("ℹ").blue(),
        plan.len(),
        plan.preview()
    );
    if args.plan_only {
        for candidate in plan.candidates() {
            println!("  {}", candidate.path.display());
        }
        return Ok(());
    }

    let engine = registry.create(&config.extraction.engine, &config)?;
    let reporter = Arc::new(BarReporter::new()?);
    let processor = DirectoryProcessor::from_config(engine, &config).with_reporter(reporter.clone());

    let summary = processor.process_plan(&plan).await;
    reporter.bar.finish_with_message("Complete");

    if let Some(path) = &args.summary {
        write_summary(path, &summary)?;
        println!("{} Summary written to {}", style("✓").green(), path.display());
    }

    print_summary(&summary);
    Ok(())
}

fn print_summary(summary: &ProcessingSummary) {
    println!();
    println!("{}", render_summary(summary));
}

fn render_summary(summary: &ProcessingSummary) -> String {
    let mut lines = vec![
        format!(
            "{} Processed {} images in {}",
            style("✓").green(),
            summary.total,
            format_duration(summary.elapsed)
        ),
        format!("   Started {}", summary.started_at.format("%Y-%m-%d %H:%M:%S UTC")),
        format!(
            "   {} successful, {} failed ({:.1}% success)",
            style(summary.processed).green(),
            style(summary.failed).red(),
            summary.success_rate()
        ),
    ];

    let failures: Vec<_> = summary.failures().collect();
    if !failures.is_empty() {
        lines.push(String::new());
        lines.push(style("Failed files:").red().to_string());
        for (path, error) in failures {
            lines.push(format!("  - {}: {}", path.display(), error));
        }
    }
    lines.join("\n")
}

fn write_summary(path: &Path, summary: &ProcessingSummary) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record(["filename", "status", "promo", "processing_time_ms", "error"])?;

    for item in &summary.items {
        let filename = item.path.display().to_string();
        let time_ms = item.elapsed.as_millis().to_string();
        match &item.outcome {
            ItemOutcome::Saved { promo } => {
                wtr.write_record([filename.as_str(), "success", promo.as_str(), time_ms.as_str(), ""])?;
            }
            ItemOutcome::Failed { error } => {
                wtr.write_record([filename.as_str(), "error", "", time_ms.as_str(), error.as_str()])?;
            }
        }
    }

    wtr.flush()?;
    Ok(())
}
