//! Revalidate command - review existing labels against their images.

use std::path::PathBuf;

use clap::Args;
use console::style;

use pricetag_core::processing::ImageDiscovery;
use pricetag_core::{EngineRegistry, Revalidator, Validator};

use super::{data_dir, load_config};

/// Arguments for the revalidate command.
#[derive(Args)]
pub struct RevalidateArgs {
    /// Root directory with labelled images (default: configured data_dir)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Label engine to use (default: configured engine)
    #[arg(short, long)]
    engine: Option<String>,

    /// Report decisions without modifying or deleting files
    #[arg(long)]
    dry_run: bool,
}

pub async fn run(args: RevalidateArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(engine) = args.engine {
        config.extraction.engine = engine;
    }
    let root = data_dir(args.data_dir, &config);

    let engine = EngineRegistry::with_defaults().create(&config.extraction.engine, &config)?;
    let revalidator = Revalidator::new(engine, Validator::new(config.extraction.schema))
        .with_discovery(ImageDiscovery::from_config(&config.processing))
        .dry_run(args.dry_run);

    if args.dry_run {
        println!("{} Dry run: no file will be changed.", style("ℹ").blue());
    }

    let summary = revalidator.revalidate_directory(&root).await?;

    println!(
        "{} Checked {} labels: {} unchanged, {} updated",
        style("✓").green(),
        summary.checked,
        summary.unchanged,
        style(summary.updated).cyan()
    );
    println!(
        "   Deleted {} invalid and {} without promotion. Errors: {}. Orphans: {}.",
        style(summary.deleted_invalid).yellow(),
        style(summary.deleted_none).yellow(),
        style(summary.errors).red(),
        summary.orphans
    );
    Ok(())
}
