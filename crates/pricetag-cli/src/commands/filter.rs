//! Filter command - keep only images that have a label.

use std::path::PathBuf;

use clap::Args;
use console::style;

use pricetag_core::processing::ImageDiscovery;
use pricetag_core::{PairFilter, TransferMode};

use super::{data_dir, load_config};

/// Arguments for the filter command.
#[derive(Args)]
pub struct FilterArgs {
    /// Source directory (default: configured data_dir)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Destination directory
    #[arg(short, long)]
    output: PathBuf,

    /// Move pairs instead of copying them
    #[arg(long = "move")]
    move_files: bool,
}

pub async fn run(args: FilterArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let source = data_dir(args.data_dir, &config);
    let mode = TransferMode::from_move_flag(args.move_files);

    let filter = PairFilter::new(ImageDiscovery::from_config(&config.processing));
    let summary = filter.filter(&source, &args.output, mode)?;

    println!(
        "{} {} {} images with JSON. Skipped (no JSON): {}. Failed: {}.",
        style("✓").green(),
        match mode {
            TransferMode::Copy => "Copied",
            TransferMode::Move => "Moved",
        },
        summary.transferred,
        summary.skipped,
        summary.failed
    );
    println!("   Output: {}", summary.output.display());
    Ok(())
}
