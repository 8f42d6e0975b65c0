//! Convert command - export labels as a JSONL training set.

use std::path::PathBuf;

use clap::Args;
use console::style;

use pricetag_core::JsonlExporter;

use super::{data_dir, load_config};

/// Arguments for the convert command.
#[derive(Args)]
pub struct ConvertArgs {
    /// Directory with image/label pairs (default: configured data_dir)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Output JSONL file
    #[arg(short, long, default_value = "training_data.jsonl")]
    output: PathBuf,

    /// Prefix written in front of each relative image path
    #[arg(long, default_value = "images")]
    image_prefix: String,
}

pub async fn run(args: ConvertArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let root = data_dir(args.data_dir, &config);

    let summary = JsonlExporter::new(args.image_prefix).export(&root, &args.output)?;

    println!(
        "{} Exported {} records to {}",
        style("✓").green(),
        summary.processed,
        summary.output.display()
    );
    if summary.errors > 0 {
        println!("   {} labels skipped, see log for details", style(summary.errors).red());
    }
    Ok(())
}
