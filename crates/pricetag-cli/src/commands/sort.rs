//! Sort command - bucket images by OCR text rules.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use console::style;

use pricetag_core::{FileSorter, TesseractExtractor, TransferMode};

use super::{data_dir, load_config};

/// Arguments for the sort command.
#[derive(Args)]
pub struct SortArgs {
    /// Directory whose top-level images are sorted (default: configured data_dir)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Output root for the promo buckets (default: <data_dir>/sorted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Tesseract language (default: configured language)
    #[arg(long)]
    lang: Option<String>,

    /// Move files instead of copying them
    #[arg(long = "move")]
    move_files: bool,

    /// Do not cache OCR text under _ocr_text
    #[arg(long)]
    no_dump_text: bool,
}

pub async fn run(args: SortArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(lang) = args.lang {
        config.ocr.language = lang;
    }
    if args.no_dump_text {
        config.ocr.dump_text = false;
    }

    let input = data_dir(args.data_dir, &config);
    let output = args.output.unwrap_or_else(|| input.join("sorted"));

    let extractor = Arc::new(TesseractExtractor::from_config(&config.ocr));
    let sorter = FileSorter::from_config(extractor, &config.processing, &config.ocr)
        .with_mode(TransferMode::from_move_flag(args.move_files));

    // OCR and file copies are blocking work.
    let (summary, output) =
        tokio::task::spawn_blocking(move || sorter.sort_files(&input, &output).map(|s| (s, output))).await??;

    println!(
        "{} Processed {} images (pre-skipped {}). Copied {}, moved {}, skipped {}. Unknown: {}. Failed: {}.",
        style("✓").green(),
        summary.processed,
        summary.pre_skipped,
        summary.copied,
        summary.moved,
        summary.skipped,
        style(summary.unknown).yellow(),
        style(summary.failed).red()
    );
    println!("   Output: {}", output.display());
    Ok(())
}
