//! CLI application for price-tag promotion labelling.

mod commands;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use console::style;
use tracing_subscriber::EnvFilter;

use commands::{config, convert, engines, filter, process, revalidate, sort, validate};

/// Exit code reported after Ctrl-C.
const EXIT_INTERRUPTED: u8 = 130;

/// Price-tag labelling - extract promotion labels from shelf-tag photos
#[derive(Parser)]
#[command(name = "pricetag")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Label every unlabelled image under the data directory
    Process(process::ProcessArgs),

    /// Sort images into promo folders using local OCR
    Sort(sort::SortArgs),

    /// Export labels as a JSONL training set
    Convert(convert::ConvertArgs),

    /// Copy or move only images that have a label
    Filter(filter::FilterArgs),

    /// Review existing labels against their images
    Revalidate(revalidate::RevalidateArgs),

    /// Check one label file against the schema
    Validate(validate::ValidateArgs),

    /// List available label engines
    Engines,

    /// Manage configuration
    Config(config::ConfigArgs),
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    // RUST_LOG wins when set.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Top-level message followed by every cause not already spelled out in it.
fn render_error(error: &anyhow::Error) -> String {
    let mut message = error.to_string();
    for cause in error.chain().skip(1) {
        let cause = cause.to_string();
        if !message.ends_with(&cause) {
            message.push_str(": ");
            message.push_str(&cause);
        }
    }
    message
}

async fn execute(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Process(args) => process::run(args, config_path).await,
        Commands::Sort(args) => sort::run(args, config_path).await,
        Commands::Convert(args) => convert::run(args, config_path).await,
        Commands::Filter(args) => filter::run(args, config_path).await,
        Commands::Revalidate(args) => revalidate::run(args, config_path).await,
        Commands::Validate(args) => validate::run(args, config_path).await,
        Commands::Engines => engines::run(config_path).await,
        Commands::Config(args) => config::run(args, config_path).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    tokio::select! {
        result = execute(cli) => match result {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("{} {}", style("✗").red(), render_error(&e));
                ExitCode::FAILURE
            }
        },
        _ = tokio::signal::ctrl_c() => {
            eprintln!("{} interrupted", style("✗").yellow());
            ExitCode::from(EXIT_INTERRUPTED)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;
    use pricetag_core::{PricetagError, VisionError};

    #[test]
    fn test_render_error_does_not_repeat_causes() {
        let err: PricetagError = VisionError::MissingCredentials("OPENAI_API_KEY not set".into()).into();
        let err = anyhow::Error::from(err);
        assert_eq!(
            render_error(&err),
            "extraction service error: missing credentials: OPENAI_API_KEY not set"
        );
    }

    #[test]
    fn test_render_error_keeps_context_chain() {
        let err = Err::<(), _>(std::io::Error::other("disk gone"))
            .context("Failed to read tag.json")
            .unwrap_err();
        assert_eq!(render_error(&err), "Failed to read tag.json: disk gone");
    }
}
