//! Subcommand implementations.

pub mod config;
pub mod convert;
pub mod engines;
pub mod filter;
pub mod process;
pub mod revalidate;
pub mod sort;
pub mod validate;

use std::path::{Path, PathBuf};

use anyhow::Context;
use pricetag_core::PricetagConfig;

/// `<config_dir>/pricetag/config.json`.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pricetag")
        .join("config.json")
}

/// Load the configuration used by every command.
///
/// An explicit `--config` file must exist; the default location falls back
/// to built-in defaults. Environment overrides are applied last.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<PricetagConfig> {
    let mut config = match config_path {
        Some(path) => PricetagConfig::from_file(Path::new(path))
            .with_context(|| format!("Failed to load config from {}", path))?,
        None => PricetagConfig::load_or_default(&default_config_path())?,
    };
    config.apply_env_overrides()?;
    Ok(config)
}

/// The `--data-dir` flag, or the configured data directory.
pub fn data_dir(flag: Option<PathBuf>, config: &PricetagConfig) -> PathBuf {
    flag.unwrap_or_else(|| config.processing.data_dir.clone())
}
