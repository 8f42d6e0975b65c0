//! Engines command - list registered label engines.

use console::style;

use pricetag_core::EngineRegistry;

use super::load_config;

pub async fn run(config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let registry = EngineRegistry::with_defaults();

    println!("{}", style("Available engines:").bold());
    for name in registry.list() {
        if name == config.extraction.engine {
            println!("  {} {} (active)", style("●").green(), name);
        } else {
            println!("  {} {}", style("○").dim(), name);
        }
    }

    if !registry.contains(&config.extraction.engine) {
        println!();
        println!(
            "{} Configured engine '{}' is not available",
            style("⚠").yellow(),
            config.extraction.engine
        );
    }
    Ok(())
}
