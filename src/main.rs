// In src/main.rs

use anyhow::Context;
use laneflow::config::{Config, CONFIG, CONFIG_ENV};
use laneflow::harness::run_suite;
use log::info;

/// Runs the kernel suite with the configuration named by `LANEFLOW_CONFIG`,
/// or the path given as the first argument.
fn main() -> anyhow::Result<()> {
    // Default filter is "info" if RUST_LOG is not set.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_micros()
        .init();

    info!("Starting laneflow...");

    let config: Config = match std::env::args().nth(1) {
        Some(path) => Config::load(&path)
            .with_context(|| format!("Failed to load configuration from {}", path))?,
        None => {
            info!(
                "Configuration from {} (defaults if unset).",
                CONFIG_ENV
            );
            CONFIG.clone()
        }
    };

    let report = run_suite(&config).context("Scalar and vector kernels disagree")?;
    info!(
        "All kernels agree on the {} backend ({} comparisons).",
        report.backend,
        report.comparisons.len()
    );

    if config.report.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to encode report")?;
        println!("{}", json);
    }

    Ok(())
}
