//! aiov2_ctl - Main entry point
//!
//! Switches the AIO v2 board's GPS, LoRa, SDR and USB features and reports
//! power use, from the command line or the system tray.

use aiov2_ctl_lib::cli;
use aiov2_ctl_lib::core::Config;
use std::process::ExitCode;

fn main() -> ExitCode {
    let loaded = Config::load();

    // Initialize logging; RUST_LOG overrides the configured level
    let level = match &loaded {
        Ok(config) => config.general.log_level.clone(),
        Err(_) => Config::default().general.log_level,
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    log::info!("Starting aiov2_ctl v{}", env!("CARGO_PKG_VERSION"));

    let config = loaded.unwrap_or_else(|e| {
        log::warn!("Failed to load config, using defaults: {}", e);
        Config::default()
    });

    cli::run(std::env::args_os(), config)
}
