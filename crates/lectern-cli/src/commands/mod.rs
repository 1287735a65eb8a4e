//! CLI command implementations.

pub mod config;
pub mod init;
pub mod learn;
pub mod watch;

use crate::sink::CommandSink;
use anyhow::{Context, Result};
use colored::Colorize;
use lectern_config::{AppPaths, Config};

/// Get the application paths.
pub fn get_paths() -> Result<AppPaths> {
    AppPaths::new().context("Failed to determine application directories")
}

/// Load the configuration and the paths it resolves to.
pub fn load_config() -> Result<(Config, AppPaths)> {
    let config = Config::load().context("Failed to load config")?;
    let paths = config.resolve_paths(get_paths()?);
    Ok((config, paths))
}

/// Build the learn sink, warning if its program is not installed.
pub fn build_sink(config: &Config) -> Result<CommandSink> {
    let sink = CommandSink::from_config(&config.sink).context("Invalid [sink] configuration")?;

    if !sink.is_available() {
        eprintln!(
            "{} {} not found in PATH; every file will fail to learn.",
            "Warning:".yellow().bold(),
            sink.program()
        );
    }

    Ok(sink)
}
