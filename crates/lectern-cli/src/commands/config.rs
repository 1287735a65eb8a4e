//! Configuration commands.

use super::get_paths;
use anyhow::{Context, Result};
use colored::Colorize;
use lectern_config::Config;
use lectern_core::FailurePolicy;

pub fn show() -> Result<()> {
    let paths = get_paths()?;

    if !paths.config_file.exists() {
        anyhow::bail!("Config file not found. Run 'lectern init' first.");
    }

    let contents =
        std::fs::read_to_string(&paths.config_file).context("Failed to read config file")?;

    println!("{}", "Current Configuration".cyan().bold());
    println!("{}", "─".repeat(50));
    println!("{}", contents);

    Ok(())
}

pub fn path() -> Result<()> {
    let paths = get_paths()?;
    println!("{}", paths.config_file.display());
    Ok(())
}

pub fn set(key: &str, value: &str) -> Result<()> {
    let paths = get_paths()?;

    let mut config = Config::load_from(&paths.config_file).context("Failed to load config")?;
    apply(&mut config, key, value)?;
    config.validate()?;

    config
        .save_to(&paths.config_file)
        .context("Failed to save config")?;

    println!("{} Set {} = {}", "✓".green(), key.cyan(), value);

    Ok(())
}

/// Apply a `section.key` assignment to `config`.
fn apply(config: &mut Config, key: &str, value: &str) -> Result<()> {
    let parts: Vec<&str> = key.split('.').collect();

    match parts.as_slice() {
        ["general", "data_dir"] => config.general.data_dir = Some(value.to_string()),
        ["sink", "command"] => {
            config.sink.command = value.split_whitespace().map(String::from).collect();
        }
        ["sink", "extensions"] => {
            config.sink.extensions = value
                .split(',')
                .map(|e| e.trim().to_string())
                .filter(|e| !e.is_empty())
                .collect();
        }
        ["pipeline", "workers"] => {
            config.pipeline.workers = value.parse().context("Invalid workers value")?;
        }
        ["pipeline", "failure_policy"] => {
            config.pipeline.failure_policy = FailurePolicy::from_str(value)
                .with_context(|| format!("Invalid failure policy: {}", value))?;
        }
        ["pipeline", "coalesce"] => {
            config.pipeline.coalesce = value.parse().context("Invalid boolean value")?;
        }
        ["pipeline", "initial_scan"] => {
            config.pipeline.initial_scan = value.parse().context("Invalid boolean value")?;
        }
        _ => {
            anyhow::bail!("Unknown config key: {}", key);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_pipeline_keys() {
        let mut config = Config::default();
        apply(&mut config, "pipeline.workers", "1").unwrap();
        apply(&mut config, "pipeline.failure_policy", "terminate").unwrap();
        apply(&mut config, "pipeline.coalesce", "true").unwrap();

        assert_eq!(config.pipeline.workers, 1);
        assert_eq!(config.pipeline.failure_policy, FailurePolicy::Terminate);
        assert!(config.pipeline.coalesce);
    }

    #[test]
    fn test_apply_sink_keys() {
        let mut config = Config::default();
        apply(&mut config, "sink.command", "rag-tool ingest --quiet").unwrap();
        apply(&mut config, "sink.extensions", "pdf, md,,txt").unwrap();

        assert_eq!(config.sink.command, vec!["rag-tool", "ingest", "--quiet"]);
        assert_eq!(config.sink.extensions, vec!["pdf", "md", "txt"]);
    }

    #[test]
    fn test_apply_rejects_bad_input() {
        let mut config = Config::default();
        assert!(apply(&mut config, "pipeline.workers", "many").is_err());
        assert!(apply(&mut config, "pipeline.failure_policy", "retry").is_err());
        assert!(apply(&mut config, "ollama.model", "x").is_err());
    }
}
