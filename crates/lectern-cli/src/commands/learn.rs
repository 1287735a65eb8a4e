//! One-shot learning of specific files.

use super::{build_sink, load_config};
use anyhow::{Context, Result};
use colored::Colorize;
use lectern_core::IngestionSink;
use lectern_ingest::absolutize;
use std::path::PathBuf;

pub fn run(files: &[PathBuf]) -> Result<()> {
    let (config, _) = load_config()?;
    let sink = build_sink(&config)?;

    let mut supported = Vec::new();
    for file in files {
        if !file.is_file() {
            println!("{} Not a file: {}", "Skip:".yellow(), file.display());
            continue;
        }
        if !sink.is_supported(file) {
            println!("{} Unsupported type: {}", "Skip:".yellow(), file.display());
            continue;
        }
        supported.push(absolutize(file).context("Failed to resolve path")?);
    }

    if supported.is_empty() {
        anyhow::bail!("No supported files to learn");
    }

    println!(
        "{} {} file(s)...",
        "Learning".cyan().bold(),
        supported.len()
    );
    sink.learn(&supported).context("Learning failed")?;

    for file in &supported {
        println!("  {} {}", "✓".green(), file.display());
    }

    Ok(())
}
