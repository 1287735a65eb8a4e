//! Initialize Lectern.

use super::get_paths;
use anyhow::{Context, Result};
use colored::Colorize;
use lectern_config::Config;

pub fn run() -> Result<()> {
    let paths = get_paths()?;

    // Check if already initialized
    if paths.is_initialized() {
        println!("{} Lectern is already initialized.", "Note:".yellow().bold());
        println!("  Config: {}", paths.config_file.display());
        println!("  Data: {}", paths.data_dir.display());
        return Ok(());
    }

    println!("{}", "Initializing Lectern...".cyan().bold());

    paths
        .ensure_dirs()
        .context("Failed to create directories")?;
    println!("  {} Created directories", "✓".green());

    Config::create_default_file(&paths.config_file).context("Failed to create config file")?;
    println!(
        "  {} Created config: {}",
        "✓".green(),
        paths.config_file.display()
    );

    println!();
    println!("{}", "Lectern initialized successfully!".green().bold());
    println!();
    println!("Next steps:");
    println!(
        "  1. Point it at your learner: {}",
        "lectern config set sink.command \"ollama-rag learn\"".cyan()
    );
    println!("  2. Start watching: {}", "lectern watch ~/Papers".cyan());

    Ok(())
}
