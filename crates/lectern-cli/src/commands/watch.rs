//! Continuous ingestion of a watched directory.

use super::{build_sink, load_config};
use anyhow::{Context, Result};
use colored::Colorize;
use lectern_core::FailurePolicy;
use lectern_ingest::{PoolConfig, RunReport, Supervisor};
use std::path::Path;
use std::sync::Arc;
use tokio::runtime::Runtime;

/// Command-line overrides for the `[pipeline]` config section.
#[derive(Debug, Default)]
pub struct WatchOptions {
    pub workers: Option<usize>,
    pub policy: Option<String>,
    pub coalesce: bool,
    pub scan: bool,
}

pub fn run(path: &Path, options: WatchOptions) -> Result<()> {
    let (config, paths) = load_config()?;

    let mut pipeline = config.pipeline.clone();
    if let Some(workers) = options.workers {
        if workers == 0 {
            anyhow::bail!("--workers must be at least 1");
        }
        pipeline.workers = workers;
    }
    if let Some(policy) = &options.policy {
        pipeline.failure_policy = FailurePolicy::from_str(policy)
            .with_context(|| format!("Invalid failure policy: {}", policy))?;
    }
    pipeline.coalesce |= options.coalesce;
    pipeline.initial_scan |= options.scan;

    if !path.is_dir() {
        anyhow::bail!("Directory does not exist: {}", path.display());
    }

    let sink = build_sink(&config)?;

    println!(
        "{} {} with {} worker(s), failure policy: {}",
        "Watching".cyan().bold(),
        path.display(),
        pipeline.workers,
        pipeline.failure_policy
    );
    println!("Press Ctrl+C to stop.");
    println!();

    let rt = Runtime::new().context("Failed to create async runtime")?;
    let report = rt.block_on(async {
        let mut supervisor = Supervisor::new(Arc::new(sink), PoolConfig::from_config(&pipeline))
            .with_initial_scan(pipeline.initial_scan)
            .with_index_path(&paths.index_file);
        supervisor.run_until_ctrl_c(path).await
    })?;

    print_report(&report);

    Ok(())
}

fn print_report(report: &RunReport) {
    println!();
    println!("{}", "Stopped".cyan().bold());
    println!("  Learned: {}", report.processed);

    if report.dead_letters.is_empty() {
        return;
    }

    println!(
        "  {} {}",
        "Failed:".red().bold(),
        report.dead_letters.len()
    );
    for letter in &report.dead_letters {
        println!(
            "    {} {} ({})",
            letter.failed_at.format("%H:%M:%S"),
            letter.path.display(),
            letter.error
        );
    }
}
