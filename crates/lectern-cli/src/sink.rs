//! Ingestion through an external learn program.

use lectern_config::SinkConfig;
use lectern_core::{Error, IngestionSink, Result};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Runs a configured program with the file paths appended as arguments.
#[derive(Debug, Clone)]
pub struct CommandSink {
    program: String,
    args: Vec<String>,
    extensions: Vec<String>,
}

impl CommandSink {
    pub fn new(command: &[String], extensions: &[String]) -> Result<Self> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| Error::Sink("learn command is empty".to_string()))?;

        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            extensions: extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_lowercase())
                .collect(),
        })
    }

    /// Create from config.
    pub fn from_config(config: &SinkConfig) -> Result<Self> {
        Self::new(&config.command, &config.extensions)
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Check if the learn program can be found.
    pub fn is_available(&self) -> bool {
        which::which(&self.program).is_ok()
    }
}

impl IngestionSink for CommandSink {
    fn learn(&self, paths: &[PathBuf]) -> Result<()> {
        let paths: Vec<&PathBuf> = paths
            .iter()
            .filter(|p| !p.as_os_str().is_empty() && self.is_supported(p))
            .collect();
        if paths.is_empty() {
            return Ok(());
        }

        if !self.is_available() {
            return Err(Error::Sink(format!("{} not found", self.program)));
        }

        debug!("Running {} on {} file(s)", self.program, paths.len());

        let output = Command::new(&self.program)
            .args(&self.args)
            .args(&paths)
            .output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Sink(format!(
                "{} exited with {}: {}",
                self.program,
                output
                    .status
                    .code()
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "signal".to_string()),
                stderr.trim()
            )));
        }

        Ok(())
    }

    fn is_supported(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|ext| {
                let ext = ext.to_lowercase();
                self.extensions.iter().any(|e| *e == ext)
            })
            .unwrap_or(false)
    }
}
