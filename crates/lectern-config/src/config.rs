//! Configuration structures and loading.

use crate::error::{ConfigError, ConfigResult};
use crate::paths::AppPaths;
use lectern_core::FailurePolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub sink: SinkConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> ConfigResult<Self> {
        let paths = AppPaths::new().ok_or(ConfigError::NoConfigDir)?;
        Self::load_from(&paths.config_file)
    }

    /// Load configuration from a specific path.
    ///
    /// A missing file yields the defaults.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> ConfigResult<()> {
        let contents = toml::to_string_pretty(self)?;
        write_file(path, &contents)
    }

    /// Create a default config file with comments.
    pub fn create_default_file(path: &Path) -> ConfigResult<()> {
        write_file(path, &Self::default_config_string())
    }

    /// Generate a default config file with helpful comments.
    pub fn default_config_string() -> String {
        r#"# Lectern Configuration
# Continuous document ingestion into your knowledge store

[general]
# Data directory (holds index.db)
# data_dir = "~/.local/share/lectern"

[sink]
# Program that learns documents. File paths are appended as arguments.
command = ["ollama-rag", "learn"]

# File extensions the learner accepts
extensions = ["pdf"]

[pipeline]
# Number of concurrent ingestion workers. Use 1 if the learner
# cannot handle concurrent invocations.
workers = 3

# What a worker does when learning a file fails:
#   "isolate"   - log it, record the file, keep the worker running
#   "terminate" - the worker exits (pool shrinks by one)
failure_policy = "isolate"

# Drop repeated modifications of a file that is still waiting in the queue
coalesce = false

# Queue every supported file under the watched directory on startup
initial_scan = false
"#
        .to_string()
    }

    /// Check values that serde cannot.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.pipeline.workers == 0 {
            return Err(ConfigError::Invalid(
                "pipeline.workers must be at least 1".to_string(),
            ));
        }
        if self.sink.command.is_empty() {
            return Err(ConfigError::Invalid("sink.command must not be empty".to_string()));
        }
        Ok(())
    }

    /// Application paths with the configured data directory applied.
    pub fn resolve_paths(&self, paths: AppPaths) -> AppPaths {
        match &self.general.data_dir {
            Some(dir) => paths.with_data_dir(expand_path(dir)),
            None => paths,
        }
    }
}

/// Write `contents` to `path`, creating parent directories.
fn write_file(path: &Path, contents: &str) -> ConfigResult<()> {
    let write_error = |source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(write_error)?;
    }
    std::fs::write(path, contents).map_err(write_error)
}

/// Expand a leading `~` in a configured path.
pub fn expand_path(path: &str) -> PathBuf {
    let expanded = shellexpand::tilde(path);
    PathBuf::from(expanded.as_ref())
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    pub data_dir: Option<String>,
}

/// External learner settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    pub command: Vec<String>,
    pub extensions: Vec<String>,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            command: vec!["ollama-rag".to_string(), "learn".to_string()],
            extensions: vec!["pdf".to_string()],
        }
    }
}

/// Ingestion pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub workers: usize,
    pub failure_policy: FailurePolicy,
    pub coalesce: bool,
    pub initial_scan: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: 3,
            failure_policy: FailurePolicy::Isolate,
            coalesce: false,
            initial_scan: false,
        }
    }
}
