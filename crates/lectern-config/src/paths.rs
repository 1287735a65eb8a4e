//! Application paths management.

use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// File name of the (currently inert) incremental index database.
const INDEX_FILE_NAME: &str = "index.db";

/// Manages all application paths following platform conventions.
#[derive(Debug, Clone)]
pub struct AppPaths {
    pub config_dir: PathBuf,
    pub data_dir: PathBuf,
    pub config_file: PathBuf,
    pub index_file: PathBuf,
}

impl AppPaths {
    /// Create paths using platform-specific directories.
    pub fn new() -> Option<Self> {
        let proj_dirs = ProjectDirs::from("com", "lectern", "lectern")?;

        let config_dir = proj_dirs.config_dir().to_path_buf();
        let data_dir = proj_dirs.data_dir().to_path_buf();

        Some(Self {
            config_file: config_dir.join("config.toml"),
            index_file: data_dir.join(INDEX_FILE_NAME),
            config_dir,
            data_dir,
        })
    }

    /// Relocate the data directory (and everything stored under it).
    pub fn with_data_dir(mut self, data_dir: impl AsRef<Path>) -> Self {
        self.data_dir = data_dir.as_ref().to_path_buf();
        self.index_file = self.data_dir.join(INDEX_FILE_NAME);
        self
    }

    /// Create all necessary directories.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.config_dir)?;
        std::fs::create_dir_all(&self.data_dir)?;
        Ok(())
    }

    /// Check if lectern has been initialized.
    pub fn is_initialized(&self) -> bool {
        self.config_file.exists()
    }
}
