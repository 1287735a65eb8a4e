//! Error types for the ingestion pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for ingestion operations.
pub type IngestResult<T> = Result<T, IngestError>;

/// Errors that can occur in the ingestion pipeline.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Worker pool is not running")]
    NotRunning,

    #[error("Worker pool has been stopped and cannot be restarted")]
    PoolStopped,

    #[error("Failed to ingest {path}: {source}")]
    Ingestion {
        path: PathBuf,
        #[source]
        source: lectern_core::Error,
    },

    #[error("Ingestion worker panicked: {0}")]
    WorkerPanicked(String),

    #[error("All workers have exited with {pending} task(s) still pending")]
    PoolExhausted { pending: usize },

    #[error("Failed to watch {root}: {message}")]
    WatchSetup { root: PathBuf, message: String },

    #[error("Watch error: {0}")]
    Watch(String),

    #[error("Supervisor has already run")]
    AlreadyRun,
}
