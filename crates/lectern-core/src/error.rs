//! Error types for Lectern.

use thiserror::Error;

/// Core error type, returned by ingestion sinks.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Sink error: {0}")]
    Sink(String),
}

/// Result type alias using Lectern's Error.
pub type Result<T> = std::result::Result<T, Error>;
