//! Lectern Core - Shared types and the ingestion sink contract.

mod error;
mod types;

pub use error::{Error, Result};
pub use types::*;
