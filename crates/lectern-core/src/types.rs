//! Core domain types for Lectern.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A unit of work for the ingestion workers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    /// Ingest the file at this absolute path.
    Ingest(PathBuf),
    /// Sentinel: the worker that takes it exits its loop.
    Stop,
}

impl Task {
    pub fn is_sentinel(&self) -> bool {
        matches!(self, Task::Stop)
    }
}

/// Performs the actual document learning (parsing, embedding, storage).
///
/// Implementations are shared between all workers of a pool, so they must be
/// safe to call concurrently. A sink that is not should be paired with a
/// single-worker pool.
pub trait IngestionSink: Send + Sync {
    /// Ingest and index a batch of files.
    fn learn(&self, paths: &[PathBuf]) -> crate::Result<()>;

    /// Whether the sink knows how to ingest this file. Pure check on the name.
    fn is_supported(&self, path: &Path) -> bool;
}

/// What a worker does when the sink fails on a task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Log the failure, record the path as a dead letter and keep the worker alive.
    #[default]
    Isolate,
    /// Let the failure end the worker. Pool capacity shrinks by one per failure.
    Terminate,
}

impl FailurePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailurePolicy::Isolate => "isolate",
            FailurePolicy::Terminate => "terminate",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "isolate" => Some(FailurePolicy::Isolate),
            "terminate" => Some(FailurePolicy::Terminate),
            _ => None,
        }
    }
}

impl std::fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel() {
        assert!(!Task::Ingest(PathBuf::from("/data/a.pdf")).is_sentinel());
        assert!(Task::Stop.is_sentinel());
    }

    #[test]
    fn test_failure_policy_from_str() {
        assert_eq!(FailurePolicy::from_str("isolate"), Some(FailurePolicy::Isolate));
        assert_eq!(FailurePolicy::from_str("TERMINATE"), Some(FailurePolicy::Terminate));
        assert_eq!(FailurePolicy::from_str("retry"), None);
        assert_eq!(FailurePolicy::default(), FailurePolicy::Isolate);
    }

    #[test]
    fn test_failure_policy_serde() {
        #[derive(Deserialize)]
        struct Wrapper {
            policy: FailurePolicy,
        }

        let parsed: Wrapper = toml::from_str(r#"policy = "terminate""#).unwrap();
        assert_eq!(parsed.policy, FailurePolicy::Terminate);
    }
}
