//! Structured pipeline events and the sink they are reported to.
//!
//! Pipeline components never log directly. They emit [`PipelineEvent`]s into an
//! injected [`EventSink`], which by default forwards them to `tracing`.

use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

/// Something that happened inside the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    PoolStarted { workers: usize },
    PoolStopping { workers: usize },
    PoolStopped,
    WorkerExited { worker: usize },
    WorkerAborted { worker: usize, error: String },
    TaskQueued { path: PathBuf },
    TaskCoalesced { path: PathBuf },
    TaskStarted { worker: usize, path: PathBuf },
    TaskFinished { worker: usize, path: PathBuf, elapsed: Duration },
    /// The sink failed and the worker carries on.
    TaskFailed { worker: usize, path: PathBuf, error: String },
    /// The sink failed and the worker exits because of it.
    WorkerDied { worker: usize, path: PathBuf, error: String },
    EventIgnored { path: PathBuf, reason: &'static str },
    SubmitRejected { path: PathBuf, error: String },
    WatchStarted { root: PathBuf },
    WatchError { error: String },
    WatchStopped { root: PathBuf },
    ScanQueued { root: PathBuf, files: usize },
    ScanCancelled { root: PathBuf },
    IndexInactive { path: PathBuf },
    Interrupted,
    Draining { pending: usize },
    Drained,
}

impl PipelineEvent {
    /// Severity this event is reported at.
    pub fn level(&self) -> Level {
        match self {
            PipelineEvent::TaskQueued { .. }
            | PipelineEvent::TaskCoalesced { .. }
            | PipelineEvent::TaskStarted { .. }
            | PipelineEvent::EventIgnored { .. }
            | PipelineEvent::WorkerExited { .. }
            | PipelineEvent::IndexInactive { .. } => Level::DEBUG,
            PipelineEvent::TaskFailed { .. }
            | PipelineEvent::WorkerDied { .. }
            | PipelineEvent::WorkerAborted { .. }
            | PipelineEvent::SubmitRejected { .. }
            | PipelineEvent::WatchError { .. }
            | PipelineEvent::ScanCancelled { .. }
            | PipelineEvent::Interrupted
            | PipelineEvent::Draining { .. }
            | PipelineEvent::PoolStopping { .. } => Level::WARN,
            _ => Level::INFO,
        }
    }
}

impl std::fmt::Display for PipelineEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineEvent::PoolStarted { workers } => {
                write!(f, "Started {} learner worker(s)", workers)
            }
            PipelineEvent::PoolStopping { workers } => {
                write!(f, "Stopping {} learner worker(s)...", workers)
            }
            PipelineEvent::PoolStopped => write!(f, "All learner workers stopped"),
            PipelineEvent::WorkerExited { worker } => write!(f, "Worker {} exited", worker),
            PipelineEvent::WorkerAborted { worker, error } => {
                write!(f, "Worker {} aborted: {}", worker, error)
            }
            PipelineEvent::TaskQueued { path } => {
                write!(f, "Added {} to learning queue", path.display())
            }
            PipelineEvent::TaskCoalesced { path } => {
                write!(f, "{} is already queued, skipping", path.display())
            }
            PipelineEvent::TaskStarted { worker, path } => {
                write!(f, "Worker {} learning {}", worker, path.display())
            }
            PipelineEvent::TaskFinished {
                worker,
                path,
                elapsed,
            } => write!(
                f,
                "Worker {} learned {} in {:?}",
                worker,
                path.display(),
                elapsed
            ),
            PipelineEvent::TaskFailed {
                worker,
                path,
                error,
            } => write!(
                f,
                "Worker {} failed to learn {}: {}",
                worker,
                path.display(),
                error
            ),
            PipelineEvent::WorkerDied {
                worker,
                path,
                error,
            } => write!(
                f,
                "Worker {} exiting after failing to learn {}: {}",
                worker,
                path.display(),
                error
            ),
            PipelineEvent::EventIgnored { path, reason } => {
                write!(f, "Ignoring event for {} ({})", path.display(), reason)
            }
            PipelineEvent::SubmitRejected { path, error } => {
                write!(f, "Could not queue {}: {}", path.display(), error)
            }
            PipelineEvent::WatchStarted { root } => {
                write!(f, "Watching {}", root.display())
            }
            PipelineEvent::WatchError { error } => write!(f, "Watch error: {}", error),
            PipelineEvent::WatchStopped { root } => {
                write!(f, "Stopped watching {}", root.display())
            }
            PipelineEvent::ScanQueued { root, files } => {
                write!(f, "Initial scan of {} queued {} file(s)", root.display(), files)
            }
            PipelineEvent::ScanCancelled { root } => {
                write!(f, "Initial scan of {} cancelled", root.display())
            }
            PipelineEvent::IndexInactive { path } => {
                write!(f, "Index database {} is not used yet", path.display())
            }
            PipelineEvent::Interrupted => write!(f, "Interrupted, stopping continuous learner..."),
            PipelineEvent::Draining { pending } => {
                write!(f, "Waiting for {} learning task(s) to complete...", pending)
            }
            PipelineEvent::Drained => write!(f, "Learning tasks finished"),
        }
    }
}

/// Receives pipeline events.
///
/// `emit` routes each event to the method matching its [`PipelineEvent::level`].
pub trait EventSink: Send + Sync {
    fn debug(&self, event: &PipelineEvent);
    fn info(&self, event: &PipelineEvent);
    fn warn(&self, event: &PipelineEvent);

    fn emit(&self, event: PipelineEvent) {
        let level = event.level();
        if level == Level::WARN || level == Level::ERROR {
            self.warn(&event);
        } else if level == Level::INFO {
            self.info(&event);
        } else {
            self.debug(&event);
        }
    }
}

/// Default sink: forwards every event to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEvents;

impl EventSink for TracingEvents {
    fn debug(&self, event: &PipelineEvent) {
        tracing::debug!("{}", event);
    }

    fn info(&self, event: &PipelineEvent) {
        tracing::info!("{}", event);
    }

    fn warn(&self, event: &PipelineEvent) {
        tracing::warn!("{}", event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingEvents;

    #[test]
    fn test_levels() {
        assert_eq!(
            PipelineEvent::TaskQueued {
                path: PathBuf::from("/a")
            }
            .level(),
            Level::DEBUG
        );
        assert_eq!(PipelineEvent::Drained.level(), Level::INFO);
        assert_eq!(
            PipelineEvent::TaskFailed {
                worker: 0,
                path: PathBuf::from("/a"),
                error: "boom".to_string()
            }
            .level(),
            Level::WARN
        );
    }

    #[test]
    fn test_emit_routes_by_level() {
        let events = RecordingEvents::default();
        events.emit(PipelineEvent::Drained);
        events.emit(PipelineEvent::Interrupted);
        events.emit(PipelineEvent::WorkerExited { worker: 2 });

        assert_eq!(events.levels(), vec![Level::INFO, Level::WARN, Level::DEBUG]);
    }

    #[test]
    fn test_display() {
        let event = PipelineEvent::TaskFinished {
            worker: 1,
            path: PathBuf::from("/data/a.pdf"),
            elapsed: Duration::from_millis(5),
        };
        assert_eq!(event.to_string(), "Worker 1 learned /data/a.pdf in 5ms");
    }
}
