//! Lectern Ingest - Continuous ingestion pipeline.
//!
//! This crate provides:
//! - A FIFO task queue with completion tracking
//! - A fixed-size worker pool feeding an [`IngestionSink`](lectern_core::IngestionSink)
//! - Recursive file system watching and event filtering
//! - A supervisor that runs the whole pipeline and drains it on shutdown

mod error;
mod events;
mod handler;
mod pool;
mod queue;
mod scan;
mod supervisor;
mod watcher;

#[cfg(test)]
mod testing;

pub use error::{IngestError, IngestResult};
pub use events::{EventSink, PipelineEvent, TracingEvents};
pub use handler::{absolutize, ChangeHandler, FsEvent};
pub use pool::{DeadLetter, PoolConfig, PoolState, Submitter, WorkerPool};
pub use queue::TaskQueue;
pub use scan::scan_directory;
pub use supervisor::{RunReport, RunState, Supervisor};
pub use watcher::{NotifyWatchHandle, NotifyWatchService, WatchHandle, WatchService};
