//! Lifecycle of one continuous ingestion run.

use crate::error::{IngestError, IngestResult};
use crate::events::{EventSink, PipelineEvent, TracingEvents};
use crate::handler::{absolutize, ChangeHandler};
use crate::pool::{DeadLetter, PoolConfig, WorkerPool};
use crate::scan::scan_directory;
use crate::watcher::{NotifyWatchService, WatchHandle, WatchService};
use lectern_core::IngestionSink;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Where a [`Supervisor`] is in its single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Watching,
    Draining,
    Stopped,
}

/// Outcome of a completed run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Files the sink learned successfully.
    pub processed: usize,
    /// Files whose ingestion failed while their worker kept running.
    pub dead_letters: Vec<DeadLetter>,
}

/// Watches a directory tree and feeds modified files through a worker pool
/// until told to shut down, then drains the queue and stops the pool.
///
/// A supervisor runs once. Every task queued before the watch is stopped is
/// processed before [`Supervisor::run`] returns.
pub struct Supervisor<W: WatchService> {
    sink: Arc<dyn IngestionSink>,
    watch: W,
    config: PoolConfig,
    events: Arc<dyn EventSink>,
    initial_scan: bool,
    index_path: Option<PathBuf>,
    state: RunState,
}

impl Supervisor<NotifyWatchService> {
    /// Supervisor using the native file watcher and `tracing` for events.
    pub fn new(sink: Arc<dyn IngestionSink>, config: PoolConfig) -> Self {
        let events: Arc<dyn EventSink> = Arc::new(TracingEvents);
        let watch = NotifyWatchService::new(Arc::clone(&events));
        Self::with_watch(sink, config, watch, events)
    }
}

impl<W: WatchService> Supervisor<W> {
    pub fn with_watch(
        sink: Arc<dyn IngestionSink>,
        config: PoolConfig,
        watch: W,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            sink,
            watch,
            config,
            events,
            initial_scan: false,
            index_path: None,
            state: RunState::Idle,
        }
    }

    /// Queue every supported file under the root once the watch is active.
    pub fn with_initial_scan(mut self, enabled: bool) -> Self {
        self.initial_scan = enabled;
        self
    }

    /// Location of the incremental index. Accepted but not read or written yet.
    pub fn with_index_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.index_path = Some(path.into());
        self
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Run until Ctrl-C is received.
    ///
    /// The interrupt handler is installed before the pipeline starts, so an
    /// interrupt during startup or the initial scan still drains the queue.
    pub async fn run_until_ctrl_c(&mut self, root: &Path) -> IngestResult<RunReport> {
        let interrupted = listen_for_interrupt()?;
        self.run(root, interrupted).await
    }

    /// Watch `root` until `shutdown` resolves, then drain and stop.
    pub async fn run<F>(&mut self, root: &Path, shutdown: F) -> IngestResult<RunReport>
    where
        F: Future<Output = ()>,
    {
        if self.state != RunState::Idle {
            return Err(IngestError::AlreadyRun);
        }
        tokio::pin!(shutdown);

        if let Some(path) = &self.index_path {
            self.events
                .emit(PipelineEvent::IndexInactive { path: path.clone() });
        }

        let mut pool = WorkerPool::new(
            Arc::clone(&self.sink),
            self.config.clone(),
            Arc::clone(&self.events),
        );
        pool.start()?;

        let handler = ChangeHandler::new(pool.submitter(), Arc::clone(&self.events));
        let handle = match self.watch.register(root, true, handler) {
            Ok(handle) => handle,
            Err(e) => {
                pool.stop().await?;
                self.state = RunState::Stopped;
                return Err(e);
            }
        };
        let watched = handle.root().to_path_buf();
        self.state = RunState::Watching;
        self.events.emit(PipelineEvent::WatchStarted {
            root: watched.clone(),
        });

        let mut interrupted = false;
        if self.initial_scan {
            let scan = scan_in_background(Arc::clone(&self.sink), watched.clone());
            let scanned = tokio::select! {
                biased;
                _ = shutdown.as_mut() => None,
                files = scan => Some(files),
            };

            match scanned {
                Some(files) => {
                    let queued = files.and_then(|files| self.queue_scanned(&watched, files, &pool));
                    if let Err(e) = queued {
                        // Tear down in the same order as a normal shutdown.
                        self.state = RunState::Draining;
                        let _ = stop_watch(handle).await;
                        let _ = pool.wait_for_completion().await;
                        pool.stop().await?;
                        self.state = RunState::Stopped;
                        return Err(e);
                    }
                }
                None => {
                    interrupted = true;
                    self.events.emit(PipelineEvent::ScanCancelled {
                        root: watched.clone(),
                    });
                }
            }
        }

        if !interrupted {
            shutdown.as_mut().await;
        }
        self.events.emit(PipelineEvent::Interrupted);

        self.state = RunState::Draining;
        let watch_stopped = stop_watch(handle).await;
        if watch_stopped.is_ok() {
            self.events
                .emit(PipelineEvent::WatchStopped { root: watched });
        }
        let drained = pool.wait_for_completion().await;

        pool.stop().await?;
        self.state = RunState::Stopped;
        watch_stopped?;
        drained?;

        Ok(RunReport {
            processed: pool.processed(),
            dead_letters: pool.dead_letters(),
        })
    }

    fn queue_scanned(
        &self,
        root: &Path,
        files: Vec<PathBuf>,
        pool: &WorkerPool,
    ) -> IngestResult<()> {
        let count = files.len();
        for file in files {
            pool.add(absolutize(&file)?)?;
        }
        self.events.emit(PipelineEvent::ScanQueued {
            root: root.to_path_buf(),
            files: count,
        });
        Ok(())
    }
}

/// Install the Ctrl-C handler. It is active once this returns.
#[cfg(unix)]
fn listen_for_interrupt() -> std::io::Result<impl Future<Output = ()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt())?;
    Ok(async move {
        interrupt.recv().await;
    })
}

/// Install the Ctrl-C handler. It is active once this returns.
#[cfg(windows)]
fn listen_for_interrupt() -> std::io::Result<impl Future<Output = ()>> {
    let mut interrupt = tokio::signal::windows::ctrl_c()?;
    Ok(async move {
        interrupt.recv().await;
    })
}

/// Walk `root` for supported files on the blocking thread pool.
async fn scan_in_background(
    sink: Arc<dyn IngestionSink>,
    root: PathBuf,
) -> IngestResult<Vec<PathBuf>> {
    tokio::task::spawn_blocking(move || scan_directory(&root, sink.as_ref()))
        .await
        .map_err(|e| IngestError::Watch(format!("initial scan failed: {}", e)))?
}

/// Stop a watch without blocking the async runtime.
async fn stop_watch<H: WatchHandle>(handle: H) -> IngestResult<()> {
    tokio::task::spawn_blocking(move || handle.stop())
        .await
        .map_err(|e| IngestError::Watch(e.to_string()))?
}
