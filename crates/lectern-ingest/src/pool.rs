//! Fixed-size pool of ingestion workers.

use crate::error::{IngestError, IngestResult};
use crate::events::{EventSink, PipelineEvent};
use crate::queue::TaskQueue;
use chrono::{DateTime, Utc};
use lectern_core::{FailurePolicy, IngestionSink, Task};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Worker pool settings.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Number of concurrent workers.
    pub workers: usize,
    /// What a worker does when the sink fails.
    pub failure_policy: FailurePolicy,
    /// Drop submissions for paths that are already waiting in the queue.
    pub coalesce: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: 3,
            failure_policy: FailurePolicy::Isolate,
            coalesce: false,
        }
    }
}

impl PoolConfig {
    /// Create from config.
    pub fn from_config(config: &lectern_config::PipelineConfig) -> Self {
        Self {
            workers: config.workers.max(1),
            failure_policy: config.failure_policy,
            coalesce: config.coalesce,
        }
    }
}

/// Lifecycle of a [`WorkerPool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolState {
    NotStarted,
    Running,
    Stopped,
}

/// A path whose ingestion failed while the worker kept running.
#[derive(Debug, Clone)]
pub struct DeadLetter {
    pub path: PathBuf,
    pub error: String,
    pub failed_at: DateTime<Utc>,
}

/// State shared between the pool, its workers and its submitters.
struct Shared {
    queue: TaskQueue,
    state: Mutex<PoolState>,
    sink: Arc<dyn IngestionSink>,
    events: Arc<dyn EventSink>,
    policy: FailurePolicy,
    /// Paths submitted but not yet taken by a worker (coalescing only).
    queued: Option<Mutex<HashSet<PathBuf>>>,
    live: watch::Sender<usize>,
    processed: AtomicUsize,
    dead_letters: Mutex<Vec<DeadLetter>>,
}

impl Shared {
    fn add(&self, path: PathBuf) -> IngestResult<()> {
        // Held until the task is queued, so `stop` cannot slip its sentinels in ahead of it.
        let state = self.state.lock();
        if *state != PoolState::Running {
            return Err(IngestError::NotRunning);
        }

        if let Some(queued) = &self.queued {
            if !queued.lock().insert(path.clone()) {
                self.events.emit(PipelineEvent::TaskCoalesced { path });
                return Ok(());
            }
        }

        self.events.emit(PipelineEvent::TaskQueued { path: path.clone() });
        self.queue.submit(Task::Ingest(path));
        drop(state);
        Ok(())
    }

    /// The worker loop. Returns `Ok` on a sentinel, `Err` when a failure ends the worker.
    async fn work(&self, worker: usize) -> IngestResult<()> {
        loop {
            let path = match self.queue.take().await {
                Task::Ingest(path) => path,
                Task::Stop => return Ok(()),
            };

            if let Some(queued) = &self.queued {
                queued.lock().remove(&path);
            }

            self.events.emit(PipelineEvent::TaskStarted {
                worker,
                path: path.clone(),
            });
            let started = Instant::now();
            let outcome = self.learn(path.clone()).await;
            self.queue.mark_done();

            match outcome {
                Ok(()) => {
                    self.processed.fetch_add(1, Ordering::SeqCst);
                    self.events.emit(PipelineEvent::TaskFinished {
                        worker,
                        path,
                        elapsed: started.elapsed(),
                    });
                }
                Err(err) => match self.policy {
                    FailurePolicy::Isolate => {
                        self.events.emit(PipelineEvent::TaskFailed {
                            worker,
                            path: path.clone(),
                            error: err.to_string(),
                        });
                        self.dead_letters.lock().push(DeadLetter {
                            path,
                            error: err.to_string(),
                            failed_at: Utc::now(),
                        });
                    }
                    FailurePolicy::Terminate => {
                        self.events.emit(PipelineEvent::WorkerDied {
                            worker,
                            path,
                            error: err.to_string(),
                        });
                        return Err(err);
                    }
                },
            }
        }
    }

    /// Run the sink on the blocking thread pool.
    async fn learn(&self, path: PathBuf) -> IngestResult<()> {
        let sink = Arc::clone(&self.sink);
        let paths = vec![path.clone()];

        match tokio::task::spawn_blocking(move || sink.learn(&paths)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(source)) => Err(IngestError::Ingestion { path, source }),
            Err(e) => Err(IngestError::WorkerPanicked(e.to_string())),
        }
    }
}

async fn run_worker(worker: usize, shared: Arc<Shared>) -> IngestResult<()> {
    let result = shared.work(worker).await;
    shared.live.send_modify(|n| *n = n.saturating_sub(1));
    if result.is_ok() {
        shared.events.emit(PipelineEvent::WorkerExited { worker });
    }
    result
}

/// Cloneable handle for submitting paths to a pool from other threads.
#[derive(Clone)]
pub struct Submitter {
    shared: Arc<Shared>,
}

impl Submitter {
    /// Queue a path. Fails with [`IngestError::NotRunning`] unless the pool is running.
    pub fn add(&self, path: PathBuf) -> IngestResult<()> {
        self.shared.add(path)
    }
}

/// A fixed number of workers draining a [`TaskQueue`] into an [`IngestionSink`].
///
/// Workers are tokio tasks, so [`WorkerPool::start`] must be called from within
/// a runtime. The sink itself runs on the blocking thread pool.
pub struct WorkerPool {
    shared: Arc<Shared>,
    workers: usize,
    handles: Vec<JoinHandle<IngestResult<()>>>,
}

impl WorkerPool {
    /// Create a pool. No workers run until [`WorkerPool::start`].
    pub fn new(
        sink: Arc<dyn IngestionSink>,
        config: PoolConfig,
        events: Arc<dyn EventSink>,
    ) -> Self {
        let (live, _) = watch::channel(0);
        let shared = Shared {
            queue: TaskQueue::new(),
            state: Mutex::new(PoolState::NotStarted),
            sink,
            events,
            policy: config.failure_policy,
            queued: config.coalesce.then(|| Mutex::new(HashSet::new())),
            live,
            processed: AtomicUsize::new(0),
            dead_letters: Mutex::new(Vec::new()),
        };

        Self {
            shared: Arc::new(shared),
            workers: config.workers.max(1),
            handles: Vec::new(),
        }
    }

    /// Launch the workers. Calling this on a running pool does nothing.
    pub fn start(&mut self) -> IngestResult<()> {
        let mut state = self.shared.state.lock();
        match *state {
            PoolState::Running => return Ok(()),
            PoolState::Stopped => return Err(IngestError::PoolStopped),
            PoolState::NotStarted => {}
        }

        self.shared.live.send_modify(|n| *n += self.workers);
        for worker in 0..self.workers {
            let shared = Arc::clone(&self.shared);
            self.handles.push(tokio::spawn(run_worker(worker, shared)));
        }
        *state = PoolState::Running;
        drop(state);

        self.shared.events.emit(PipelineEvent::PoolStarted {
            workers: self.workers,
        });
        Ok(())
    }

    /// Queue a path for ingestion.
    pub fn add(&self, path: PathBuf) -> IngestResult<()> {
        self.shared.add(path)
    }

    /// Handle that can queue paths without borrowing the pool.
    pub fn submitter(&self) -> Submitter {
        Submitter {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Wait until every queued task has been processed.
    ///
    /// Fails with [`IngestError::PoolExhausted`] if all workers have died
    /// while tasks are still pending, since nothing could finish them.
    pub async fn wait_for_completion(&self) -> IngestResult<()> {
        let pending = self.shared.queue.pending();
        if pending > 0 {
            self.shared
                .events
                .emit(PipelineEvent::Draining { pending });
        }

        let mut live = self.shared.live.subscribe();
        tokio::select! {
            biased;
            _ = self.shared.queue.join() => {}
            _ = live.wait_for(|n| *n == 0), if self.state() == PoolState::Running => {
                let pending = self.shared.queue.pending();
                if pending > 0 {
                    return Err(IngestError::PoolExhausted { pending });
                }
            }
        }

        self.shared.events.emit(PipelineEvent::Drained);
        Ok(())
    }

    /// Stop all workers and wait for them to exit.
    ///
    /// One sentinel is queued per launched worker, behind any tasks still
    /// queued. The pool rejects new submissions from this point on. Stopping
    /// a pool that is not running is a no-op.
    pub async fn stop(&mut self) -> IngestResult<()> {
        {
            let mut state = self.shared.state.lock();
            if *state != PoolState::Running {
                return Ok(());
            }
            *state = PoolState::Stopped;
        }

        let launched = self.handles.len();
        self.shared
            .events
            .emit(PipelineEvent::PoolStopping { workers: launched });

        for _ in 0..launched {
            self.shared.queue.submit(Task::Stop);
        }

        for (worker, handle) in self.handles.drain(..).enumerate() {
            // Failures that ended a worker were already reported when they happened.
            if let Err(e) = handle.await {
                self.shared.events.emit(PipelineEvent::WorkerAborted {
                    worker,
                    error: e.to_string(),
                });
            }
        }

        self.shared.events.emit(PipelineEvent::PoolStopped);
        Ok(())
    }

    pub fn state(&self) -> PoolState {
        *self.shared.state.lock()
    }

    /// Number of workers that have not exited.
    pub fn live_workers(&self) -> usize {
        *self.shared.live.borrow()
    }

    /// Number of tasks the sink has completed successfully.
    pub fn processed(&self) -> usize {
        self.shared.processed.load(Ordering::SeqCst)
    }

    /// Number of submitted tasks not yet processed.
    pub fn pending(&self) -> usize {
        self.shared.queue.pending()
    }

    /// Failures recorded under [`FailurePolicy::Isolate`].
    pub fn dead_letters(&self) -> Vec<DeadLetter> {
        self.shared.dead_letters.lock().clone()
    }
}
