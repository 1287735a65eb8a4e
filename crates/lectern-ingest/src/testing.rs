//! Test doubles shared by the unit tests.

use crate::error::{IngestError, IngestResult};
use crate::events::{EventSink, PipelineEvent};
use crate::handler::{ChangeHandler, FsEvent};
use crate::watcher::{WatchHandle, WatchService};
use lectern_core::IngestionSink;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;

/// Poll `condition` until it holds, panicking after five seconds.
pub async fn eventually(condition: impl Fn() -> bool) {
    for _ in 0..1000 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached within 5s");
}

/// Sink that records every path it is asked to learn, in call order.
#[derive(Default)]
pub struct RecordingSink {
    calls: Mutex<Vec<PathBuf>>,
    fail_on: HashSet<PathBuf>,
    panic_on: HashSet<PathBuf>,
    extensions: Vec<String>,
    delay: Option<Duration>,
    support_delay: Option<Duration>,
    gate: Option<Mutex<Receiver<()>>>,
}

/// Releases calls blocked in a gated [`RecordingSink`].
pub struct Gate(Sender<()>);

impl Gate {
    pub fn release(&self, calls: usize) {
        for _ in 0..calls {
            let _ = self.0.send(());
        }
    }
}

impl RecordingSink {
    /// A sink whose calls block until released through the returned gate.
    pub fn gated() -> (Self, Gate) {
        let (tx, rx) = channel();
        let sink = Self {
            gate: Some(Mutex::new(rx)),
            ..Self::default()
        };
        (sink, Gate(tx))
    }

    pub fn failing_on(mut self, path: PathBuf) -> Self {
        self.fail_on.insert(path);
        self
    }

    pub fn panicking_on(mut self, path: PathBuf) -> Self {
        self.panic_on.insert(path);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Make every `is_supported` call take this long.
    pub fn with_support_delay(mut self, delay: Duration) -> Self {
        self.support_delay = Some(delay);
        self
    }

    /// Restrict `is_supported` to these extensions. Without it every file is supported.
    pub fn supporting(mut self, extensions: &[&str]) -> Self {
        self.extensions = extensions.iter().map(|e| e.to_string()).collect();
        self
    }

    pub fn calls(&self) -> Vec<PathBuf> {
        self.calls.lock().clone()
    }
}

impl IngestionSink for RecordingSink {
    fn learn(&self, paths: &[PathBuf]) -> lectern_core::Result<()> {
        for path in paths {
            self.calls.lock().push(path.clone());

            if let Some(gate) = &self.gate {
                let _ = gate.lock().recv();
            }
            if let Some(delay) = self.delay {
                std::thread::sleep(delay);
            }
            if self.panic_on.contains(path) {
                panic!("sink exploded on {}", path.display());
            }
            if self.fail_on.contains(path) {
                return Err(lectern_core::Error::Sink(format!(
                    "cannot learn {}",
                    path.display()
                )));
            }
        }
        Ok(())
    }

    fn is_supported(&self, path: &Path) -> bool {
        if let Some(delay) = self.support_delay {
            std::thread::sleep(delay);
        }
        if self.extensions.is_empty() {
            return true;
        }
        path.extension()
            .and_then(|e| e.to_str())
            .map(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
            .unwrap_or(false)
    }
}

/// Event sink that keeps every event with the level it was routed at.
#[derive(Default)]
pub struct RecordingEvents {
    events: Mutex<Vec<(Level, PipelineEvent)>>,
}

impl RecordingEvents {
    pub fn levels(&self) -> Vec<Level> {
        self.events.lock().iter().map(|(level, _)| *level).collect()
    }

    pub fn count(&self, predicate: impl Fn(&PipelineEvent) -> bool) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|(_, event)| predicate(event))
            .count()
    }

    /// Index of the first event matching `predicate`.
    pub fn position(&self, predicate: impl Fn(&PipelineEvent) -> bool) -> Option<usize> {
        self.events
            .lock()
            .iter()
            .position(|(_, event)| predicate(event))
    }

    fn record(&self, level: Level, event: &PipelineEvent) {
        self.events.lock().push((level, event.clone()));
    }
}

impl EventSink for RecordingEvents {
    fn debug(&self, event: &PipelineEvent) {
        self.record(Level::DEBUG, event);
    }

    fn info(&self, event: &PipelineEvent) {
        self.record(Level::INFO, event);
    }

    fn warn(&self, event: &PipelineEvent) {
        self.record(Level::WARN, event);
    }
}

#[derive(Default)]
struct FakeWatchState {
    root: Option<PathBuf>,
    handler: Option<ChangeHandler>,
}

/// Watch service driven by the test: events are injected with [`FakeWatch::emit`].
#[derive(Clone, Default)]
pub struct FakeWatch {
    state: Arc<Mutex<FakeWatchState>>,
    fail: bool,
}

impl FakeWatch {
    /// A watch service whose registration always fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn is_registered(&self) -> bool {
        self.state.lock().handler.is_some()
    }

    pub fn root(&self) -> Option<PathBuf> {
        self.state.lock().root.clone()
    }

    /// Deliver an event if the watch is active. Returns whether it was submitted.
    pub fn emit(&self, event: FsEvent) -> bool {
        // Holding the lock keeps `stop` from completing while an event is in flight.
        let state = self.state.lock();
        match &state.handler {
            Some(handler) => handler.on_modified(event),
            None => false,
        }
    }
}

pub struct FakeWatchHandle {
    root: PathBuf,
    state: Arc<Mutex<FakeWatchState>>,
}

impl WatchHandle for FakeWatchHandle {
    fn root(&self) -> &Path {
        &self.root
    }

    fn stop(self) -> IngestResult<()> {
        self.state.lock().handler = None;
        Ok(())
    }
}

impl WatchService for FakeWatch {
    type Handle = FakeWatchHandle;

    fn register(
        &self,
        root: &Path,
        _recursive: bool,
        handler: ChangeHandler,
    ) -> IngestResult<FakeWatchHandle> {
        if self.fail {
            return Err(IngestError::WatchSetup {
                root: root.to_path_buf(),
                message: "path does not exist".to_string(),
            });
        }

        let mut state = self.state.lock();
        state.root = Some(root.to_path_buf());
        state.handler = Some(handler);
        Ok(FakeWatchHandle {
            root: root.to_path_buf(),
            state: Arc::clone(&self.state),
        })
    }
}
