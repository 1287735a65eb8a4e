//! Recursive file system watching.

use crate::error::{IngestError, IngestResult};
use crate::events::{EventSink, PipelineEvent};
use crate::handler::{absolutize, ChangeHandler, FsEvent};
use notify::event::{Flag, ModifyKind};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver};
use std::sync::Arc;
use std::thread::JoinHandle;

/// A registered watch.
pub trait WatchHandle: Send + 'static {
    /// The absolute root being watched.
    fn root(&self) -> &Path;

    /// Stop watching. Returns once no further events will be delivered.
    fn stop(self) -> IngestResult<()>;
}

/// Something that can watch a directory tree and feed a [`ChangeHandler`].
pub trait WatchService {
    type Handle: WatchHandle;

    /// Start delivering modification events under `root` to `handler`.
    fn register(
        &self,
        root: &Path,
        recursive: bool,
        handler: ChangeHandler,
    ) -> IngestResult<Self::Handle>;
}

/// Watch service backed by the platform's native notification facility.
#[derive(Clone)]
pub struct NotifyWatchService {
    events: Arc<dyn EventSink>,
}

impl NotifyWatchService {
    pub fn new(events: Arc<dyn EventSink>) -> Self {
        Self { events }
    }
}

impl WatchService for NotifyWatchService {
    type Handle = NotifyWatchHandle;

    fn register(
        &self,
        root: &Path,
        recursive: bool,
        handler: ChangeHandler,
    ) -> IngestResult<NotifyWatchHandle> {
        let root = absolutize(root)?;
        if !root.exists() {
            return Err(IngestError::WatchSetup {
                root,
                message: "path does not exist".to_string(),
            });
        }

        let (tx, rx) = channel();
        let mut watcher = notify::recommended_watcher(tx).map_err(|e| IngestError::WatchSetup {
            root: root.clone(),
            message: e.to_string(),
        })?;

        let mode = if recursive {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };
        watcher
            .watch(&root, mode)
            .map_err(|e| IngestError::WatchSetup {
                root: root.clone(),
                message: e.to_string(),
            })?;

        let dispatcher = {
            let events = Arc::clone(&self.events);
            std::thread::Builder::new()
                .name("lectern-watch".to_string())
                .spawn(move || dispatch(rx, handler, events))?
        };

        Ok(NotifyWatchHandle {
            root,
            watcher,
            dispatcher,
        })
    }
}

/// A live notify watch and the thread forwarding its events.
pub struct NotifyWatchHandle {
    root: PathBuf,
    watcher: RecommendedWatcher,
    dispatcher: JoinHandle<()>,
}

impl WatchHandle for NotifyWatchHandle {
    fn root(&self) -> &Path {
        &self.root
    }

    fn stop(self) -> IngestResult<()> {
        let NotifyWatchHandle {
            watcher,
            dispatcher,
            ..
        } = self;

        // The dispatcher exits once the watcher's event loop has released its
        // sender, after every event it reported has been forwarded.
        drop(watcher);

        dispatcher
            .join()
            .map_err(|_| IngestError::Watch("watch dispatcher panicked".to_string()))
    }
}

/// Forward notify events to the handler until the watcher is dropped.
fn dispatch(
    rx: Receiver<notify::Result<Event>>,
    handler: ChangeHandler,
    events: Arc<dyn EventSink>,
) {
    for result in rx {
        match result {
            Ok(event) => {
                for fs_event in modification_events(&event) {
                    handler.on_modified(fs_event);
                }
            }
            Err(e) => events.emit(PipelineEvent::WatchError {
                error: e.to_string(),
            }),
        }
    }
}

/// Modification events carried by a notify event.
///
/// Renames are not modifications. Events flagged for rescan are produced by
/// the watcher itself and are marked synthetic.
fn modification_events(event: &Event) -> Vec<FsEvent> {
    match event.kind {
        EventKind::Modify(ModifyKind::Name(_)) => return Vec::new(),
        EventKind::Modify(_) => {}
        _ => return Vec::new(),
    }

    let is_synthetic = matches!(event.flag(), Some(Flag::Rescan));
    event
        .paths
        .iter()
        .map(|path| FsEvent {
            path: path.clone(),
            is_directory: path.is_dir(),
            is_synthetic,
        })
        .collect()
}
