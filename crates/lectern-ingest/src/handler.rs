//! Translates raw file system events into queue submissions.

use crate::events::{EventSink, PipelineEvent};
use crate::pool::Submitter;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// A modification reported by the watch service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsEvent {
    pub path: PathBuf,
    pub is_directory: bool,
    /// Produced by the watch mechanism itself rather than by a real change.
    pub is_synthetic: bool,
}

impl FsEvent {
    /// A genuine modification of a regular file.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            is_directory: false,
            is_synthetic: false,
        }
    }
}

/// Filters modification events and queues the files they refer to.
///
/// Directory and synthetic events are dropped. Extension filtering is left to
/// the ingestion sink.
#[derive(Clone)]
pub struct ChangeHandler {
    submitter: Submitter,
    events: Arc<dyn EventSink>,
}

impl ChangeHandler {
    pub fn new(submitter: Submitter, events: Arc<dyn EventSink>) -> Self {
        Self { submitter, events }
    }

    /// Handle one modification event.
    ///
    /// Returns `true` if the event resulted in a submission.
    pub fn on_modified(&self, event: FsEvent) -> bool {
        if event.is_directory {
            self.ignore(event.path, "directory");
            return false;
        }
        if event.is_synthetic {
            self.ignore(event.path, "synthetic");
            return false;
        }

        let path = match absolutize(&event.path) {
            Ok(path) => path,
            Err(e) => {
                self.events.emit(PipelineEvent::SubmitRejected {
                    path: event.path,
                    error: e.to_string(),
                });
                return false;
            }
        };

        match self.submitter.add(path.clone()) {
            Ok(()) => true,
            Err(e) => {
                self.events.emit(PipelineEvent::SubmitRejected {
                    path,
                    error: e.to_string(),
                });
                false
            }
        }
    }

    fn ignore(&self, path: PathBuf, reason: &'static str) {
        self.events.emit(PipelineEvent::EventIgnored { path, reason });
    }
}

/// Make a path absolute against the current directory and normalize it lexically.
///
/// `.` components are removed and `..` pops the previous component. Symlinks
/// are not resolved, and the path does not need to exist.
pub fn absolutize(path: &Path) -> std::io::Result<PathBuf> {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{PoolConfig, WorkerPool};
    use crate::testing::{RecordingEvents, RecordingSink};

    fn running_pool(sink: Arc<RecordingSink>) -> (WorkerPool, Arc<RecordingEvents>) {
        let events = Arc::new(RecordingEvents::default());
        let mut pool = WorkerPool::new(sink, PoolConfig::default(), events.clone());
        pool.start().unwrap();
        (pool, events)
    }

    #[test]
    fn test_absolutize_absolute_path() {
        let path = absolutize(Path::new("/data/./docs/../a.pdf")).unwrap();
        assert_eq!(path, PathBuf::from("/data/a.pdf"));
    }

    #[test]
    fn test_absolutize_relative_path() {
        let cwd = std::env::current_dir().unwrap();
        let path = absolutize(Path::new("docs/a.pdf")).unwrap();
        assert!(path.is_absolute());
        assert_eq!(path, cwd.join("docs").join("a.pdf"));
    }

    #[test]
    fn test_absolutize_parent_of_root() {
        assert_eq!(absolutize(Path::new("/../a.pdf")).unwrap(), PathBuf::from("/a.pdf"));
    }

    #[tokio::test]
    async fn test_directory_events_are_dropped() {
        let sink = Arc::new(RecordingSink::default());
        let (mut pool, events) = running_pool(sink.clone());
        let handler = ChangeHandler::new(pool.submitter(), events.clone());

        let submitted = handler.on_modified(FsEvent {
            path: PathBuf::from("/data/docs"),
            is_directory: true,
            is_synthetic: false,
        });

        assert!(!submitted);
        assert_eq!(pool.pending(), 0);
        assert_eq!(
            events.count(|e| matches!(e, PipelineEvent::EventIgnored { reason: "directory", .. })),
            1
        );
        pool.stop().await.unwrap();
        assert!(sink.calls().is_empty());
    }

    #[tokio::test]
    async fn test_synthetic_events_are_dropped() {
        let sink = Arc::new(RecordingSink::default());
        let (mut pool, events) = running_pool(sink.clone());
        let handler = ChangeHandler::new(pool.submitter(), events);

        for is_directory in [false, true] {
            let submitted = handler.on_modified(FsEvent {
                path: PathBuf::from("/data/a.pdf"),
                is_directory,
                is_synthetic: true,
            });
            assert!(!submitted);
        }

        pool.stop().await.unwrap();
        assert!(sink.calls().is_empty());
    }

    #[tokio::test]
    async fn test_relative_file_event_submits_absolute_path() {
        let sink = Arc::new(RecordingSink::default());
        let (mut pool, events) = running_pool(sink.clone());
        let handler = ChangeHandler::new(pool.submitter(), events);

        assert!(handler.on_modified(FsEvent::file("notes/a.pdf")));
        pool.wait_for_completion().await.unwrap();
        pool.stop().await.unwrap();

        let expected = std::env::current_dir().unwrap().join("notes/a.pdf");
        assert_eq!(sink.calls(), vec![expected]);
    }

    #[tokio::test]
    async fn test_no_extension_filtering() {
        let sink = Arc::new(RecordingSink::default());
        let (mut pool, events) = running_pool(sink.clone());
        let handler = ChangeHandler::new(pool.submitter(), events);

        assert!(handler.on_modified(FsEvent::file("/data/notes.txt")));
        pool.wait_for_completion().await.unwrap();
        pool.stop().await.unwrap();

        assert_eq!(sink.calls(), vec![PathBuf::from("/data/notes.txt")]);
    }

    #[tokio::test]
    async fn test_rejected_submission_is_reported() {
        let sink = Arc::new(RecordingSink::default());
        let events = Arc::new(RecordingEvents::default());
        let pool = WorkerPool::new(sink, PoolConfig::default(), events.clone());
        let handler = ChangeHandler::new(pool.submitter(), events.clone());

        assert!(!handler.on_modified(FsEvent::file("/data/a.pdf")));
        assert_eq!(
            events.count(|e| matches!(e, PipelineEvent::SubmitRejected { .. })),
            1
        );
    }
}
