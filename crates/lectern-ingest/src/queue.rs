//! Unbounded FIFO task queue with completion tracking.

use lectern_core::Task;
use tokio::sync::{mpsc, watch, Mutex};

/// FIFO queue shared by the workers of a pool.
///
/// Every submitted non-sentinel task counts as pending until a worker calls
/// [`TaskQueue::mark_done`] for it. [`TaskQueue::join`] waits for that count to
/// reach zero.
#[derive(Debug)]
pub struct TaskQueue {
    tx: mpsc::UnboundedSender<Task>,
    rx: Mutex<mpsc::UnboundedReceiver<Task>>,
    pending: watch::Sender<usize>,
}

impl TaskQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (pending, _) = watch::channel(0);
        Self {
            tx,
            rx: Mutex::new(rx),
            pending,
        }
    }

    /// Append a task to the tail. Never blocks.
    pub fn submit(&self, task: Task) {
        // Count before sending so a concurrent join cannot observe zero
        // while the task is in flight.
        if !task.is_sentinel() {
            self.pending.send_modify(|n| *n += 1);
        }
        // The receiver lives in `self`, so the channel cannot be closed here.
        let _ = self.tx.send(task);
    }

    /// Wait for the next task and remove it from the head.
    pub async fn take(&self) -> Task {
        let mut rx = self.rx.lock().await;
        // `self.tx` keeps the channel open, so `recv` only returns `None`
        // if the queue is being torn down; treat that as a sentinel.
        rx.recv().await.unwrap_or(Task::Stop)
    }

    /// Record that a taken task has been processed, successfully or not.
    pub fn mark_done(&self) {
        self.pending.send_modify(|n| *n = n.saturating_sub(1));
    }

    /// Wait until every submitted task has been marked done.
    pub async fn join(&self) {
        let mut rx = self.pending.subscribe();
        // The sender is owned by `self`, so `wait_for` cannot fail while we borrow it.
        let _ = rx.wait_for(|pending| *pending == 0).await;
    }

    /// Number of submitted tasks not yet marked done.
    pub fn pending(&self) -> usize {
        *self.pending.borrow()
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}
