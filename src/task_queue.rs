use crate::task::QueuedTask;

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::Mutex as AsyncMutex;

/// A bounded FIFO of tasks waiting to be executed.
///
/// The queue is filled through a single [`QueueProducer`] before any worker
/// exists, then sealed. Workers share a [`QueueConsumer`] and drain it until it
/// reports end-of-stream.
#[derive(Debug)]
pub(crate) struct TaskQueue {
  tx: mpsc::Sender<QueuedTask>,
  rx: mpsc::Receiver<QueuedTask>,
}

impl TaskQueue {
  /// Creates a new `TaskQueue` with a specified capacity.
  pub(crate) fn new(capacity: usize) -> Self {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    Self { tx, rx }
  }

  /// Splits the queue into its producer and consumer halves.
  pub(crate) fn split(self) -> (QueueProducer, QueueConsumer) {
    (
      QueueProducer { tx: self.tx },
      QueueConsumer {
        rx: Arc::new(AsyncMutex::new(self.rx)),
      },
    )
  }
}

/// The writing half. Not cloneable: there is exactly one producer.
pub(crate) struct QueueProducer {
  tx: mpsc::Sender<QueuedTask>,
}

impl fmt::Debug for QueueProducer {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("QueueProducer")
      .field("len", &self.len())
      .field("capacity", &self.capacity())
      .finish()
  }
}

impl QueueProducer {
  /// Appends `task` without waiting. A full queue hands the task back.
  pub(crate) fn try_enqueue(&self, task: QueuedTask) -> Result<(), QueuedTask> {
    match self.tx.try_send(task) {
      Ok(()) => Ok(()),
      Err(TrySendError::Full(task)) | Err(TrySendError::Closed(task)) => Err(task),
    }
  }

  /// Number of tasks currently buffered.
  pub(crate) fn len(&self) -> usize {
    self.tx.max_capacity() - self.tx.capacity()
  }

  pub(crate) fn capacity(&self) -> usize {
    self.tx.max_capacity()
  }

  /// Seals the queue. Buffered tasks remain drainable; nothing more can be added.
  pub(crate) fn seal(self) {
    drop(self.tx);
  }
}

/// The reading half, shared by every worker.
#[derive(Debug, Clone)]
pub(crate) struct QueueConsumer {
  rx: Arc<AsyncMutex<mpsc::Receiver<QueuedTask>>>,
}

impl QueueConsumer {
  /// Takes the next task in FIFO order.
  ///
  /// Waits while the queue is empty but still open. Returns `None` once the
  /// queue is sealed and drained, and keeps returning `None` afterwards.
  pub(crate) async fn dequeue(&self) -> Option<QueuedTask> {
    self.rx.lock().await.recv().await
  }

  /// Closes the queue for writing. Idempotent.
  pub(crate) async fn close(&self) {
    self.rx.lock().await.close();
  }
}
