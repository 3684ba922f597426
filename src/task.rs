use crate::error::{BoxError, FailureCause};
use crate::signal::CancelSignal;

use std::fmt;
use std::future::Future;
use std::pin::Pin;

/// The type of future a queued task resolves to once started.
pub type TaskFuture = Pin<Box<dyn Future<Output = Result<(), BoxError>> + Send + 'static>>;

type TaskFn = Box<dyn FnOnce(CancelSignal) -> TaskFuture + Send + 'static>;

/// Internal representation of a task waiting in the queue.
pub(crate) struct QueuedTask {
  pub(crate) ordinal: usize,
  run: TaskFn,
}

impl fmt::Debug for QueuedTask {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("QueuedTask")
      .field("ordinal", &self.ordinal)
      .finish_non_exhaustive()
  }
}

impl QueuedTask {
  pub(crate) fn new<F, Fut, E>(ordinal: usize, task: F) -> Self
  where
    F: FnOnce(CancelSignal) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    E: Into<BoxError> + Send + 'static,
  {
    let run: TaskFn = Box::new(move |signal| {
      let fut = task(signal);
      Box::pin(async move { fut.await.map_err(Into::into) })
    });
    Self { ordinal, run }
  }

  /// Starts the task. The closure itself is invoked lazily on first poll, so a
  /// panic while building the future surfaces from the returned future.
  pub(crate) fn start(self, signal: CancelSignal) -> impl Future<Output = Result<(), BoxError>> + Send {
    let run = self.run;
    async move { run(signal).await }
  }
}

/// Outcome of one dequeued task, as sent over the result stream.
#[derive(Debug)]
pub(crate) struct TaskOutcome {
  pub(crate) ordinal: usize,
  pub(crate) result: Result<(), FailureCause>,
}
