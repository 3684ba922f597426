use crate::error::FailureCause;
use crate::signal::{CancelSignal, CancellationCause};
use crate::task::{QueuedTask, TaskOutcome};
use crate::task_queue::QueueConsumer;

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::mpsc;
use tracing::{debug, error, trace, warn};

/// Drains `queue` until it reports end-of-stream, sending one outcome per task.
pub(crate) async fn run_worker(
  pool_name: Arc<String>,
  worker_id: usize,
  queue: QueueConsumer,
  signal: CancelSignal,
  results: mpsc::Sender<TaskOutcome>,
) {
  trace!(pool_name = %*pool_name, worker_id, "Worker started.");
  let mut executed = 0usize;

  while let Some(task) = queue.dequeue().await {
    let ordinal = task.ordinal;
    debug!(pool_name = %*pool_name, worker_id, ordinal, "executing task");

    let result = match signal.cause() {
      Some(cause) => {
        log_cancellation(&pool_name, worker_id, ordinal, &cause);
        Err(FailureCause::Cancelled(cause))
      }
      None => execute_task(&pool_name, task, signal.clone()).await,
    };
    executed += 1;

    if results.send(TaskOutcome { ordinal, result }).await.is_err() {
      warn!(
        pool_name = %*pool_name,
        worker_id,
        ordinal,
        "Result receiver was dropped. Worker stopping early."
      );
      return;
    }
  }

  trace!(pool_name = %*pool_name, worker_id, executed, "Task queue exhausted. Worker finished.");
}

async fn execute_task(pool_name: &str, task: QueuedTask, signal: CancelSignal) -> Result<(), FailureCause> {
  let ordinal = task.ordinal;
  match AssertUnwindSafe(task.start(signal)).catch_unwind().await {
    Ok(Ok(())) => {
      trace!(pool_name, ordinal, "Task executed successfully.");
      Ok(())
    }
    Ok(Err(err)) => {
      debug!(pool_name, ordinal, error = %err, "Task returned an error.");
      Err(FailureCause::Failed(err))
    }
    Err(panic_payload) => {
      let message = panic_message(panic_payload.as_ref());
      error!(pool_name, ordinal, panic = %message, "Task panicked during execution.");
      Err(FailureCause::Panicked(message))
    }
  }
}

fn log_cancellation(pool_name: &str, worker_id: usize, ordinal: usize, cause: &CancellationCause) {
  match cause {
    CancellationCause::Cancelled => {
      warn!(pool_name, worker_id, ordinal, "Task skipped: signal cancelled.");
    }
    CancellationCause::DeadlineExceeded => {
      warn!(pool_name, worker_id, ordinal, "Task skipped: deadline exceeded.");
    }
    CancellationCause::Other(reason) => {
      warn!(pool_name, worker_id, ordinal, %reason, "Task skipped: signal fired.");
    }
  }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
  if let Some(message) = payload.downcast_ref::<&'static str>() {
    (*message).to_string()
  } else if let Some(message) = payload.downcast_ref::<String>() {
    message.clone()
  } else {
    "unknown panic payload".to_string()
  }
}
