use crate::config::PoolConfig;
use crate::error::{AggregateError, FailureCause, PoolError, TaskFailure};
use crate::signal::CancelSignal;
use crate::task::TaskOutcome;
use crate::task_queue::QueueConsumer;
use crate::worker::run_worker;

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::runtime::Handle as TokioHandle;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::instrument::WithSubscriber;
use tracing::{debug, error, info, info_span, trace, warn, Instrument};

struct RunningGuard<'a> {
  status: &'a Mutex<PoolStatus>,
}

impl Drop for RunningGuard<'_> {
  fn drop(&mut self) {
    *self.status.lock() = PoolStatus::Stopped;
  }
}

/// Lifecycle of an [`ExecutablePool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolStatus {
  /// Not executable: either never built or already finished.
  Stopped,
  /// Built and waiting for `execute`.
  Started,
  /// `execute` is in progress.
  Running,
}

/// A sealed pool, ready to run its queued tasks exactly once.
///
/// Produced by [`TaskPool::build`](crate::TaskPool::build). The configuration
/// and queue are frozen; the only thing left to do is execute.
#[derive(Debug)]
pub struct ExecutablePool {
  pool_name: Arc<String>,
  config: PoolConfig,
  status: Mutex<PoolStatus>,
  queue: QueueConsumer,
  worker_count: usize,
  task_count: usize,
}

impl ExecutablePool {
  pub(crate) fn new(config: PoolConfig, queue: QueueConsumer, worker_count: usize, task_count: usize) -> Self {
    Self {
      pool_name: Arc::new(config.name.clone()),
      config,
      status: Mutex::new(PoolStatus::Started),
      queue,
      worker_count,
      task_count,
    }
  }

  pub fn name(&self) -> &str {
    &self.pool_name
  }

  pub fn status(&self) -> PoolStatus {
    *self.status.lock()
  }

  /// Number of workers `execute` will spawn.
  pub fn worker_count(&self) -> usize {
    self.worker_count
  }

  /// Number of tasks sealed into the queue.
  pub fn task_count(&self) -> usize {
    self.task_count
  }

  /// Executes with the signal from the pool's configuration.
  pub async fn run(&self) -> Result<(), PoolError> {
    let signal = self.config.signal.clone();
    self.execute(&signal).await
  }

  /// Runs every queued task across the pool's workers and waits for all of them.
  ///
  /// Tasks dequeued after `signal` fires are not started; they are reported as
  /// cancelled instead. Tasks already running are expected to watch `signal`
  /// themselves. Dropping the returned future aborts the workers and leaves
  /// the pool `Stopped`.
  ///
  /// # Errors
  /// Returns `PoolError::NotStarted` without doing any work if this pool has
  /// already been executed (or is executing).
  /// Returns `PoolError::NoRuntime`, leaving the pool `Started`, when no runtime
  /// was configured and this is not polled inside a Tokio runtime.
  /// Returns `PoolError::TasksFailed` with every failure when at least one task
  /// did not succeed.
  pub async fn execute(&self, signal: &CancelSignal) -> Result<(), PoolError> {
    let runtime = match self.config.runtime.clone() {
      Some(handle) => handle,
      None => TokioHandle::try_current().map_err(|_| {
        self.config.logger.in_scope(|| {
          error!(pool_name = %*self.pool_name, "Execute called outside of a Tokio runtime.");
        });
        PoolError::NoRuntime
      })?,
    };

    let rejected_status = {
      let mut status = self.status.lock();
      if *status == PoolStatus::Started {
        *status = PoolStatus::Running;
        None
      } else {
        Some(*status)
      }
    };
    if let Some(status) = rejected_status {
      self.config.logger.in_scope(|| {
        warn!(pool_name = %*self.pool_name, ?status, "Execute called on a pool that is not started.");
      });
      return Err(PoolError::NotStarted);
    }
    // Marks the pool stopped on every exit, including when this future is dropped.
    let _running = RunningGuard { status: &self.status };

    let span = self.config.logger.in_scope(|| {
      info_span!(
        "pool_execute",
        pool_name = %*self.pool_name,
        workers = self.worker_count,
        tasks = self.task_count
      )
    });
    let outcome = self
      .config
      .logger
      .scope(self.execute_inner(signal.clone(), runtime).instrument(span))
      .await;

    match outcome {
      Some(aggregate) => Err(PoolError::TasksFailed(aggregate)),
      None => Ok(()),
    }
  }

  async fn execute_inner(&self, signal: CancelSignal, runtime: TokioHandle) -> Option<AggregateError> {
    self.queue.close().await;

    if self.task_count == 0 {
      info!(pool_name = %*self.pool_name, "No tasks queued. Nothing to execute.");
      return None;
    }

    let (results_tx, mut results_rx) = mpsc::channel::<TaskOutcome>(self.task_count);

    let mut workers = JoinSet::new();
    for worker_id in 0..self.worker_count {
      let worker = run_worker(
        self.pool_name.clone(),
        worker_id,
        self.queue.clone(),
        signal.clone(),
        results_tx.clone(),
      )
      .instrument(info_span!("pool_worker", worker_id))
      .with_current_subscriber();
      workers.spawn_on(worker, &runtime);
    }
    debug!(pool_name = %*self.pool_name, workers = self.worker_count, "Workers spawned.");

    // The supervisor keeps the stream open until every worker has returned.
    // It owns the workers' JoinSet, so dropping the supervisor set aborts them too.
    let supervisor_pool_name = self.pool_name.clone();
    let mut supervisor = JoinSet::new();
    supervisor.spawn_on(
      async move {
        while let Some(joined) = workers.join_next().await {
          if let Err(join_error) = joined {
            error!(pool_name = %*supervisor_pool_name, "Worker terminated abnormally: {:?}", join_error);
          }
        }
        trace!(pool_name = %*supervisor_pool_name, "All workers finished. Closing result stream.");
        drop(results_tx);
      }
      .in_current_span()
      .with_current_subscriber(),
      &runtime,
    );

    let mut reported = vec![false; self.task_count];
    let mut failures = Vec::new();
    while let Some(TaskOutcome { ordinal, result }) = results_rx.recv().await {
      if let Some(seen) = reported.get_mut(ordinal) {
        *seen = true;
      }
      if let Err(cause) = result {
        failures.push(TaskFailure { ordinal, cause });
      }
    }

    if let Some(Err(join_error)) = supervisor.join_next().await {
      error!(pool_name = %*self.pool_name, "Supervisor terminated abnormally: {:?}", join_error);
    }

    for (ordinal, _) in reported.iter().enumerate().filter(|(_, seen)| !**seen) {
      error!(pool_name = %*self.pool_name, ordinal, "No result was reported for task.");
      failures.push(TaskFailure {
        ordinal,
        cause: FailureCause::Lost,
      });
    }

    info!(
      pool_name = %*self.pool_name,
      tasks = self.task_count,
      failed = failures.len(),
      "Execution finished."
    );
    if failures.is_empty() {
      None
    } else {
      Some(AggregateError::new(failures))
    }
  }
}
