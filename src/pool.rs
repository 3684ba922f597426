use crate::config::PoolConfig;
use crate::error::BoxError;
use crate::executor::ExecutablePool;
use crate::signal::CancelSignal;
use crate::task::QueuedTask;
use crate::task_queue::{QueueConsumer, QueueProducer, TaskQueue};

use std::future::Future;

use tracing::{debug, warn};

/// Collects tasks against a [`PoolConfig`] before execution.
///
/// ```no_run
/// # async fn demo() -> Result<(), futures_pooler::PoolError> {
/// use futures_pooler::{CancelSignal, PoolConfig, TaskPool};
///
/// let pool = TaskPool::new(PoolConfig::default())
///   .queue(|_signal| async { Ok::<(), std::io::Error>(()) })
///   .queue(|_signal| async { Err::<(), _>("boom") })
///   .build();
///
/// pool.execute(&CancelSignal::new()).await
/// # }
/// ```
#[derive(Debug)]
pub struct TaskPool {
  config: PoolConfig,
  producer: QueueProducer,
  consumer: QueueConsumer,
  accepted: usize,
  rejected: usize,
}

impl TaskPool {
  pub fn new(config: PoolConfig) -> Self {
    let (producer, consumer) = TaskQueue::new(config.queue_capacity).split();
    Self {
      config,
      producer,
      consumer,
      accepted: 0,
      rejected: 0,
    }
  }

  /// Queues `task` for execution.
  ///
  /// When the queue is already at capacity the task is dropped and a
  /// `job queue full` warning is logged; the pool is returned either way so
  /// calls can keep chaining.
  pub fn queue<F, Fut, E>(mut self, task: F) -> Self
  where
    F: FnOnce(CancelSignal) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    E: Into<BoxError> + Send + 'static,
  {
    let queued = QueuedTask::new(self.accepted, task);
    match self.producer.try_enqueue(queued) {
      Ok(()) => {
        self.config.logger.in_scope(|| {
          debug!(pool_name = %self.config.name, ordinal = self.accepted, "Task queued.");
        });
        self.accepted += 1;
      }
      Err(_dropped) => {
        self.rejected += 1;
        self.config.logger.in_scope(|| {
          warn!(
            pool_name = %self.config.name,
            capacity = self.producer.capacity(),
            "job queue full"
          );
        });
      }
    }
    self
  }

  /// Number of tasks waiting in the queue.
  pub fn queued_len(&self) -> usize {
    self.producer.len()
  }

  /// Number of tasks dropped because the queue was full.
  pub fn rejected_len(&self) -> usize {
    self.rejected
  }

  pub fn capacity(&self) -> usize {
    self.producer.capacity()
  }

  pub fn config(&self) -> &PoolConfig {
    &self.config
  }

  /// Seals the queue and returns the handle that executes it.
  ///
  /// The effective worker count is the configured count clamped to the number
  /// of queued tasks.
  pub fn build(self) -> ExecutablePool {
    let Self {
      config,
      producer,
      consumer,
      accepted,
      ..
    } = self;

    let task_count = producer.len();
    let worker_count = if config.worker_count > task_count {
      config.logger.in_scope(|| {
        warn!(
          pool_name = %config.name,
          configured = config.worker_count,
          tasks = task_count,
          "worker count exceeds task count"
        );
      });
      task_count
    } else {
      config.worker_count
    };
    debug_assert_eq!(task_count, accepted);

    producer.seal();
    ExecutablePool::new(config, consumer, worker_count, task_count)
  }
}
