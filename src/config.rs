use crate::logger::PoolLogger;
use crate::signal::CancelSignal;

use tokio::runtime::Handle as TokioHandle;
use tracing::{warn, Level};

pub const DEFAULT_QUEUE_CAPACITY: usize = 8;
/// Largest accepted queue capacity; Tokio channels reject anything above `usize::MAX >> 3`.
pub const MAX_QUEUE_CAPACITY: usize = usize::MAX >> 4;
pub const DEFAULT_WORKER_COUNT: usize = 4;
pub const DEFAULT_POOL_NAME: &str = "pool";

/// Tunables for a [`TaskPool`](crate::TaskPool).
///
/// Built with [`PoolConfig::default`] and the consuming `with_*` setters. Once
/// handed to `TaskPool::new` the configuration can no longer be changed.
#[derive(Debug, Clone)]
pub struct PoolConfig {
  pub(crate) name: String,
  pub(crate) queue_capacity: usize,
  pub(crate) worker_count: usize,
  pub(crate) signal: CancelSignal,
  pub(crate) logger: PoolLogger,
  pub(crate) runtime: Option<TokioHandle>,
}

impl Default for PoolConfig {
  fn default() -> Self {
    Self {
      name: DEFAULT_POOL_NAME.to_string(),
      queue_capacity: DEFAULT_QUEUE_CAPACITY,
      worker_count: DEFAULT_WORKER_COUNT,
      signal: CancelSignal::new(),
      logger: PoolLogger::stdout(Level::INFO),
      runtime: None,
    }
  }
}

impl PoolConfig {
  pub fn new() -> Self {
    Self::default()
  }

  /// Name reported in every diagnostic of the pool.
  pub fn with_name(mut self, name: impl Into<String>) -> Self {
    self.name = name.into();
    self
  }

  /// Maximum number of queued tasks. Zero is raised to one and anything above
  /// [`MAX_QUEUE_CAPACITY`] is lowered to it.
  pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
    if capacity > MAX_QUEUE_CAPACITY {
      self.logger.in_scope(|| {
        warn!(
          pool_name = %self.name,
          requested = capacity,
          max = MAX_QUEUE_CAPACITY,
          "queue capacity clamped"
        );
      });
    }
    self.queue_capacity = capacity.clamp(1, MAX_QUEUE_CAPACITY);
    self
  }

  /// Number of concurrent workers. Zero is raised to one.
  pub fn with_worker_count(mut self, workers: usize) -> Self {
    self.worker_count = workers.max(1);
    self
  }

  /// Signal used by [`ExecutablePool::run`](crate::ExecutablePool::run).
  pub fn with_signal(mut self, signal: CancelSignal) -> Self {
    self.signal = signal;
    self
  }

  /// Sink for diagnostics. Defaults to an INFO level text sink on stdout;
  /// use [`PoolLogger::global`] to log through the application's subscriber.
  pub fn with_logger(mut self, logger: PoolLogger) -> Self {
    self.logger = logger;
    self
  }

  /// Runtime the workers are spawned on. Defaults to the runtime driving `execute`.
  pub fn with_runtime(mut self, handle: TokioHandle) -> Self {
    self.runtime = Some(handle);
    self
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn queue_capacity(&self) -> usize {
    self.queue_capacity
  }

  pub fn worker_count(&self) -> usize {
    self.worker_count
  }

  pub fn signal(&self) -> &CancelSignal {
    &self.signal
  }

  pub fn logger(&self) -> &PoolLogger {
    &self.logger
  }
}
