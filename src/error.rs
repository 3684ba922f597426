use crate::signal::CancellationCause;

use std::error::Error as StdError;
use std::fmt;

use thiserror::Error;

/// Error type returned by tasks.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Errors that can occur within the `futures_pooler` pool.
#[derive(Error, Debug)]
pub enum PoolError {
  /// `execute` was called on a pool that is not in the `Started` state, either
  /// because it already ran or because it is running right now.
  #[error("pool not started")]
  NotStarted,

  /// No runtime was configured and `execute` was not polled inside one.
  #[error("no Tokio runtime available to spawn workers")]
  NoRuntime,

  /// One or more tasks failed, were cancelled before starting, or panicked.
  #[error(transparent)]
  TasksFailed(#[from] AggregateError),
}

impl PoolError {
  /// Returns the aggregated task failures, if that is what this error is.
  pub fn aggregate(&self) -> Option<&AggregateError> {
    match self {
      PoolError::TasksFailed(aggregate) => Some(aggregate),
      PoolError::NotStarted | PoolError::NoRuntime => None,
    }
  }
}

/// Why a single task did not succeed.
#[derive(Error, Debug)]
pub enum FailureCause {
  #[error("{0}")]
  Failed(BoxError),

  /// The signal fired before the task was started; the task never ran.
  #[error("{0}")]
  Cancelled(CancellationCause),

  #[error("task panicked: {0}")]
  Panicked(String),

  /// No outcome was ever reported for the task.
  #[error("task result lost")]
  Lost,
}

impl FailureCause {
  pub fn is_cancelled(&self) -> bool {
    matches!(self, FailureCause::Cancelled(_))
  }

  pub fn cancellation_cause(&self) -> Option<&CancellationCause> {
    match self {
      FailureCause::Cancelled(cause) => Some(cause),
      _ => None,
    }
  }
}

/// A failure tagged with the position the task was queued at.
#[derive(Debug)]
pub struct TaskFailure {
  pub ordinal: usize,
  pub cause: FailureCause,
}

impl fmt::Display for TaskFailure {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "task #{}: {}", self.ordinal, self.cause)
  }
}

/// Every failure collected during one execution.
///
/// Failures are kept sorted by task ordinal, so the value does not depend on
/// the order in which workers finished.
#[derive(Debug)]
pub struct AggregateError {
  failures: Vec<TaskFailure>,
}

impl AggregateError {
  pub(crate) fn new(mut failures: Vec<TaskFailure>) -> Self {
    failures.sort_by_key(|failure| failure.ordinal);
    Self { failures }
  }

  pub fn len(&self) -> usize {
    self.failures.len()
  }

  pub fn is_empty(&self) -> bool {
    self.failures.is_empty()
  }

  pub fn failures(&self) -> &[TaskFailure] {
    &self.failures
  }

  pub fn causes(&self) -> impl Iterator<Item = &FailureCause> {
    self.failures.iter().map(|failure| &failure.cause)
  }

  /// The display message of every cause, in ordinal order.
  pub fn messages(&self) -> Vec<String> {
    self.causes().map(ToString::to_string).collect()
  }

  pub fn contains_message(&self, message: &str) -> bool {
    self.causes().any(|cause| cause.to_string() == message)
  }

  /// Finds the first task error of type `E`.
  pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
    self.causes().find_map(|cause| match cause {
      FailureCause::Failed(err) => err.downcast_ref::<E>(),
      _ => None,
    })
  }

  pub fn into_failures(self) -> Vec<TaskFailure> {
    self.failures
  }
}

impl fmt::Display for AggregateError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} task(s) failed", self.failures.len())?;
    for failure in &self.failures {
      write!(f, "\n{}", failure)?;
    }
    Ok(())
  }
}

impl StdError for AggregateError {
  fn source(&self) -> Option<&(dyn StdError + 'static)> {
    self.causes().find_map(|cause| match cause {
      FailureCause::Failed(err) => Some(err.as_ref() as &(dyn StdError + 'static)),
      _ => None,
    })
  }
}
