use std::fmt;
use std::future::Future;

use tracing::instrument::WithSubscriber;
use tracing::{Dispatch, Level, Subscriber};

/// Sink for the pool's diagnostics.
///
/// Every diagnostic is emitted through `tracing`; a `PoolLogger` decides which
/// subscriber receives it. `PoolLogger::default()` forwards to whatever
/// subscriber is installed for the process; `PoolConfig` defaults to
/// [`PoolLogger::stdout`] at `INFO` instead.
#[derive(Clone, Default)]
pub struct PoolLogger {
  dispatch: Option<Dispatch>,
}

impl fmt::Debug for PoolLogger {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("PoolLogger")
      .field("scoped", &self.dispatch.is_some())
      .finish()
  }
}

impl PoolLogger {
  /// Logs to the ambient (global or thread-default) subscriber.
  pub fn global() -> Self {
    Self { dispatch: None }
  }

  /// Logs to `subscriber` only.
  pub fn new<S>(subscriber: S) -> Self
  where
    S: Subscriber + Send + Sync + 'static,
  {
    Self::from_dispatch(Dispatch::new(subscriber))
  }

  pub fn from_dispatch(dispatch: Dispatch) -> Self {
    Self {
      dispatch: Some(dispatch),
    }
  }

  /// A plain leveled text sink writing to stdout.
  pub fn stdout(max_level: Level) -> Self {
    let subscriber = tracing_subscriber::fmt()
      .with_max_level(max_level)
      .with_target(false)
      .finish();
    Self::new(subscriber)
  }

  /// `true` when diagnostics go to a dedicated subscriber rather than the ambient one.
  pub fn is_scoped(&self) -> bool {
    self.dispatch.is_some()
  }

  /// Runs `f` with this logger as the default subscriber.
  pub(crate) fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
    match &self.dispatch {
      Some(dispatch) => tracing::dispatcher::with_default(dispatch, f),
      None => f(),
    }
  }

  /// Drives `fut` with this logger as the default subscriber on every poll.
  pub(crate) async fn scope<F: Future>(&self, fut: F) -> F::Output {
    match &self.dispatch {
      Some(dispatch) => fut.with_subscriber(dispatch.clone()).await,
      None => fut.await,
    }
  }
}
