use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Why a [`CancelSignal`] fired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancellationCause {
  /// `cancel()` was called explicitly.
  Cancelled,
  /// The signal's deadline elapsed.
  DeadlineExceeded,
  /// Cancelled with a caller supplied reason.
  Other(String),
}

impl fmt::Display for CancellationCause {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      CancellationCause::Cancelled => f.write_str("context canceled"),
      CancellationCause::DeadlineExceeded => f.write_str("context deadline exceeded"),
      CancellationCause::Other(reason) => write!(f, "cancelled: {}", reason),
    }
  }
}

#[derive(Debug)]
struct SignalInner {
  token: CancellationToken,
  deadline: Option<Instant>,
  cause: Mutex<Option<CancellationCause>>,
}

/// A shared, cooperative cancellation signal with an optional deadline.
///
/// Clones observe the same state. The pool checks the signal between tasks;
/// tasks receive a clone and are expected to check it themselves while they run.
#[derive(Debug, Clone)]
pub struct CancelSignal {
  inner: Arc<SignalInner>,
}

impl Default for CancelSignal {
  fn default() -> Self {
    Self::new()
  }
}

impl CancelSignal {
  /// A signal that only fires when cancelled explicitly.
  pub fn new() -> Self {
    Self::build(None)
  }

  /// A signal that fires at `deadline`, or earlier when cancelled.
  pub fn with_deadline(deadline: Instant) -> Self {
    Self::build(Some(deadline))
  }

  /// A signal that fires after `timeout` from now, or earlier when cancelled.
  pub fn with_timeout(timeout: Duration) -> Self {
    Self::build(Some(Instant::now() + timeout))
  }

  fn build(deadline: Option<Instant>) -> Self {
    Self {
      inner: Arc::new(SignalInner {
        token: CancellationToken::new(),
        deadline,
        cause: Mutex::new(None),
      }),
    }
  }

  pub fn deadline(&self) -> Option<Instant> {
    self.inner.deadline
  }

  /// Fires the signal with [`CancellationCause::Cancelled`].
  pub fn cancel(&self) {
    self.fire(CancellationCause::Cancelled);
  }

  /// Fires the signal with [`CancellationCause::Other`].
  pub fn cancel_with_reason(&self, reason: impl Into<String>) {
    self.fire(CancellationCause::Other(reason.into()));
  }

  fn fire(&self, cause: CancellationCause) {
    {
      let mut guard = self.inner.cause.lock();
      // The first cause wins, including an already elapsed deadline.
      if guard.is_none() {
        *guard = Some(self.deadline_cause().unwrap_or(cause));
      }
    }
    self.inner.token.cancel();
  }

  fn deadline_cause(&self) -> Option<CancellationCause> {
    match self.inner.deadline {
      Some(deadline) if Instant::now() >= deadline => Some(CancellationCause::DeadlineExceeded),
      _ => None,
    }
  }

  /// Non-blocking check.
  pub fn is_cancelled(&self) -> bool {
    self.cause().is_some()
  }

  /// Returns the cause if the signal has fired, `None` otherwise.
  pub fn cause(&self) -> Option<CancellationCause> {
    if let Some(cause) = self.inner.cause.lock().clone() {
      return Some(cause);
    }
    self.deadline_cause()
  }

  /// Resolves once the signal fires, either explicitly or by deadline.
  pub async fn cancelled(&self) {
    match self.inner.deadline {
      Some(deadline) => {
        tokio::select! {
          _ = self.inner.token.cancelled() => {}
          _ = tokio::time::sleep_until(deadline) => {}
        }
      }
      None => self.inner.token.cancelled().await,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_fresh_signal_is_not_cancelled() {
    let signal = CancelSignal::new();
    assert!(!signal.is_cancelled());
    assert_eq!(signal.cause(), None);
    assert!(signal.deadline().is_none());
  }

  #[test]
  fn test_cancel_is_visible_through_clones() {
    let signal = CancelSignal::new();
    let observer = signal.clone();
    signal.cancel();
    assert_eq!(observer.cause(), Some(CancellationCause::Cancelled));
  }

  #[test]
  fn test_first_cause_wins() {
    let signal = CancelSignal::new();
    signal.cancel_with_reason("shutdown");
    signal.cancel();
    assert_eq!(signal.cause(), Some(CancellationCause::Other("shutdown".to_string())));
  }

  #[tokio::test]
  async fn test_deadline_elapses() {
    let signal = CancelSignal::with_timeout(Duration::from_millis(20));
    assert!(!signal.is_cancelled());
    tokio::time::timeout(Duration::from_secs(2), signal.cancelled())
      .await
      .expect("deadline should fire the signal");
    assert_eq!(signal.cause(), Some(CancellationCause::DeadlineExceeded));
  }

  #[tokio::test]
  async fn test_cancelled_future_resolves_on_explicit_cancel() {
    let signal = CancelSignal::with_timeout(Duration::from_secs(60));
    let waiter = {
      let signal = signal.clone();
      tokio::spawn(async move { signal.cancelled().await })
    };
    signal.cancel();
    tokio::time::timeout(Duration::from_secs(2), waiter)
      .await
      .expect("waiter should wake up")
      .unwrap();
    assert_eq!(signal.cause(), Some(CancellationCause::Cancelled));
  }
}
