//! A Tokio-based bounded task pool.
//!
//! Tasks are queued through a [`TaskPool`] builder, sealed with
//! [`TaskPool::build`], and executed across a fixed number of workers by
//! [`ExecutablePool::execute`]. Every failure, cancellation and panic is
//! collected into a single [`AggregateError`].

mod config;
mod error;
mod executor;
mod logger;
mod pool;
mod signal;
mod task;
mod task_queue;
mod worker;

pub use config::{PoolConfig, DEFAULT_QUEUE_CAPACITY, DEFAULT_WORKER_COUNT, MAX_QUEUE_CAPACITY};
pub use error::{AggregateError, BoxError, FailureCause, PoolError, TaskFailure};
pub use executor::{ExecutablePool, PoolStatus};
pub use logger::PoolLogger;
pub use pool::TaskPool;
pub use signal::{CancelSignal, CancellationCause};
pub use task::TaskFuture;
