//! Execution platform: durable invocations with retry, backoff, and
//! dead-letter handling, plus the dispatcher and scheduler that feed it.
//!
//! ## Design
//!
//! - One [`invocations::Invocation`] per (event, function) pair; each carries
//!   its own persisted step log so completed steps survive retries.
//! - Retry policy with exponential backoff; exhausted or fatal invocations
//!   move to the dead-letter queue for operator review.
//! - [`dispatcher::Dispatcher`] maps delivered events onto registered
//!   functions; [`invocations::InvocationRunner`] executes claimed
//!   invocations on a background thread.
//! - [`schedule::PeriodicScheduler`] emits synthetic events for periodic
//!   triggers (digest preparation/sending).

pub mod dispatcher;
pub mod invocations;
pub mod schedule;

#[cfg(feature = "postgres")]
pub mod directory_pg;

pub use dispatcher::{DispatchError, Dispatcher};
pub use invocations::{
    AttemptRecord, BackoffStrategy, DeadLetterEntry, InMemoryInvocationStore, Invocation,
    InvocationRunner, InvocationStats, InvocationStatus, InvocationStore, InvocationStoreError,
    RetryPolicy, RunnerConfig, RunnerHandle, RunnerStats,
};
pub use schedule::{PeriodicScheduler, SchedulerHandle};
