//! Durable invocation machinery.
//!
//! ## Components
//!
//! - `Invocation`: one execution of a function for one event occurrence,
//!   carrying its append-only step log across attempts
//! - `InvocationStore`: persistence for invocations (in-memory or durable)
//! - `InvocationRunner`: claims and executes invocations with retry logic
//! - Dead-letter queue: terminal failures kept for inspection/replay

pub mod runner;
pub mod store;
pub mod types;

pub use runner::{InvocationRunner, RunnerConfig, RunnerHandle, RunnerStats};
pub use store::{InMemoryInvocationStore, InvocationStats, InvocationStore, InvocationStoreError};
pub use types::{
    AttemptRecord, BackoffStrategy, DeadLetterEntry, Invocation, InvocationStatus, RetryPolicy,
};
