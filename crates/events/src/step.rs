//! Durable step execution within an invocation.
//!
//! An invocation is composed of named steps. Each step's result is memoized
//! in an append-only log that the execution platform persists between
//! attempts: on retry the log is replayed first, so completed steps are never
//! re-executed — only the failed/remaining steps run.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

/// A step failure, classified for the retry engine.
///
/// Transient failures (timeouts, 5xx, rate limits) are retried with backoff;
/// permanent input failures (missing entity, malformed payload) dead-letter
/// the invocation immediately.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StepError {
    /// Transient failure; the invocation will be retried with backoff.
    #[error("retryable: {0}")]
    Retryable(String),

    /// Permanent failure; the invocation is terminal.
    #[error("fatal: {0}")]
    Fatal(String),
}

impl StepError {
    pub fn retryable(msg: impl Into<String>) -> Self {
        Self::Retryable(msg.into())
    }

    pub fn fatal(msg: impl Into<String>) -> Self {
        Self::Fatal(msg.into())
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Retryable(_))
    }
}

/// Outcome of one step execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepStatus {
    /// The step completed; `value` is the memoized (JSON) result.
    Completed { value: JsonValue },
    /// The step failed on this attempt.
    Failed { error: String },
}

/// One entry in the append-only step log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub name: String,
    pub status: StepStatus,
    pub recorded_at: DateTime<Utc>,
}

/// Append-only log of step outcomes, keyed by invocation.
///
/// Retried attempts append new records rather than rewriting old ones, so the
/// log doubles as an execution trace for operators.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepLog {
    entries: Vec<StepRecord>,
}

impl StepLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[StepRecord] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Memoized result of a completed step, if any attempt completed it.
    pub fn completed(&self, name: &str) -> Option<&JsonValue> {
        self.entries.iter().find_map(|r| match &r.status {
            StepStatus::Completed { value } if r.name == name => Some(value),
            _ => None,
        })
    }

    fn append(&mut self, name: &str, status: StepStatus) {
        self.entries.push(StepRecord {
            name: name.to_string(),
            status,
            recorded_at: Utc::now(),
        });
    }
}

/// Execution context handed to a function for one attempt.
///
/// Wraps the persisted [`StepLog`]: `run` replays memoized results before
/// executing anything new, and records fresh outcomes for the platform to
/// persist after the attempt.
#[derive(Debug)]
pub struct StepContext {
    log: StepLog,
}

impl StepContext {
    pub fn new(log: StepLog) -> Self {
        Self { log }
    }

    pub fn fresh() -> Self {
        Self::new(StepLog::new())
    }

    /// Run a named step, memoizing its result.
    ///
    /// If a previous attempt already completed this step, the closure is
    /// **not** executed and the memoized value is returned. Results must be
    /// JSON-serializable so they can round-trip through the persisted log.
    pub fn run<T, F>(&mut self, name: &str, f: F) -> Result<T, StepError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Result<T, StepError>,
    {
        if let Some(value) = self.log.completed(name) {
            tracing::debug!(step = name, "replaying memoized step result");
            return serde_json::from_value(value.clone()).map_err(|e| {
                StepError::fatal(format!("corrupt memoized result for step '{name}': {e}"))
            });
        }

        match f() {
            Ok(value) => {
                let json = serde_json::to_value(&value).map_err(|e| {
                    StepError::fatal(format!("unserializable result for step '{name}': {e}"))
                })?;
                self.log.append(name, StepStatus::Completed { value: json });
                Ok(value)
            }
            Err(err) => {
                self.log.append(
                    name,
                    StepStatus::Failed {
                        error: err.to_string(),
                    },
                );
                Err(err)
            }
        }
    }

    pub fn log(&self) -> &StepLog {
        &self.log
    }

    /// Hand the updated log back to the platform for persistence.
    pub fn into_log(self) -> StepLog {
        self.log
    }
}
