//! Core invocation types and retry policies.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use hireboard_core::InvocationId;
use hireboard_events::{Event, StepLog};

/// Invocation execution status.
///
/// Cancellation is deliberately not modeled: retry exhaustion (dead-letter)
/// is the only termination-without-success path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvocationStatus {
    /// Queued, waiting to be picked up
    Pending,
    /// Currently being executed
    Running,
    /// Completed successfully
    Completed,
    /// Failed, will be retried after backoff
    Failed { error: String, attempt: u32 },
    /// Exhausted retries or hit a fatal error; moved to the DLQ
    DeadLettered { error: String, attempts: u32 },
}

impl InvocationStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::DeadLettered { .. })
    }

    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Backoff strategy for retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// Fixed delay between retries
    Fixed,
    /// Exponential backoff: base * 2^attempt
    Exponential,
    /// Linear backoff: base * attempt
    Linear,
}

impl Default for BackoffStrategy {
    fn default() -> Self {
        Self::Exponential
    }
}

/// Retry policy configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts (0 = no retries)
    pub max_attempts: u32,
    /// Base delay between retries
    pub base_delay: Duration,
    /// Maximum delay cap
    pub max_delay: Duration,
    /// Backoff strategy
    pub strategy: BackoffStrategy,
    /// Jitter factor (0.0-1.0) to add randomness
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(60),
            strategy: BackoffStrategy::Exponential,
            jitter: 0.1,
        }
    }
}

impl RetryPolicy {
    /// Create a policy with no retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 0,
            ..Default::default()
        }
    }

    /// Create a policy with fixed delays.
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay: delay,
            max_delay: delay,
            strategy: BackoffStrategy::Fixed,
            jitter: 0.0,
        }
    }

    /// Create a policy with exponential backoff.
    pub fn exponential(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_delay,
            strategy: BackoffStrategy::Exponential,
            jitter: 0.1,
        }
    }

    /// Calculate delay for a given attempt number (1-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let base_ms = self.base_delay.as_millis() as f64;
        let max_ms = self.max_delay.as_millis() as f64;

        let delay_ms = match self.strategy {
            BackoffStrategy::Fixed => base_ms,
            BackoffStrategy::Exponential => {
                let exp = 2_f64.powi((attempt - 1) as i32);
                (base_ms * exp).min(max_ms)
            }
            BackoffStrategy::Linear => {
                let linear = base_ms * (attempt as f64);
                linear.min(max_ms)
            }
        };

        // Apply jitter
        let jitter_range = delay_ms * self.jitter;
        let jitter = if jitter_range > 0.0 {
            // Simple deterministic "jitter" based on attempt
            let pseudo_random = ((attempt as f64 * 17.0) % 100.0) / 100.0;
            jitter_range * (pseudo_random - 0.5) * 2.0
        } else {
            0.0
        };

        Duration::from_millis((delay_ms + jitter).max(0.0) as u64)
    }

    /// Check if more retries are allowed.
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

/// One durable execution of a function for one event occurrence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invocation {
    /// Unique invocation ID
    pub id: InvocationId,
    /// Slug of the function this invocation runs
    pub function_slug: String,
    /// The triggering event (carried whole so retries re-see the same input)
    pub event: Event,
    /// Current status
    pub status: InvocationStatus,
    /// Retry policy
    pub retry_policy: RetryPolicy,
    /// Current attempt number (starts at 0)
    pub attempt: u32,
    /// Append-only step log persisted between attempts
    pub step_log: StepLog,
    /// When the invocation was created
    pub created_at: DateTime<Utc>,
    /// When the invocation was last updated
    pub updated_at: DateTime<Utc>,
    /// When the invocation should next run (backoff/delayed execution)
    pub scheduled_at: Option<DateTime<Utc>>,
    /// Execution history (outcome of previous attempts)
    pub history: Vec<AttemptRecord>,
}

/// Record of one execution attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub attempt: u32,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub success: bool,
    pub error: Option<String>,
    pub duration_ms: u64,
}

impl Invocation {
    pub fn new(function_slug: impl Into<String>, event: Event) -> Self {
        let now = Utc::now();
        Self {
            id: InvocationId::new(),
            function_slug: function_slug.into(),
            event,
            status: InvocationStatus::Pending,
            retry_policy: RetryPolicy::default(),
            attempt: 0,
            step_log: StepLog::new(),
            created_at: now,
            updated_at: now,
            scheduled_at: None,
            history: Vec::new(),
        }
    }

    /// Set a custom retry policy.
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Check if the invocation is ready to execute.
    pub fn is_ready(&self) -> bool {
        match self.scheduled_at {
            Some(at) => Utc::now() >= at,
            None => true,
        }
    }

    /// Mark invocation as running (one more attempt underway).
    pub fn mark_running(&mut self) {
        self.status = InvocationStatus::Running;
        self.attempt += 1;
        self.updated_at = Utc::now();
    }

    /// Mark invocation as completed.
    pub fn mark_completed(&mut self, started_at: DateTime<Utc>) {
        let now = Utc::now();
        self.status = InvocationStatus::Completed;
        self.updated_at = now;
        self.history.push(AttemptRecord {
            attempt: self.attempt,
            started_at,
            finished_at: now,
            success: true,
            error: None,
            duration_ms: (now - started_at).num_milliseconds().max(0) as u64,
        });
    }

    /// Mark invocation as failed.
    ///
    /// A retryable failure within the attempt budget schedules a backoff
    /// retry; a fatal failure or an exhausted budget dead-letters the
    /// invocation immediately.
    pub fn mark_failed(&mut self, error: String, retryable: bool, started_at: DateTime<Utc>) {
        let now = Utc::now();
        self.updated_at = now;
        self.history.push(AttemptRecord {
            attempt: self.attempt,
            started_at,
            finished_at: now,
            success: false,
            error: Some(error.clone()),
            duration_ms: (now - started_at).num_milliseconds().max(0) as u64,
        });

        if retryable && self.retry_policy.should_retry(self.attempt) {
            let delay = self.retry_policy.delay_for_attempt(self.attempt);
            self.scheduled_at = Some(now + chrono::Duration::from_std(delay).unwrap_or_default());
            self.status = InvocationStatus::Failed {
                error,
                attempt: self.attempt,
            };
        } else {
            self.status = InvocationStatus::DeadLettered {
                error,
                attempts: self.attempt,
            };
        }
    }
}

/// Entry in the dead-letter queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadLetterEntry {
    pub invocation: Invocation,
    pub dead_lettered_at: DateTime<Utc>,
    pub reason: String,
}

impl DeadLetterEntry {
    pub fn new(invocation: Invocation, reason: String) -> Self {
        Self {
            invocation,
            dead_lettered_at: Utc::now(),
            reason,
        }
    }
}
