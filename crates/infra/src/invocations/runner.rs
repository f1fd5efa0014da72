//! Invocation runner with retry and backoff logic.

use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{debug, error, info, warn};

use hireboard_events::{FunctionRegistry, StepContext};

use super::store::{InvocationStore, InvocationStoreError};
use super::types::{Invocation, InvocationStatus};

/// Runner configuration.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// How often to poll for ready invocations
    pub poll_interval: Duration,
    /// Name for logging
    pub name: String,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            name: "invocation-runner".to_string(),
        }
    }
}

impl RunnerConfig {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

/// Handle to control a running runner.
#[derive(Debug)]
pub struct RunnerHandle {
    shutdown: mpsc::Sender<()>,
    join: Option<thread::JoinHandle<()>>,
    stats: Arc<Mutex<RunnerStats>>,
}

impl RunnerHandle {
    /// Request graceful shutdown and wait for the loop to exit.
    pub fn shutdown(mut self) {
        let _ = self.shutdown.send(());
        if let Some(j) = self.join.take() {
            let _ = j.join();
        }
    }

    /// Current runtime statistics.
    pub fn stats(&self) -> RunnerStats {
        self.stats.lock().unwrap().clone()
    }
}

/// Runner runtime statistics.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct RunnerStats {
    pub invocations_processed: u64,
    pub invocations_succeeded: u64,
    pub invocations_failed: u64,
    pub invocations_dead_lettered: u64,
    pub uptime_secs: u64,
}

/// Background invocation runner.
///
/// Polls the store for ready invocations, executes them against the function
/// registry with a replayed step context, and handles retries and
/// dead-lettering. Failures never propagate past the invocation they belong
/// to.
pub struct InvocationRunner<S: InvocationStore> {
    store: S,
    registry: Arc<FunctionRegistry>,
}

impl<S: InvocationStore + 'static> InvocationRunner<S> {
    pub fn new(store: S, registry: Arc<FunctionRegistry>) -> Self {
        Self { store, registry }
    }

    /// Spawn the runner in a background thread.
    pub fn spawn(self, config: RunnerConfig) -> RunnerHandle
    where
        S: Send,
    {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let stats = Arc::new(Mutex::new(RunnerStats::default()));
        let stats_clone = stats.clone();

        let name = config.name.clone();
        let join = thread::Builder::new()
            .name(name)
            .spawn(move || {
                runner_loop(self, config, shutdown_rx, stats_clone);
            })
            .expect("failed to spawn invocation runner thread");

        RunnerHandle {
            shutdown: shutdown_tx,
            join: Some(join),
            stats,
        }
    }

    /// Execute a single claimed invocation (also used directly in tests).
    ///
    /// The invocation must already be marked running by `claim_next`.
    pub fn execute_one(&self, invocation: &mut Invocation) -> Result<(), String> {
        let Some(function) = self.registry.get(&invocation.function_slug) else {
            let error = format!("no registered function: {}", invocation.function_slug);
            warn!(invocation_id = %invocation.id, error = %error, "unroutable invocation");
            invocation.mark_failed(error.clone(), false, Utc::now());
            self.store
                .dead_letter(invocation.clone(), error.clone())
                .map_err(|e| e.to_string())?;
            return Err(error);
        };

        let started = Utc::now();

        // Replay the persisted step log so completed steps are not re-run.
        let mut ctx = StepContext::new(invocation.step_log.clone());
        let result = function.run(&mut ctx, &invocation.event);
        invocation.step_log = ctx.into_log();

        match result {
            Ok(()) => {
                invocation.mark_completed(started);
                self.store.update(invocation).map_err(|e| e.to_string())?;
                debug!(invocation_id = %invocation.id, function = %invocation.function_slug, "invocation completed");
                Ok(())
            }
            Err(step_err) => {
                let error = step_err.to_string();
                invocation.mark_failed(error.clone(), step_err.is_retryable(), started);
                self.store.update(invocation).map_err(|e| e.to_string())?;

                if matches!(invocation.status, InvocationStatus::DeadLettered { .. }) {
                    warn!(invocation_id = %invocation.id, error = %error, "invocation dead-lettered");
                    self.store
                        .dead_letter(invocation.clone(), error.clone())
                        .map_err(|e| e.to_string())?;
                }

                Err(error)
            }
        }
    }

    fn claim(&self) -> Result<Option<Invocation>, InvocationStoreError> {
        self.store.claim_next()
    }
}

fn runner_loop<S: InvocationStore + 'static>(
    runner: InvocationRunner<S>,
    config: RunnerConfig,
    shutdown_rx: mpsc::Receiver<()>,
    stats: Arc<Mutex<RunnerStats>>,
) {
    info!(runner = %config.name, "invocation runner started");
    let start_time = Instant::now();

    loop {
        if shutdown_rx.try_recv().is_ok() {
            break;
        }

        {
            let mut s = stats.lock().unwrap();
            s.uptime_secs = start_time.elapsed().as_secs();
        }

        match runner.claim() {
            Ok(Some(mut invocation)) => {
                debug!(
                    runner = %config.name,
                    invocation_id = %invocation.id,
                    function = %invocation.function_slug,
                    attempt = invocation.attempt,
                    "claimed invocation"
                );

                let result = runner.execute_one(&mut invocation);

                let mut s = stats.lock().unwrap();
                s.invocations_processed += 1;
                match result {
                    Ok(()) => s.invocations_succeeded += 1,
                    Err(_) => {
                        s.invocations_failed += 1;
                        if matches!(invocation.status, InvocationStatus::DeadLettered { .. }) {
                            s.invocations_dead_lettered += 1;
                        }
                    }
                }
            }
            Ok(None) => {
                thread::sleep(config.poll_interval);
            }
            Err(e) => {
                error!(runner = %config.name, error = ?e, "failed to claim invocation");
                thread::sleep(config.poll_interval);
            }
        }
    }

    info!(runner = %config.name, "invocation runner stopped");
}
