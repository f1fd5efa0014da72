//! Periodic trigger scheduler.
//!
//! Periodic functions are driven by synthetic events: the scheduler ticks
//! each registered periodic trigger on its period and hands the resulting
//! event to the dispatcher like any webhook delivery. Everything downstream
//! (fan-out, retries, dead-letters) is identical for both kinds of trigger.

use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};

use serde_json::json;
use tracing::{debug, info, warn};

use hireboard_events::{Event, Trigger};

use crate::dispatcher::Dispatcher;
use crate::invocations::InvocationStore;

/// Handle to control a running scheduler.
#[derive(Debug)]
pub struct SchedulerHandle {
    shutdown: mpsc::Sender<()>,
    join: Option<thread::JoinHandle<()>>,
}

impl SchedulerHandle {
    /// Request graceful shutdown and wait for the loop to exit.
    pub fn shutdown(mut self) {
        let _ = self.shutdown.send(());
        if let Some(j) = self.join.take() {
            let _ = j.join();
        }
    }
}

struct TickerEntry {
    name: String,
    every: Duration,
    next_due: Instant,
}

/// Emits synthetic events for periodic triggers.
pub struct PeriodicScheduler<S> {
    dispatcher: Arc<Dispatcher<S>>,
    resolution: Duration,
}

impl<S: InvocationStore + Send + Sync + 'static> PeriodicScheduler<S> {
    pub fn new(dispatcher: Arc<Dispatcher<S>>) -> Self {
        Self {
            dispatcher,
            resolution: Duration::from_millis(250),
        }
    }

    /// How often the loop wakes up to check for due triggers.
    pub fn with_resolution(mut self, resolution: Duration) -> Self {
        self.resolution = resolution;
        self
    }

    /// Spawn the scheduler in a background thread.
    ///
    /// The first tick of each trigger fires one full period after startup;
    /// the registry's periodic triggers are fixed from this point on.
    pub fn spawn(self) -> SchedulerHandle {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let join = thread::Builder::new()
            .name("periodic-scheduler".to_string())
            .spawn(move || {
                self.run_loop(shutdown_rx);
            })
            .expect("failed to spawn scheduler thread");

        SchedulerHandle {
            shutdown: shutdown_tx,
            join: Some(join),
        }
    }

    fn run_loop(self, shutdown_rx: mpsc::Receiver<()>) {
        let now = Instant::now();
        let mut entries: Vec<TickerEntry> = self
            .dispatcher
            .registry()
            .periodic_triggers()
            .into_iter()
            .filter_map(|t| match t {
                Trigger::Periodic { name, every } => Some(TickerEntry {
                    name,
                    every,
                    next_due: now + every,
                }),
                Trigger::Event { .. } => None,
            })
            .collect();

        info!(triggers = entries.len(), "periodic scheduler started");

        loop {
            match shutdown_rx.recv_timeout(self.resolution) {
                Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => break,
                Err(mpsc::RecvTimeoutError::Timeout) => {}
            }

            let now = Instant::now();
            for entry in &mut entries {
                if now < entry.next_due {
                    continue;
                }

                let event = Event::new(
                    entry.name.clone(),
                    json!({ "tick": chrono::Utc::now() }),
                );
                match self.dispatcher.dispatch(&event) {
                    Ok(ids) => {
                        debug!(trigger = %entry.name, invocations = ids.len(), "periodic tick dispatched");
                    }
                    Err(e) => {
                        warn!(trigger = %entry.name, error = %e, "failed to dispatch periodic tick");
                    }
                }

                // Catch up without bursting: schedule strictly in the future.
                while entry.next_due <= now {
                    entry.next_due += entry.every;
                }
            }
        }

        info!("periodic scheduler stopped");
    }
}
