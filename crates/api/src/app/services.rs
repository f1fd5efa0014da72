//! Platform wiring: directory store, collaborators, function registry,
//! dispatcher, background runner, and scheduler.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};

use hireboard_ai::{ExtractiveSummarizer, InMemoryDocuments};
use hireboard_directory::{DirectoryStore, InMemoryDirectory};
use hireboard_events::FunctionRegistry;
use hireboard_infra::{
    Dispatcher, InMemoryInvocationStore, InvocationRunner, PeriodicScheduler, RunnerConfig,
    RunnerHandle, RunnerStats, SchedulerHandle,
};
use hireboard_notify::LoggingMailer;

/// Everything the route handlers need, plus the background handles that keep
/// the runner and scheduler alive for the lifetime of the process.
pub struct AppServices {
    pub directory: Arc<dyn DirectoryStore>,
    pub documents: Arc<InMemoryDocuments>,
    pub registry: Arc<FunctionRegistry>,
    pub invocations: Arc<InMemoryInvocationStore>,
    pub dispatcher: Arc<Dispatcher<Arc<InMemoryInvocationStore>>>,
    pub started_at: DateTime<Utc>,
    runner: Mutex<Option<RunnerHandle>>,
    scheduler: Mutex<Option<SchedulerHandle>>,
}

impl AppServices {
    pub fn runner_stats(&self) -> RunnerStats {
        self.runner
            .lock()
            .unwrap()
            .as_ref()
            .map(|h| h.stats())
            .unwrap_or_default()
    }

    /// Stop the background loops (used by tests; the binary runs forever).
    pub fn shutdown(&self) {
        if let Some(handle) = self.scheduler.lock().unwrap().take() {
            handle.shutdown();
        }
        if let Some(handle) = self.runner.lock().unwrap().take() {
            handle.shutdown();
        }
    }
}

/// Select the directory store backend.
///
/// With the `postgres` feature compiled in and `DATABASE_URL` set, the
/// Postgres-backed store (`hireboard-infra`) is connected; otherwise the
/// in-memory store is used with a logged notice.
pub async fn directory_store() -> Arc<dyn DirectoryStore> {
    #[cfg(feature = "postgres")]
    if let Ok(url) = std::env::var("DATABASE_URL") {
        let store = hireboard_infra::directory_pg::PostgresDirectory::connect(&url)
            .await
            .expect("failed to connect to Postgres");
        tracing::info!("directory store: postgres");
        return Arc::new(store);
    }

    tracing::info!("DATABASE_URL not set or postgres support not compiled in; using the in-memory directory store");
    Arc::new(InMemoryDirectory::new())
}

/// Wiring around the chosen directory store: deterministic local
/// collaborators, the function registry, and the background loops.
pub fn build_services(directory: Arc<dyn DirectoryStore>, digest_period: Duration) -> AppServices {
    let documents = Arc::new(InMemoryDocuments::new());
    let summarizer = Arc::new(ExtractiveSummarizer::new());
    let mailer = Arc::new(LoggingMailer);

    let registry = Arc::new(
        hireboard_handlers::build_registry(
            directory.clone(),
            documents.clone(),
            summarizer,
            mailer,
            digest_period,
        )
        .expect("registry slugs are unique"),
    );

    let invocations = InMemoryInvocationStore::arc();
    let dispatcher = Arc::new(Dispatcher::new(registry.clone(), invocations.clone()));

    let runner = InvocationRunner::new(invocations.clone(), registry.clone())
        .spawn(RunnerConfig::default().with_name("hireboard-runner"));
    let scheduler = PeriodicScheduler::new(dispatcher.clone()).spawn();

    AppServices {
        directory,
        documents,
        registry,
        invocations,
        dispatcher,
        started_at: Utc::now(),
        runner: Mutex::new(Some(runner)),
        scheduler: Mutex::new(Some(scheduler)),
    }
}
