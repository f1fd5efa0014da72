//! Business-logic functions bound to event triggers.
//!
//! Every function here follows the idempotent-consumer contract: deliveries
//! are at-least-once with no ordering guarantee, so handlers upsert instead
//! of insert, tolerate absent targets, and put expensive or external work
//! behind durable steps so retries never repeat completed side effects.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;

use hireboard_ai::{DocumentFetcher, Summarizer};
use hireboard_directory::{DirectoryError, DirectoryStore};
use hireboard_events::{Event, FunctionRegistry, RegistryError, StepError};
use hireboard_notify::Mailer;

pub mod digest;
pub mod lifecycle;
pub mod ranking;
pub mod resume;

pub use digest::{PrepareDailyDigest, SendDailyDigest};
pub use lifecycle::{
    MembershipCreated, MembershipDeleted, OrgCreated, OrgDeleted, OrgUpdated, UserCreated,
    UserDeleted, UserUpdated,
};
pub use ranking::RankApplication;
pub use resume::ResumeSummarize;

/// Decode an event payload into a handler's expected shape.
///
/// A payload that does not decode can never succeed on retry, so the failure
/// is fatal rather than retryable.
pub(crate) fn parse_payload<T: DeserializeOwned>(event: &Event) -> Result<T, StepError> {
    serde_json::from_value(event.data().clone())
        .map_err(|e| StepError::fatal(format!("malformed payload for '{}': {e}", event.name())))
}

/// Map a directory failure onto the retry taxonomy: storage trouble is
/// transient, missing entities and dangling references are not.
pub(crate) fn store_step_err(err: DirectoryError) -> StepError {
    match err {
        DirectoryError::Storage(msg) => StepError::retryable(msg),
        DirectoryError::NotFound(what) => StepError::fatal(format!("not found: {what}")),
        DirectoryError::MissingReference(what) => {
            StepError::fatal(format!("missing reference: {what}"))
        }
    }
}

/// Build the full production registry: eight lifecycle sync functions, resume
/// summarization, application ranking, and the two digest crons.
pub fn build_registry(
    store: Arc<dyn DirectoryStore>,
    documents: Arc<dyn DocumentFetcher>,
    summarizer: Arc<dyn Summarizer>,
    mailer: Arc<dyn Mailer>,
    digest_period: Duration,
) -> Result<FunctionRegistry, RegistryError> {
    let mut registry = FunctionRegistry::new();
    registry.register(Arc::new(UserCreated::new(store.clone())))?;
    registry.register(Arc::new(UserUpdated::new(store.clone())))?;
    registry.register(Arc::new(UserDeleted::new(store.clone())))?;
    registry.register(Arc::new(OrgCreated::new(store.clone())))?;
    registry.register(Arc::new(OrgUpdated::new(store.clone())))?;
    registry.register(Arc::new(OrgDeleted::new(store.clone())))?;
    registry.register(Arc::new(MembershipCreated::new(store.clone())))?;
    registry.register(Arc::new(MembershipDeleted::new(store.clone())))?;
    registry.register(Arc::new(ResumeSummarize::new(
        store.clone(),
        documents.clone(),
        summarizer,
    )))?;
    registry.register(Arc::new(RankApplication::new(store.clone(), documents)))?;
    registry.register(Arc::new(PrepareDailyDigest::new(store.clone(), digest_period)))?;
    registry.register(Arc::new(SendDailyDigest::new(store, mailer, digest_period)))?;
    Ok(registry)
}
