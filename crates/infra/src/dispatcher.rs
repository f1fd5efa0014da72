//! Event → invocation fan-out.

use std::sync::Arc;

use tracing::debug;

use hireboard_core::InvocationId;
use hireboard_events::{Event, FunctionRegistry};

use crate::invocations::{Invocation, InvocationStore, InvocationStoreError, RetryPolicy};

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("invocation store error: {0}")]
    Store(#[from] InvocationStoreError),
}

/// Owns the mapping from delivered events to durable invocations.
///
/// One invocation is created per function registered for the event's name;
/// invocations are independent of each other from that point on. An event
/// that matches no function dispatches nothing — that is normal platform
/// behavior for event names this deployment does not handle.
pub struct Dispatcher<S> {
    registry: Arc<FunctionRegistry>,
    store: S,
    retry_policy: RetryPolicy,
}

impl<S: InvocationStore> Dispatcher<S> {
    pub fn new(registry: Arc<FunctionRegistry>, store: S) -> Self {
        Self {
            registry,
            store,
            retry_policy: RetryPolicy::default(),
        }
    }

    /// Override the retry policy applied to new invocations.
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn registry(&self) -> &Arc<FunctionRegistry> {
        &self.registry
    }

    /// Enqueue one invocation per function triggered by this event.
    pub fn dispatch(&self, event: &Event) -> Result<Vec<InvocationId>, DispatchError> {
        let functions = self.registry.matching(event.name());
        if functions.is_empty() {
            debug!(event = %event.name(), "no functions registered for event");
            return Ok(Vec::new());
        }

        let mut ids = Vec::with_capacity(functions.len());
        for function in functions {
            let invocation = Invocation::new(function.slug(), event.clone())
                .with_retry_policy(self.retry_policy.clone());
            let id = self.store.enqueue(invocation)?;
            debug!(
                event = %event.name(),
                function = function.slug(),
                invocation_id = %id,
                "invocation enqueued"
            );
            ids.push(id);
        }
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invocations::InMemoryInvocationStore;
    use hireboard_events::{Function, StepContext, StepError, Trigger};
    use serde_json::json;

    struct Noop {
        slug: &'static str,
        event: &'static str,
    }

    impl Function for Noop {
        fn slug(&self) -> &'static str {
            self.slug
        }

        fn trigger(&self) -> Trigger {
            Trigger::event(self.event)
        }

        fn run(&self, _step: &mut StepContext, _event: &Event) -> Result<(), StepError> {
            Ok(())
        }
    }

    #[test]
    fn dispatch_fans_out_per_function() {
        let mut registry = FunctionRegistry::new();
        registry
            .register(Arc::new(Noop { slug: "a", event: "user.created" }))
            .unwrap();
        registry
            .register(Arc::new(Noop { slug: "b", event: "user.created" }))
            .unwrap();
        registry
            .register(Arc::new(Noop { slug: "c", event: "user.deleted" }))
            .unwrap();

        let store = InMemoryInvocationStore::arc();
        let dispatcher = Dispatcher::new(Arc::new(registry), store.clone());

        let ids = dispatcher
            .dispatch(&Event::new("user.created", json!({})))
            .unwrap();
        assert_eq!(ids.len(), 2);
        assert_eq!(store.stats().unwrap().pending, 2);
    }

    #[test]
    fn unknown_event_dispatches_nothing() {
        let store = InMemoryInvocationStore::arc();
        let dispatcher = Dispatcher::new(Arc::new(FunctionRegistry::new()), store.clone());

        let ids = dispatcher
            .dispatch(&Event::new("organizationMembership.updated", json!({})))
            .unwrap();
        assert!(ids.is_empty());
        assert_eq!(store.stats().unwrap().pending, 0);
    }
}
