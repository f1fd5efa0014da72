//! Startup-time function registry.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use crate::{Function, Trigger};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("duplicate function slug: {0}")]
    DuplicateSlug(String),
}

/// Maps event names to the functions they trigger.
///
/// The registry is assembled once at startup and never mutated afterwards;
/// the ingress enumerates it for handshake/sync responses and the dispatcher
/// consults it on every delivery. Functions triggered by the same event run
/// as independent invocations, in registration order of creation but with no
/// execution-order guarantee.
#[derive(Default)]
pub struct FunctionRegistry {
    functions: Vec<Arc<dyn Function>>,
    by_event: HashMap<String, Vec<usize>>,
    by_slug: HashMap<&'static str, usize>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a function. Slugs must be unique across the registry.
    pub fn register(&mut self, function: Arc<dyn Function>) -> Result<(), RegistryError> {
        let slug = function.slug();
        if self.by_slug.contains_key(slug) {
            return Err(RegistryError::DuplicateSlug(slug.to_string()));
        }

        let idx = self.functions.len();
        self.by_event
            .entry(function.trigger().event_name().to_string())
            .or_default()
            .push(idx);
        self.by_slug.insert(slug, idx);
        self.functions.push(function);
        Ok(())
    }

    /// All registered functions, in registration order.
    pub fn functions(&self) -> &[Arc<dyn Function>] {
        &self.functions
    }

    /// Functions triggered by the given event name (registration order).
    pub fn matching(&self, event_name: &str) -> Vec<Arc<dyn Function>> {
        self.by_event
            .get(event_name)
            .map(|idxs| idxs.iter().map(|&i| self.functions[i].clone()).collect())
            .unwrap_or_default()
    }

    /// Look up a function by slug (invocation routing).
    pub fn get(&self, slug: &str) -> Option<Arc<dyn Function>> {
        self.by_slug.get(slug).map(|&i| self.functions[i].clone())
    }

    /// Periodic triggers registered, for the scheduler to drive.
    pub fn periodic_triggers(&self) -> Vec<Trigger> {
        let mut seen = std::collections::HashSet::new();
        self.functions
            .iter()
            .map(|f| f.trigger())
            .filter(|t| matches!(t, Trigger::Periodic { .. }))
            .filter(|t| seen.insert(t.event_name().to_string()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl std::fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("functions", &self.by_slug.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Event, StepContext, StepError};
    use std::time::Duration;

    struct Noop {
        slug: &'static str,
        trigger: Trigger,
    }

    impl Function for Noop {
        fn slug(&self) -> &'static str {
            self.slug
        }

        fn trigger(&self) -> Trigger {
            self.trigger.clone()
        }

        fn run(&self, _step: &mut StepContext, _event: &Event) -> Result<(), StepError> {
            Ok(())
        }
    }

    #[test]
    fn lookup_by_event_name_preserves_registration_order() {
        let mut reg = FunctionRegistry::new();
        reg.register(Arc::new(Noop {
            slug: "first",
            trigger: Trigger::event("user.created"),
        }))
        .unwrap();
        reg.register(Arc::new(Noop {
            slug: "second",
            trigger: Trigger::event("user.created"),
        }))
        .unwrap();
        reg.register(Arc::new(Noop {
            slug: "other",
            trigger: Trigger::event("user.deleted"),
        }))
        .unwrap();

        let matched = reg.matching("user.created");
        assert_eq!(matched.len(), 2);
        assert_eq!(matched[0].slug(), "first");
        assert_eq!(matched[1].slug(), "second");

        assert!(reg.matching("organization.created").is_empty());
    }

    #[test]
    fn duplicate_slug_is_rejected() {
        let mut reg = FunctionRegistry::new();
        reg.register(Arc::new(Noop {
            slug: "dup",
            trigger: Trigger::event("a"),
        }))
        .unwrap();
        let err = reg
            .register(Arc::new(Noop {
                slug: "dup",
                trigger: Trigger::event("b"),
            }))
            .unwrap_err();
        assert_eq!(err, RegistryError::DuplicateSlug("dup".to_string()));
    }

    #[test]
    fn periodic_triggers_deduplicate_by_name() {
        let mut reg = FunctionRegistry::new();
        reg.register(Arc::new(Noop {
            slug: "tick-a",
            trigger: Trigger::periodic("cron/tick", Duration::from_secs(60)),
        }))
        .unwrap();
        reg.register(Arc::new(Noop {
            slug: "tick-b",
            trigger: Trigger::periodic("cron/tick", Duration::from_secs(60)),
        }))
        .unwrap();

        assert_eq!(reg.periodic_triggers().len(), 1);
    }
}
