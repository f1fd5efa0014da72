//! Function triggers.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// What causes a function to be invoked.
///
/// Both variants carry an event name: periodic functions are driven by
/// synthetic events the scheduler emits under the trigger's name, so the
/// dispatcher matches every function the same way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Trigger {
    /// Run when an event with this name is delivered.
    Event { name: String },
    /// Run on a fixed period; the scheduler emits an event under `name`.
    Periodic { name: String, every: Duration },
}

impl Trigger {
    pub fn event(name: impl Into<String>) -> Self {
        Self::Event { name: name.into() }
    }

    pub fn periodic(name: impl Into<String>, every: Duration) -> Self {
        Self::Periodic {
            name: name.into(),
            every,
        }
    }

    /// The event name this trigger matches on.
    pub fn event_name(&self) -> &str {
        match self {
            Trigger::Event { name } => name,
            Trigger::Periodic { name, .. } => name,
        }
    }

    /// The period for periodic triggers.
    pub fn period(&self) -> Option<Duration> {
        match self {
            Trigger::Event { .. } => None,
            Trigger::Periodic { every, .. } => Some(*every),
        }
    }
}
