//! Function (handler) contract.

use crate::{Event, StepContext, StepError, Trigger};

/// A unit of business logic bound to one trigger.
///
/// Functions are registered once at startup and invoked by the execution
/// platform, possibly concurrently and possibly more than once per event
/// occurrence. Implementations must therefore be **idempotent** at the level
/// of their externally observable writes: the platform may re-invoke a
/// function after partial failure, replaying completed steps from the
/// persisted log.
///
/// No cross-event ordering is guaranteed. A function that cares about
/// create-before-update for the same entity must check current state instead
/// of assuming arrival order.
pub trait Function: Send + Sync + 'static {
    /// Stable function identifier (used for invocation routing and logs).
    fn slug(&self) -> &'static str;

    /// What causes this function to run.
    fn trigger(&self) -> Trigger;

    /// Execute one attempt of this function.
    ///
    /// Long or expensive work belongs inside [`StepContext::run`] steps so
    /// the result survives a later failure within the same invocation.
    fn run(&self, step: &mut StepContext, event: &Event) -> Result<(), StepError>;
}
