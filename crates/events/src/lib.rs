//! Event model and dispatch abstractions (mechanics only).
//!
//! This crate defines the contracts between the event ingress, the
//! dispatcher, and the business-logic functions:
//!
//! - [`Event`]: an inbound event occurrence (webhook delivery or schedule tick)
//! - [`Trigger`]: what causes a function to run (an event name or a period)
//! - [`Function`]: a unit of business logic bound to one trigger
//! - [`StepContext`]: durable, memoizing step execution within an invocation
//! - [`FunctionRegistry`]: the startup-time mapping from triggers to functions
//!
//! Delivery is **at-least-once** with **no ordering guarantee**: functions
//! must be idempotent at the level of their externally observable writes and
//! must defensively check current state rather than assume arrival order.

pub mod event;
pub mod function;
pub mod registry;
pub mod step;
pub mod trigger;

pub use event::{names, Event};
pub use function::Function;
pub use registry::{FunctionRegistry, RegistryError};
pub use step::{StepContext, StepError, StepLog, StepRecord, StepStatus};
pub use trigger::Trigger;
