//! Email delivery boundary and digest rendering.
//!
//! The delivery service is an external collaborator reachable only through
//! the [`Mailer`] trait; this crate also turns staged digest payloads into
//! rendered messages and ships in-memory mailers for tests and dev wiring.

pub mod digest;
pub mod mailer;

pub use digest::render_digest;
pub use mailer::{
    DeliveryAck, EmailMessage, FlakyMailer, LoggingMailer, MailError, Mailer, RecordingMailer,
};
