//! Mail delivery collaborator.

use std::collections::HashSet;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MailError {
    /// The provider rejected the message (bad address, content). Permanent.
    #[error("delivery rejected for {recipient}: {reason}")]
    Rejected { recipient: String, reason: String },

    /// The provider is unreachable or rate limiting. Retryable.
    #[error("delivery service unavailable: {0}")]
    Unavailable(String),
}

impl MailError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// A rendered message ready for delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Provider acknowledgment for one accepted message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryAck {
    pub message_id: String,
    pub accepted_at: DateTime<Utc>,
}

impl DeliveryAck {
    pub fn new() -> Self {
        Self {
            message_id: Uuid::now_v7().to_string(),
            accepted_at: Utc::now(),
        }
    }
}

impl Default for DeliveryAck {
    fn default() -> Self {
        Self::new()
    }
}

/// Email delivery capability (external black box).
///
/// Call sites must bound delivery with a timeout and treat expiry as
/// [`MailError::Unavailable`].
pub trait Mailer: Send + Sync {
    fn send(&self, message: &EmailMessage) -> Result<DeliveryAck, MailError>;
}

/// Records messages instead of sending them. Test double.
#[derive(Debug, Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<EmailMessage>>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }
}

impl Mailer for RecordingMailer {
    fn send(&self, message: &EmailMessage) -> Result<DeliveryAck, MailError> {
        self.sent.lock().unwrap().push(message.clone());
        Ok(DeliveryAck::new())
    }
}

/// Fails delivery for a configured set of recipients, succeeds otherwise.
/// Exercises the per-recipient failure-isolation contract in tests.
#[derive(Debug, Default)]
pub struct FlakyMailer {
    failing: HashSet<String>,
    delivered: Mutex<Vec<EmailMessage>>,
}

impl FlakyMailer {
    pub fn failing_for<I, S>(recipients: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            failing: recipients.into_iter().map(Into::into).collect(),
            delivered: Mutex::new(Vec::new()),
        }
    }

    pub fn delivered(&self) -> Vec<EmailMessage> {
        self.delivered.lock().unwrap().clone()
    }
}

impl Mailer for FlakyMailer {
    fn send(&self, message: &EmailMessage) -> Result<DeliveryAck, MailError> {
        if self.failing.contains(&message.to) {
            return Err(MailError::Unavailable(format!(
                "simulated outage for {}",
                message.to
            )));
        }
        self.delivered.lock().unwrap().push(message.clone());
        Ok(DeliveryAck::new())
    }
}

/// Logs deliveries instead of sending them. Dev wiring default.
#[derive(Debug, Default)]
pub struct LoggingMailer;

impl Mailer for LoggingMailer {
    fn send(&self, message: &EmailMessage) -> Result<DeliveryAck, MailError> {
        tracing::info!(to = %message.to, subject = %message.subject, "email delivery (logging mailer)");
        Ok(DeliveryAck::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flaky_mailer_isolates_recipients() {
        let mailer = FlakyMailer::failing_for(["down@example.com"]);

        let ok = mailer.send(&EmailMessage {
            to: "up@example.com".to_string(),
            subject: "digest".to_string(),
            body: "body".to_string(),
        });
        assert!(ok.is_ok());

        let err = mailer
            .send(&EmailMessage {
                to: "down@example.com".to_string(),
                subject: "digest".to_string(),
                body: "body".to_string(),
            })
            .unwrap_err();
        assert!(err.is_transient());
        assert_eq!(mailer.delivered().len(), 1);
    }
}
