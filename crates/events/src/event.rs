//! Inbound event representation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use hireboard_core::EventId;

/// Well-known event names.
///
/// The identity-provider lifecycle names are fixed by its webhook contract;
/// the `app/` names are emitted internally; `cron/` names are synthetic
/// events produced by the scheduler.
pub mod names {
    pub const USER_CREATED: &str = "user.created";
    pub const USER_UPDATED: &str = "user.updated";
    pub const USER_DELETED: &str = "user.deleted";
    pub const ORG_CREATED: &str = "organization.created";
    pub const ORG_UPDATED: &str = "organization.updated";
    pub const ORG_DELETED: &str = "organization.deleted";
    pub const MEMBERSHIP_CREATED: &str = "organizationMembership.created";
    pub const MEMBERSHIP_DELETED: &str = "organizationMembership.deleted";

    pub const RESUME_UPLOADED: &str = "app/resume.uploaded";
    pub const APPLICATION_SUBMITTED: &str = "app/application.submitted";

    pub const DIGEST_PREPARE: &str = "cron/digest.prepare";
    pub const DIGEST_SEND: &str = "cron/digest.send";
}

/// One event occurrence handed to the dispatcher.
///
/// Events are immutable facts: the ingress assigns an id and a receive
/// timestamp, and the payload is carried as raw JSON so the dispatcher stays
/// agnostic of individual function contracts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    id: EventId,
    name: String,
    data: JsonValue,
    received_at: DateTime<Utc>,
}

impl Event {
    pub fn new(name: impl Into<String>, data: JsonValue) -> Self {
        Self {
            id: EventId::new(),
            name: name.into(),
            data,
            received_at: Utc::now(),
        }
    }

    /// Rebuild an event with explicit metadata (persistence/replay path).
    pub fn with_metadata(
        id: EventId,
        name: impl Into<String>,
        data: JsonValue,
        received_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            data,
            received_at,
        }
    }

    pub fn id(&self) -> EventId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &JsonValue {
        &self.data
    }

    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }
}
