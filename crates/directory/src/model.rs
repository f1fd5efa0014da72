//! Directory entities.
//!
//! Identifier fields for users and organizations are assigned by the identity
//! provider and treated as immutable; everything else is last-write-wins at
//! the row level, with `updated_at` stamped on every mutation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use hireboard_core::{ApplicationId, ListingId, OrgId, ResumeId, UserId};

/// Whether an account browses listings or posts them.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserKind {
    JobSeeker,
    Employer,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub kind: UserKind,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(id: UserId, name: impl Into<String>, email: impl Into<String>, kind: UserKind) -> Self {
        let now = Utc::now();
        Self {
            id,
            name: name.into(),
            email: email.into(),
            kind,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    pub id: OrgId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Organization {
    pub fn new(id: OrgId, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            name: name.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipRole {
    Member,
    Admin,
}

/// Join entity between [`User`] and [`Organization`].
///
/// Keyed by the (user, org) pair; role changes arrive as delete+create from
/// the identity provider, so there is no update path here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Membership {
    pub user_id: UserId,
    pub org_id: OrgId,
    pub role: MembershipRole,
    pub created_at: DateTime<Utc>,
}

impl Membership {
    pub fn new(user_id: UserId, org_id: OrgId, role: MembershipRole) -> Self {
        Self {
            user_id,
            org_id,
            role,
            created_at: Utc::now(),
        }
    }
}

/// An uploaded resume. `summary` stays absent until the summarization
/// function completes; a missing summary is never surfaced as an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resume {
    pub id: ResumeId,
    pub user_id: UserId,
    /// Opaque reference to the uploaded document (storage key/URL).
    pub document_ref: String,
    pub summary: Option<String>,
    pub uploaded_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Resume {
    pub fn new(id: ResumeId, user_id: UserId, document_ref: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            user_id,
            document_ref: document_ref.into(),
            summary: None,
            uploaded_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingStatus {
    Draft,
    Published,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobListing {
    pub id: ListingId,
    pub org_id: OrgId,
    pub title: String,
    pub description: String,
    pub status: ListingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobListing {
    pub fn new(
        id: ListingId,
        org_id: OrgId,
        title: impl Into<String>,
        description: impl Into<String>,
        status: ListingStatus,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            org_id,
            title: title.into(),
            description: description.into(),
            status,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStage {
    Applied,
    Interested,
    Interviewed,
    Hired,
    Denied,
}

/// One user's application to one listing. `rank` is populated asynchronously
/// by the ranking function; recomputation overwrites, never appends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobListingApplication {
    pub id: ApplicationId,
    pub listing_id: ListingId,
    pub user_id: UserId,
    pub stage: ApplicationStage,
    /// Fit score in [0, 100]; absent until computed.
    pub rank: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobListingApplication {
    pub fn new(id: ApplicationId, listing_id: ListingId, user_id: UserId) -> Self {
        let now = Utc::now();
        Self {
            id,
            listing_id,
            user_id,
            stage: ApplicationStage::Applied,
            rank: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Per-user digest preferences, read by the scheduled digest functions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationSubscription {
    pub user_id: UserId,
    pub active: bool,
    /// Case-insensitive terms a listing must match; empty matches everything.
    pub search_terms: Vec<String>,
    /// Listings created after this instant are "new" for the next digest.
    pub last_digest_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl NotificationSubscription {
    pub fn new(user_id: UserId, active: bool, search_terms: Vec<String>) -> Self {
        Self {
            user_id,
            active,
            search_terms,
            last_digest_at: None,
            updated_at: Utc::now(),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DigestStatus {
    Staged,
    Sent,
}

/// Minimal listing view embedded in a staged digest payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DigestListing {
    pub listing_id: ListingId,
    pub title: String,
    pub org_name: String,
}

/// A per-user digest payload staged by `prepare-daily-digest` and consumed
/// by `send-daily-digest`. One staged digest per user; re-staging before the
/// send happens merges by replacement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StagedDigest {
    pub user_id: UserId,
    pub recipient_email: String,
    pub listings: Vec<DigestListing>,
    pub status: DigestStatus,
    pub staged_at: DateTime<Utc>,
}

impl StagedDigest {
    pub fn new(user_id: UserId, recipient_email: impl Into<String>, listings: Vec<DigestListing>) -> Self {
        Self {
            user_id,
            recipient_email: recipient_email.into(),
            listings,
            status: DigestStatus::Staged,
            staged_at: Utc::now(),
        }
    }
}
