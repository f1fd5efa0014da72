//! Directory store abstraction.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use hireboard_core::{ApplicationId, ListingId, OrgId, ResumeId, UserId};

use crate::model::{
    JobListing, JobListingApplication, Membership, NotificationSubscription, Organization,
    Resume, StagedDigest, User,
};

/// Directory store error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DirectoryError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("missing reference: {0}")]
    MissingReference(String),
    #[error("storage error: {0}")]
    Storage(String),
}

/// Whether an upsert created a fresh row or replaced an existing one.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Upserted {
    Created,
    Updated,
}

/// Transactional CRUD over the directory entities.
///
/// Semantics every implementation must provide:
///
/// - `upsert_*`: create-if-absent, update-if-present; tolerant of duplicate
///   event delivery.
/// - `update_*`: conditional; returns `false` (not an error) when the entity
///   does not exist — the caller treats that as an ordering gap.
/// - `delete_*`: idempotent; returns `false` when already absent. User and
///   organization deletion cascade to their owned rows.
/// - `create_membership`: validates both endpoints exist and deduplicates on
///   the (user, org) pair; two concurrent calls for the same pair must yield
///   exactly one row.
/// - `set_resume_summary` / `set_application_rank`: deterministic overwrite;
///   safe to repeat.
pub trait DirectoryStore: Send + Sync {
    // Users
    fn upsert_user(&self, user: User) -> Result<Upserted, DirectoryError>;
    fn update_user(&self, id: UserId, name: String, email: String) -> Result<bool, DirectoryError>;
    fn get_user(&self, id: UserId) -> Result<Option<User>, DirectoryError>;
    /// Delete a user and cascade to resumes, applications, subscription, and
    /// staged digests. Memberships referencing the user are removed too.
    fn delete_user(&self, id: UserId) -> Result<bool, DirectoryError>;

    // Organizations
    fn upsert_org(&self, org: Organization) -> Result<Upserted, DirectoryError>;
    fn update_org(&self, id: OrgId, name: String) -> Result<bool, DirectoryError>;
    fn get_org(&self, id: OrgId) -> Result<Option<Organization>, DirectoryError>;
    /// Delete an organization and cascade to its listings, their
    /// applications, and memberships.
    fn delete_org(&self, id: OrgId) -> Result<bool, DirectoryError>;

    // Memberships
    fn create_membership(&self, membership: Membership) -> Result<Upserted, DirectoryError>;
    fn delete_membership(&self, user_id: UserId, org_id: OrgId) -> Result<bool, DirectoryError>;
    fn memberships_for_user(&self, user_id: UserId) -> Result<Vec<Membership>, DirectoryError>;
    fn memberships_for_org(&self, org_id: OrgId) -> Result<Vec<Membership>, DirectoryError>;

    // Resumes
    fn upsert_resume(&self, resume: Resume) -> Result<Upserted, DirectoryError>;
    fn get_resume(&self, id: ResumeId) -> Result<Option<Resume>, DirectoryError>;
    fn resume_for_user(&self, user_id: UserId) -> Result<Option<Resume>, DirectoryError>;
    fn set_resume_summary(&self, id: ResumeId, summary: String) -> Result<(), DirectoryError>;

    // Listings
    fn upsert_listing(&self, listing: JobListing) -> Result<Upserted, DirectoryError>;
    fn get_listing(&self, id: ListingId) -> Result<Option<JobListing>, DirectoryError>;
    /// Published listings created strictly after `since`, oldest first.
    fn listings_created_since(&self, since: DateTime<Utc>) -> Result<Vec<JobListing>, DirectoryError>;

    // Applications
    fn upsert_application(&self, application: JobListingApplication) -> Result<Upserted, DirectoryError>;
    fn get_application(&self, id: ApplicationId) -> Result<Option<JobListingApplication>, DirectoryError>;
    fn set_application_rank(&self, id: ApplicationId, rank: f64) -> Result<(), DirectoryError>;

    // Notification subscriptions
    fn upsert_subscription(&self, sub: NotificationSubscription) -> Result<Upserted, DirectoryError>;
    fn active_subscriptions(&self) -> Result<Vec<NotificationSubscription>, DirectoryError>;
    fn advance_digest_watermark(&self, user_id: UserId, to: DateTime<Utc>) -> Result<(), DirectoryError>;

    // Digest staging
    fn stage_digest(&self, digest: StagedDigest) -> Result<(), DirectoryError>;
    fn staged_digests(&self) -> Result<Vec<StagedDigest>, DirectoryError>;
    fn mark_digest_sent(&self, user_id: UserId) -> Result<(), DirectoryError>;
}

impl<S> DirectoryStore for Arc<S>
where
    S: DirectoryStore + ?Sized,
{
    fn upsert_user(&self, user: User) -> Result<Upserted, DirectoryError> {
        (**self).upsert_user(user)
    }

    fn update_user(&self, id: UserId, name: String, email: String) -> Result<bool, DirectoryError> {
        (**self).update_user(id, name, email)
    }

    fn get_user(&self, id: UserId) -> Result<Option<User>, DirectoryError> {
        (**self).get_user(id)
    }

    fn delete_user(&self, id: UserId) -> Result<bool, DirectoryError> {
        (**self).delete_user(id)
    }

    fn upsert_org(&self, org: Organization) -> Result<Upserted, DirectoryError> {
        (**self).upsert_org(org)
    }

    fn update_org(&self, id: OrgId, name: String) -> Result<bool, DirectoryError> {
        (**self).update_org(id, name)
    }

    fn get_org(&self, id: OrgId) -> Result<Option<Organization>, DirectoryError> {
        (**self).get_org(id)
    }

    fn delete_org(&self, id: OrgId) -> Result<bool, DirectoryError> {
        (**self).delete_org(id)
    }

    fn create_membership(&self, membership: Membership) -> Result<Upserted, DirectoryError> {
        (**self).create_membership(membership)
    }

    fn delete_membership(&self, user_id: UserId, org_id: OrgId) -> Result<bool, DirectoryError> {
        (**self).delete_membership(user_id, org_id)
    }

    fn memberships_for_user(&self, user_id: UserId) -> Result<Vec<Membership>, DirectoryError> {
        (**self).memberships_for_user(user_id)
    }

    fn memberships_for_org(&self, org_id: OrgId) -> Result<Vec<Membership>, DirectoryError> {
        (**self).memberships_for_org(org_id)
    }

    fn upsert_resume(&self, resume: Resume) -> Result<Upserted, DirectoryError> {
        (**self).upsert_resume(resume)
    }

    fn get_resume(&self, id: ResumeId) -> Result<Option<Resume>, DirectoryError> {
        (**self).get_resume(id)
    }

    fn resume_for_user(&self, user_id: UserId) -> Result<Option<Resume>, DirectoryError> {
        (**self).resume_for_user(user_id)
    }

    fn set_resume_summary(&self, id: ResumeId, summary: String) -> Result<(), DirectoryError> {
        (**self).set_resume_summary(id, summary)
    }

    fn upsert_listing(&self, listing: JobListing) -> Result<Upserted, DirectoryError> {
        (**self).upsert_listing(listing)
    }

    fn get_listing(&self, id: ListingId) -> Result<Option<JobListing>, DirectoryError> {
        (**self).get_listing(id)
    }

    fn listings_created_since(&self, since: DateTime<Utc>) -> Result<Vec<JobListing>, DirectoryError> {
        (**self).listings_created_since(since)
    }

    fn upsert_application(&self, application: JobListingApplication) -> Result<Upserted, DirectoryError> {
        (**self).upsert_application(application)
    }

    fn get_application(&self, id: ApplicationId) -> Result<Option<JobListingApplication>, DirectoryError> {
        (**self).get_application(id)
    }

    fn set_application_rank(&self, id: ApplicationId, rank: f64) -> Result<(), DirectoryError> {
        (**self).set_application_rank(id, rank)
    }

    fn upsert_subscription(&self, sub: NotificationSubscription) -> Result<Upserted, DirectoryError> {
        (**self).upsert_subscription(sub)
    }

    fn active_subscriptions(&self) -> Result<Vec<NotificationSubscription>, DirectoryError> {
        (**self).active_subscriptions()
    }

    fn advance_digest_watermark(&self, user_id: UserId, to: DateTime<Utc>) -> Result<(), DirectoryError> {
        (**self).advance_digest_watermark(user_id, to)
    }

    fn stage_digest(&self, digest: StagedDigest) -> Result<(), DirectoryError> {
        (**self).stage_digest(digest)
    }

    fn staged_digests(&self) -> Result<Vec<StagedDigest>, DirectoryError> {
        (**self).staged_digests()
    }

    fn mark_digest_sent(&self, user_id: UserId) -> Result<(), DirectoryError> {
        (**self).mark_digest_sent(user_id)
    }
}
