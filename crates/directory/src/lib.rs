//! Directory Store: the persisted representation of users, organizations,
//! memberships, resumes, listings, applications, and notification
//! subscriptions.
//!
//! The store is the **only shared mutable resource** between concurrently
//! running invocations. Every operation is transactional with respect to the
//! entities it touches; handlers never hold in-process locks across calls.
//! Mutations follow the idempotent-consumer contract:
//!
//! - creations are upserts (create-if-absent, update-if-present)
//! - deletions are no-ops when the entity is already absent
//! - updates no-op (signalled, not errored) when the entity does not exist
//! - AI-derived fields (resume summary, application rank) are
//!   write-once-then-idempotent: recomputation overwrites deterministically

pub mod memory;
pub mod model;
pub mod store;

pub use memory::InMemoryDirectory;
pub use model::{
    ApplicationStage, DigestListing, DigestStatus, JobListing, JobListingApplication,
    ListingStatus, Membership, MembershipRole, NotificationSubscription, Organization, Resume,
    StagedDigest, User, UserKind,
};
pub use store::{DirectoryError, DirectoryStore, Upserted};
