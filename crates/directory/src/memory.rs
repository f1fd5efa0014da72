//! In-memory directory store for tests/dev and the default wiring.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};

use hireboard_core::{ApplicationId, ListingId, OrgId, ResumeId, UserId};

use crate::model::{
    DigestStatus, JobListing, JobListingApplication, ListingStatus, Membership,
    NotificationSubscription, Organization, Resume, StagedDigest, User,
};
use crate::store::{DirectoryError, DirectoryStore, Upserted};

#[derive(Debug, Default)]
struct State {
    users: HashMap<UserId, User>,
    orgs: HashMap<OrgId, Organization>,
    memberships: HashMap<(UserId, OrgId), Membership>,
    resumes: HashMap<ResumeId, Resume>,
    listings: HashMap<ListingId, JobListing>,
    applications: HashMap<ApplicationId, JobListingApplication>,
    subscriptions: HashMap<UserId, NotificationSubscription>,
    digests: HashMap<UserId, StagedDigest>,
}

/// In-memory [`DirectoryStore`].
///
/// A single `RwLock` over the whole state makes each call transactional
/// across the entities it touches (membership endpoint checks, cascades),
/// which is exactly the atomicity window a relational implementation gets
/// from one transaction per call.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    state: RwLock<State>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl DirectoryStore for InMemoryDirectory {
    fn upsert_user(&self, mut user: User) -> Result<Upserted, DirectoryError> {
        let mut state = self.state.write().unwrap();
        user.updated_at = Utc::now();
        match state.users.insert(user.id, user) {
            None => Ok(Upserted::Created),
            Some(_) => Ok(Upserted::Updated),
        }
    }

    fn update_user(&self, id: UserId, name: String, email: String) -> Result<bool, DirectoryError> {
        let mut state = self.state.write().unwrap();
        match state.users.get_mut(&id) {
            Some(user) => {
                user.name = name;
                user.email = email;
                user.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn get_user(&self, id: UserId) -> Result<Option<User>, DirectoryError> {
        Ok(self.state.read().unwrap().users.get(&id).cloned())
    }

    fn delete_user(&self, id: UserId) -> Result<bool, DirectoryError> {
        let mut state = self.state.write().unwrap();
        if state.users.remove(&id).is_none() {
            return Ok(false);
        }

        state.memberships.retain(|(user_id, _), _| *user_id != id);
        state.resumes.retain(|_, r| r.user_id != id);
        state.applications.retain(|_, a| a.user_id != id);
        state.subscriptions.remove(&id);
        state.digests.remove(&id);
        Ok(true)
    }

    fn upsert_org(&self, mut org: Organization) -> Result<Upserted, DirectoryError> {
        let mut state = self.state.write().unwrap();
        org.updated_at = Utc::now();
        match state.orgs.insert(org.id, org) {
            None => Ok(Upserted::Created),
            Some(_) => Ok(Upserted::Updated),
        }
    }

    fn update_org(&self, id: OrgId, name: String) -> Result<bool, DirectoryError> {
        let mut state = self.state.write().unwrap();
        match state.orgs.get_mut(&id) {
            Some(org) => {
                org.name = name;
                org.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn get_org(&self, id: OrgId) -> Result<Option<Organization>, DirectoryError> {
        Ok(self.state.read().unwrap().orgs.get(&id).cloned())
    }

    fn delete_org(&self, id: OrgId) -> Result<bool, DirectoryError> {
        let mut state = self.state.write().unwrap();
        if state.orgs.remove(&id).is_none() {
            return Ok(false);
        }

        state.memberships.retain(|(_, org_id), _| *org_id != id);

        let listing_ids: Vec<ListingId> = state
            .listings
            .values()
            .filter(|l| l.org_id == id)
            .map(|l| l.id)
            .collect();
        state.listings.retain(|_, l| l.org_id != id);
        state
            .applications
            .retain(|_, a| !listing_ids.contains(&a.listing_id));
        Ok(true)
    }

    fn create_membership(&self, membership: Membership) -> Result<Upserted, DirectoryError> {
        let mut state = self.state.write().unwrap();

        if !state.users.contains_key(&membership.user_id) {
            return Err(DirectoryError::MissingReference(format!(
                "membership user {}",
                membership.user_id
            )));
        }
        if !state.orgs.contains_key(&membership.org_id) {
            return Err(DirectoryError::MissingReference(format!(
                "membership org {}",
                membership.org_id
            )));
        }

        let key = (membership.user_id, membership.org_id);
        match state.memberships.insert(key, membership) {
            None => Ok(Upserted::Created),
            // Duplicate delivery or role replacement; one row either way.
            Some(_) => Ok(Upserted::Updated),
        }
    }

    fn delete_membership(&self, user_id: UserId, org_id: OrgId) -> Result<bool, DirectoryError> {
        let mut state = self.state.write().unwrap();
        Ok(state.memberships.remove(&(user_id, org_id)).is_some())
    }

    fn memberships_for_user(&self, user_id: UserId) -> Result<Vec<Membership>, DirectoryError> {
        let state = self.state.read().unwrap();
        let mut out: Vec<_> = state
            .memberships
            .values()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect();
        out.sort_by_key(|m| m.created_at);
        Ok(out)
    }

    fn memberships_for_org(&self, org_id: OrgId) -> Result<Vec<Membership>, DirectoryError> {
        let state = self.state.read().unwrap();
        let mut out: Vec<_> = state
            .memberships
            .values()
            .filter(|m| m.org_id == org_id)
            .cloned()
            .collect();
        out.sort_by_key(|m| m.created_at);
        Ok(out)
    }

    fn upsert_resume(&self, mut resume: Resume) -> Result<Upserted, DirectoryError> {
        let mut state = self.state.write().unwrap();
        resume.updated_at = Utc::now();
        // Keep an already-computed summary when the same document is
        // re-upserted (duplicate delivery must not erase AI-derived state).
        if resume.summary.is_none() {
            if let Some(existing) = state.resumes.get(&resume.id) {
                if existing.document_ref == resume.document_ref {
                    resume.summary = existing.summary.clone();
                }
            }
        }
        match state.resumes.insert(resume.id, resume) {
            None => Ok(Upserted::Created),
            Some(_) => Ok(Upserted::Updated),
        }
    }

    fn get_resume(&self, id: ResumeId) -> Result<Option<Resume>, DirectoryError> {
        Ok(self.state.read().unwrap().resumes.get(&id).cloned())
    }

    fn resume_for_user(&self, user_id: UserId) -> Result<Option<Resume>, DirectoryError> {
        let state = self.state.read().unwrap();
        Ok(state
            .resumes
            .values()
            .filter(|r| r.user_id == user_id)
            .max_by_key(|r| r.uploaded_at)
            .cloned())
    }

    fn set_resume_summary(&self, id: ResumeId, summary: String) -> Result<(), DirectoryError> {
        let mut state = self.state.write().unwrap();
        let resume = state
            .resumes
            .get_mut(&id)
            .ok_or_else(|| DirectoryError::NotFound(format!("resume {id}")))?;

        if resume.summary.as_deref() != Some(summary.as_str()) {
            resume.summary = Some(summary);
            resume.updated_at = Utc::now();
        }
        Ok(())
    }

    fn upsert_listing(&self, mut listing: JobListing) -> Result<Upserted, DirectoryError> {
        let mut state = self.state.write().unwrap();
        listing.updated_at = Utc::now();
        match state.listings.insert(listing.id, listing) {
            None => Ok(Upserted::Created),
            Some(_) => Ok(Upserted::Updated),
        }
    }

    fn get_listing(&self, id: ListingId) -> Result<Option<JobListing>, DirectoryError> {
        Ok(self.state.read().unwrap().listings.get(&id).cloned())
    }

    fn listings_created_since(&self, since: DateTime<Utc>) -> Result<Vec<JobListing>, DirectoryError> {
        let state = self.state.read().unwrap();
        let mut out: Vec<_> = state
            .listings
            .values()
            .filter(|l| l.status == ListingStatus::Published && l.created_at > since)
            .cloned()
            .collect();
        out.sort_by_key(|l| l.created_at);
        Ok(out)
    }

    fn upsert_application(&self, mut application: JobListingApplication) -> Result<Upserted, DirectoryError> {
        let mut state = self.state.write().unwrap();
        application.updated_at = Utc::now();
        if application.rank.is_none() {
            if let Some(existing) = state.applications.get(&application.id) {
                application.rank = existing.rank;
            }
        }
        match state.applications.insert(application.id, application) {
            None => Ok(Upserted::Created),
            Some(_) => Ok(Upserted::Updated),
        }
    }

    fn get_application(&self, id: ApplicationId) -> Result<Option<JobListingApplication>, DirectoryError> {
        Ok(self.state.read().unwrap().applications.get(&id).cloned())
    }

    fn set_application_rank(&self, id: ApplicationId, rank: f64) -> Result<(), DirectoryError> {
        let mut state = self.state.write().unwrap();
        let app = state
            .applications
            .get_mut(&id)
            .ok_or_else(|| DirectoryError::NotFound(format!("application {id}")))?;

        if app.rank != Some(rank) {
            app.rank = Some(rank);
            app.updated_at = Utc::now();
        }
        Ok(())
    }

    fn upsert_subscription(&self, mut sub: NotificationSubscription) -> Result<Upserted, DirectoryError> {
        let mut state = self.state.write().unwrap();
        sub.updated_at = Utc::now();
        // Preserve the digest watermark across preference updates.
        if sub.last_digest_at.is_none() {
            if let Some(existing) = state.subscriptions.get(&sub.user_id) {
                sub.last_digest_at = existing.last_digest_at;
            }
        }
        match state.subscriptions.insert(sub.user_id, sub) {
            None => Ok(Upserted::Created),
            Some(_) => Ok(Upserted::Updated),
        }
    }

    fn active_subscriptions(&self) -> Result<Vec<NotificationSubscription>, DirectoryError> {
        let state = self.state.read().unwrap();
        let mut out: Vec<_> = state
            .subscriptions
            .values()
            .filter(|s| s.active)
            .cloned()
            .collect();
        out.sort_by_key(|s| s.user_id.to_string());
        Ok(out)
    }

    fn advance_digest_watermark(&self, user_id: UserId, to: DateTime<Utc>) -> Result<(), DirectoryError> {
        let mut state = self.state.write().unwrap();
        let sub = state
            .subscriptions
            .get_mut(&user_id)
            .ok_or_else(|| DirectoryError::NotFound(format!("subscription {user_id}")))?;

        // Monotonic: a stale retry never rewinds the watermark.
        if sub.last_digest_at.is_none_or(|cur| to > cur) {
            sub.last_digest_at = Some(to);
            sub.updated_at = Utc::now();
        }
        Ok(())
    }

    fn stage_digest(&self, mut digest: StagedDigest) -> Result<(), DirectoryError> {
        let mut state = self.state.write().unwrap();
        if let Some(existing) = state.digests.get(&digest.user_id) {
            if existing.status == DigestStatus::Staged {
                // The previous run's listings were never delivered; fold
                // them into the new payload instead of dropping them.
                let mut listings = existing.listings.clone();
                for entry in digest.listings {
                    if !listings.iter().any(|l| l.listing_id == entry.listing_id) {
                        listings.push(entry);
                    }
                }
                digest.listings = listings;
            }
        }
        state.digests.insert(digest.user_id, digest);
        Ok(())
    }

    fn staged_digests(&self) -> Result<Vec<StagedDigest>, DirectoryError> {
        let state = self.state.read().unwrap();
        let mut out: Vec<_> = state
            .digests
            .values()
            .filter(|d| d.status == DigestStatus::Staged)
            .cloned()
            .collect();
        out.sort_by_key(|d| d.staged_at);
        Ok(out)
    }

    fn mark_digest_sent(&self, user_id: UserId) -> Result<(), DirectoryError> {
        let mut state = self.state.write().unwrap();
        if let Some(digest) = state.digests.get_mut(&user_id) {
            digest.status = DigestStatus::Sent;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DigestListing, MembershipRole, UserKind};
    use std::thread;

    fn seeker(name: &str) -> User {
        User::new(UserId::new(), name, format!("{name}@example.com"), UserKind::JobSeeker)
    }

    #[test]
    fn upsert_user_is_idempotent_with_last_write_wins() {
        let store = InMemoryDirectory::new();
        let id = UserId::new();

        let first = User::new(id, "Ada", "ada@example.com", UserKind::JobSeeker);
        assert_eq!(store.upsert_user(first).unwrap(), Upserted::Created);

        let second = User::new(id, "Ada Lovelace", "ada@example.com", UserKind::JobSeeker);
        assert_eq!(store.upsert_user(second).unwrap(), Upserted::Updated);

        let current = store.get_user(id).unwrap().unwrap();
        assert_eq!(current.name, "Ada Lovelace");
    }

    #[test]
    fn update_missing_user_is_a_signalled_noop() {
        let store = InMemoryDirectory::new();
        let applied = store
            .update_user(UserId::new(), "ghost".into(), "ghost@example.com".into())
            .unwrap();
        assert!(!applied);
    }

    #[test]
    fn delete_user_cascades_to_owned_rows() {
        let store = InMemoryDirectory::new();
        let user = seeker("casey");
        let user_id = user.id;
        store.upsert_user(user).unwrap();

        let org = Organization::new(OrgId::new(), "Acme");
        let org_id = org.id;
        store.upsert_org(org).unwrap();
        store
            .create_membership(Membership::new(user_id, org_id, MembershipRole::Member))
            .unwrap();

        let resume = Resume::new(ResumeId::new(), user_id, "doc://resume");
        store.upsert_resume(resume).unwrap();
        store
            .upsert_subscription(NotificationSubscription::new(user_id, true, vec![]))
            .unwrap();

        assert!(store.delete_user(user_id).unwrap());
        assert!(store.resume_for_user(user_id).unwrap().is_none());
        assert!(store.memberships_for_user(user_id).unwrap().is_empty());
        assert!(store.active_subscriptions().unwrap().is_empty());

        // Second delete is a no-op.
        assert!(!store.delete_user(user_id).unwrap());
    }

    #[test]
    fn membership_requires_both_endpoints() {
        let store = InMemoryDirectory::new();
        let user = seeker("lee");
        let user_id = user.id;
        store.upsert_user(user).unwrap();

        let err = store
            .create_membership(Membership::new(user_id, OrgId::new(), MembershipRole::Member))
            .unwrap_err();
        assert!(matches!(err, DirectoryError::MissingReference(_)));
    }

    #[test]
    fn concurrent_membership_creates_yield_one_row() {
        let store = Arc::new(InMemoryDirectory::new());
        let user = seeker("pat");
        let user_id = user.id;
        store.upsert_user(user).unwrap();
        let org = Organization::new(OrgId::new(), "Initech");
        let org_id = org.id;
        store.upsert_org(org).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                thread::spawn(move || {
                    store
                        .create_membership(Membership::new(user_id, org_id, MembershipRole::Member))
                        .unwrap()
                })
            })
            .collect();

        for h in handles {
            // Every call succeeds; none observes a duplicate-row error.
            h.join().unwrap();
        }

        assert_eq!(store.memberships_for_user(user_id).unwrap().len(), 1);
    }

    #[test]
    fn resume_summary_survives_duplicate_upload_event() {
        let store = InMemoryDirectory::new();
        let user = seeker("sam");
        let user_id = user.id;
        store.upsert_user(user).unwrap();

        let resume = Resume::new(ResumeId::new(), user_id, "doc://cv");
        let resume_id = resume.id;
        store.upsert_resume(resume.clone()).unwrap();
        store
            .set_resume_summary(resume_id, "experienced engineer".into())
            .unwrap();

        // Duplicate upload delivery carries no summary.
        store.upsert_resume(resume).unwrap();
        let current = store.get_resume(resume_id).unwrap().unwrap();
        assert_eq!(current.summary.as_deref(), Some("experienced engineer"));
    }

    #[test]
    fn digest_watermark_is_monotonic() {
        let store = InMemoryDirectory::new();
        let user = seeker("drew");
        let user_id = user.id;
        store.upsert_user(user).unwrap();
        store
            .upsert_subscription(NotificationSubscription::new(user_id, true, vec![]))
            .unwrap();

        let later = Utc::now();
        let earlier = later - chrono::Duration::hours(1);

        store.advance_digest_watermark(user_id, later).unwrap();
        store.advance_digest_watermark(user_id, earlier).unwrap();

        let subs = store.active_subscriptions().unwrap();
        assert_eq!(subs[0].last_digest_at, Some(later));
    }

    #[test]
    fn restaging_an_unsent_digest_merges_listings() {
        let store = InMemoryDirectory::new();
        let user_id = UserId::new();

        let entry = |title: &str| DigestListing {
            listing_id: ListingId::new(),
            title: title.into(),
            org_name: "Acme".into(),
        };

        let first = entry("Backend Engineer");
        store
            .stage_digest(StagedDigest::new(user_id, "a@example.com", vec![first.clone()]))
            .unwrap();
        store
            .stage_digest(StagedDigest::new(
                user_id,
                "a@example.com",
                vec![first.clone(), entry("Data Engineer")],
            ))
            .unwrap();

        let staged = store.staged_digests().unwrap();
        assert_eq!(staged.len(), 1);
        assert_eq!(staged[0].listings.len(), 2);
        assert_eq!(staged[0].listings[0].listing_id, first.listing_id);

        // Once delivered, the next staging starts fresh.
        store.mark_digest_sent(user_id).unwrap();
        store
            .stage_digest(StagedDigest::new(user_id, "a@example.com", vec![entry("SRE")]))
            .unwrap();
        let staged = store.staged_digests().unwrap();
        assert_eq!(staged[0].listings.len(), 1);
        assert_eq!(staged[0].listings[0].title, "SRE");
    }

    #[test]
    fn listings_created_since_filters_unpublished() {
        let store = InMemoryDirectory::new();
        let org = Organization::new(OrgId::new(), "Globex");
        let org_id = org.id;
        store.upsert_org(org).unwrap();

        let epoch = Utc::now() - chrono::Duration::days(1);
        store
            .upsert_listing(JobListing::new(
                ListingId::new(),
                org_id,
                "Rust engineer",
                "build things",
                ListingStatus::Published,
            ))
            .unwrap();
        store
            .upsert_listing(JobListing::new(
                ListingId::new(),
                org_id,
                "Secret draft",
                "not yet",
                ListingStatus::Draft,
            ))
            .unwrap();

        let fresh = store.listings_created_since(epoch).unwrap();
        assert_eq!(fresh.len(), 1);
        assert_eq!(fresh[0].title, "Rust engineer");
    }
}
