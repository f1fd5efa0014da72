//! Scheduled digest functions.
//!
//! Two separate cron-triggered functions so staging and delivery fail
//! independently:
//!
//! - [`PrepareDailyDigest`] selects, per active subscription, the listings
//!   created since that subscription's watermark, stages one digest payload
//!   per user, and advances the watermark only after staging succeeds.
//! - [`SendDailyDigest`] renders and delivers staged digests, one durable
//!   step per recipient: a failed recipient neither blocks the others in
//!   the same run nor causes a re-send of already delivered mail on retry.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use hireboard_directory::{DigestListing, DirectoryStore, JobListing, StagedDigest};
use hireboard_events::{names, Event, Function, StepContext, StepError, Trigger};
use hireboard_notify::{render_digest, MailError, Mailer};

use crate::store_step_err;

fn mail_step_err(err: MailError) -> StepError {
    if err.is_transient() {
        StepError::retryable(err.to_string())
    } else {
        StepError::fatal(err.to_string())
    }
}

/// Case-insensitive term filter; an empty term list matches everything.
fn matches_terms(terms: &[String], listing: &JobListing) -> bool {
    if terms.is_empty() {
        return true;
    }
    let haystack = format!("{} {}", listing.title, listing.description).to_lowercase();
    terms.iter().any(|t| haystack.contains(&t.to_lowercase()))
}

/// Stages per-user digest payloads for later delivery.
pub struct PrepareDailyDigest {
    store: Arc<dyn DirectoryStore>,
    every: Duration,
}

impl PrepareDailyDigest {
    pub fn new(store: Arc<dyn DirectoryStore>, every: Duration) -> Self {
        Self { store, every }
    }
}

impl Function for PrepareDailyDigest {
    fn slug(&self) -> &'static str {
        "prepare-daily-digest"
    }

    fn trigger(&self) -> Trigger {
        Trigger::periodic(names::DIGEST_PREPARE, self.every)
    }

    fn run(&self, step: &mut StepContext, event: &Event) -> Result<(), StepError> {
        let now = event.received_at();
        let subscriptions = self.store.active_subscriptions().map_err(store_step_err)?;
        debug!(subscriptions = subscriptions.len(), "preparing digests");

        let mut failed = 0usize;
        for sub in subscriptions {
            let since = sub.last_digest_at.unwrap_or(DateTime::<Utc>::MIN_UTC);
            let listings = self
                .store
                .listings_created_since(since)
                .map_err(store_step_err)?;
            let matched: Vec<JobListing> = listings
                .into_iter()
                .filter(|l| matches_terms(&sub.search_terms, l))
                .collect();
            if matched.is_empty() {
                continue;
            }

            let Some(user) = self.store.get_user(sub.user_id).map_err(store_step_err)? else {
                // Subscription outlived its user (cascade lag); skip.
                debug!(user = %sub.user_id, "subscription without a user, skipping");
                continue;
            };

            let mut entries = Vec::with_capacity(matched.len());
            for listing in matched {
                let Some(org) = self.store.get_org(listing.org_id).map_err(store_step_err)? else {
                    continue;
                };
                entries.push(DigestListing {
                    listing_id: listing.id,
                    title: listing.title,
                    org_name: org.name,
                });
            }
            if entries.is_empty() {
                continue;
            }

            let store = self.store.clone();
            let user_id = sub.user_id;
            let email = user.email.clone();
            let staged = step.run(&format!("stage:{user_id}"), move || {
                let count = entries.len();
                store
                    .stage_digest(StagedDigest::new(user_id, email, entries))
                    .map_err(store_step_err)?;
                // Watermark moves only once the payload is durably staged.
                store
                    .advance_digest_watermark(user_id, now)
                    .map_err(store_step_err)?;
                Ok(count)
            });

            match staged {
                Ok(count) => info!(user = %user_id, listings = count, "digest staged"),
                Err(err) => {
                    warn!(user = %user_id, error = %err, "digest staging failed");
                    failed += 1;
                }
            }
        }

        if failed > 0 {
            return Err(StepError::retryable(format!(
                "{failed} digest(s) failed to stage"
            )));
        }
        Ok(())
    }
}

/// Delivers staged digests, one durable step per recipient.
pub struct SendDailyDigest {
    store: Arc<dyn DirectoryStore>,
    mailer: Arc<dyn Mailer>,
    every: Duration,
}

impl SendDailyDigest {
    pub fn new(store: Arc<dyn DirectoryStore>, mailer: Arc<dyn Mailer>, every: Duration) -> Self {
        Self {
            store,
            mailer,
            every,
        }
    }
}

impl Function for SendDailyDigest {
    fn slug(&self) -> &'static str {
        "send-daily-digest"
    }

    fn trigger(&self) -> Trigger {
        Trigger::periodic(names::DIGEST_SEND, self.every)
    }

    fn run(&self, step: &mut StepContext, _event: &Event) -> Result<(), StepError> {
        let staged = self.store.staged_digests().map_err(store_step_err)?;
        debug!(staged = staged.len(), "sending digests");

        let mut transient = 0usize;
        let mut permanent = 0usize;
        for digest in staged {
            let user_id = digest.user_id;
            let mailer = self.mailer.clone();
            let store = self.store.clone();
            let result: Result<String, StepError> =
                step.run(&format!("send:{user_id}"), move || {
                    let message = render_digest(&digest);
                    let ack = mailer.send(&message).map_err(mail_step_err)?;
                    store.mark_digest_sent(user_id).map_err(store_step_err)?;
                    Ok(ack.message_id)
                });

            match result {
                Ok(message_id) => {
                    info!(user = %user_id, message_id, "digest delivered");
                }
                // Failed digests stay staged and are picked up again by the
                // retry (transient) or the next run.
                Err(err) if err.is_retryable() => {
                    warn!(user = %user_id, error = %err, "digest delivery failed, will retry");
                    transient += 1;
                }
                Err(err) => {
                    warn!(user = %user_id, error = %err, "digest delivery rejected");
                    permanent += 1;
                }
            }
        }

        if transient > 0 {
            return Err(StepError::retryable(format!(
                "{transient} digest deliveries failed"
            )));
        }
        if permanent > 0 {
            return Err(StepError::fatal(format!(
                "{permanent} digest deliveries rejected"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hireboard_core::{ListingId, OrgId, UserId};
    use hireboard_directory::{
        DigestStatus, InMemoryDirectory, JobListing, ListingStatus, NotificationSubscription,
        Organization, User, UserKind,
    };
    use hireboard_notify::{FlakyMailer, RecordingMailer};
    use serde_json::json;

    const PERIOD: Duration = Duration::from_secs(86_400);

    fn tick(name: &str) -> Event {
        Event::new(name, json!({ "tick": Utc::now() }))
    }

    struct Fixture {
        store: Arc<InMemoryDirectory>,
        org: OrgId,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryDirectory::new());
        let org = OrgId::new();
        store.upsert_org(Organization::new(org, "Acme")).unwrap();
        Fixture { store, org }
    }

    fn subscriber(f: &Fixture, email: &str, terms: &[&str]) -> UserId {
        let user = UserId::new();
        f.store
            .upsert_user(User::new(user, "Seeker", email, UserKind::JobSeeker))
            .unwrap();
        f.store
            .upsert_subscription(NotificationSubscription::new(
                user,
                true,
                terms.iter().map(|t| t.to_string()).collect(),
            ))
            .unwrap();
        user
    }

    fn listing(f: &Fixture, title: &str) -> ListingId {
        let id = ListingId::new();
        f.store
            .upsert_listing(JobListing::new(
                id,
                f.org,
                title,
                "Great role.",
                ListingStatus::Published,
            ))
            .unwrap();
        id
    }

    #[test]
    fn prepare_stages_matching_listings_and_advances_watermark() {
        let f = fixture();
        let user = subscriber(&f, "rust@example.com", &["rust"]);
        listing(&f, "Senior Rust Engineer");
        listing(&f, "Accountant");

        let prepare = PrepareDailyDigest::new(f.store.clone(), PERIOD);
        prepare
            .run(&mut StepContext::fresh(), &tick(names::DIGEST_PREPARE))
            .unwrap();

        let staged = f.store.staged_digests().unwrap();
        assert_eq!(staged.len(), 1);
        assert_eq!(staged[0].user_id, user);
        assert_eq!(staged[0].listings.len(), 1);
        assert_eq!(staged[0].listings[0].title, "Senior Rust Engineer");

        // Nothing new since the watermark: second run restages nothing and
        // does not duplicate the pending payload.
        prepare
            .run(&mut StepContext::fresh(), &tick(names::DIGEST_PREPARE))
            .unwrap();
        assert_eq!(f.store.staged_digests().unwrap().len(), 1);
    }

    #[test]
    fn empty_term_list_matches_every_listing() {
        let f = fixture();
        subscriber(&f, "all@example.com", &[]);
        listing(&f, "Senior Rust Engineer");
        listing(&f, "Accountant");

        PrepareDailyDigest::new(f.store.clone(), PERIOD)
            .run(&mut StepContext::fresh(), &tick(names::DIGEST_PREPARE))
            .unwrap();

        let staged = f.store.staged_digests().unwrap();
        assert_eq!(staged.len(), 1);
        assert_eq!(staged[0].listings.len(), 2);
    }

    #[test]
    fn send_delivers_and_marks_sent() {
        let f = fixture();
        subscriber(&f, "rust@example.com", &["rust"]);
        listing(&f, "Rust Engineer");

        PrepareDailyDigest::new(f.store.clone(), PERIOD)
            .run(&mut StepContext::fresh(), &tick(names::DIGEST_PREPARE))
            .unwrap();

        let mailer = Arc::new(RecordingMailer::new());
        SendDailyDigest::new(f.store.clone(), mailer.clone(), PERIOD)
            .run(&mut StepContext::fresh(), &tick(names::DIGEST_SEND))
            .unwrap();

        assert_eq!(mailer.sent().len(), 1);
        assert_eq!(mailer.sent()[0].to, "rust@example.com");
        assert!(f.store.staged_digests().unwrap().is_empty());
    }

    #[test]
    fn one_failing_recipient_does_not_block_the_others() {
        let f = fixture();
        subscriber(&f, "down@example.com", &[]);
        subscriber(&f, "up@example.com", &[]);
        listing(&f, "Rust Engineer");

        PrepareDailyDigest::new(f.store.clone(), PERIOD)
            .run(&mut StepContext::fresh(), &tick(names::DIGEST_PREPARE))
            .unwrap();
        assert_eq!(f.store.staged_digests().unwrap().len(), 2);

        let mailer = Arc::new(FlakyMailer::failing_for(["down@example.com"]));
        let send = SendDailyDigest::new(f.store.clone(), mailer.clone(), PERIOD);
        let err = send
            .run(&mut StepContext::fresh(), &tick(names::DIGEST_SEND))
            .unwrap_err();

        // The healthy recipient got their mail in the same run; only the
        // failed digest stays staged.
        assert!(err.is_retryable());
        assert_eq!(mailer.delivered().len(), 1);
        assert_eq!(mailer.delivered()[0].to, "up@example.com");
        let remaining = f.store.staged_digests().unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].recipient_email, "down@example.com");
        assert_eq!(remaining[0].status, DigestStatus::Staged);
    }

    #[test]
    fn retry_does_not_resend_delivered_digests() {
        let f = fixture();
        subscriber(&f, "down@example.com", &[]);
        subscriber(&f, "up@example.com", &[]);
        listing(&f, "Rust Engineer");

        PrepareDailyDigest::new(f.store.clone(), PERIOD)
            .run(&mut StepContext::fresh(), &tick(names::DIGEST_PREPARE))
            .unwrap();

        let flaky = Arc::new(FlakyMailer::failing_for(["down@example.com"]));
        let send = SendDailyDigest::new(f.store.clone(), flaky.clone(), PERIOD);
        let mut first = StepContext::fresh();
        let event = tick(names::DIGEST_SEND);
        send.run(&mut first, &event).unwrap_err();
        assert_eq!(flaky.delivered().len(), 1);

        // Retry with the provider recovered: the memoized send step for the
        // healthy recipient is replayed, not re-executed.
        let recovered = Arc::new(RecordingMailer::new());
        let retry = SendDailyDigest::new(f.store.clone(), recovered.clone(), PERIOD);
        retry
            .run(&mut StepContext::new(first.into_log()), &event)
            .unwrap();

        assert_eq!(recovered.sent().len(), 1);
        assert_eq!(recovered.sent()[0].to, "down@example.com");
        assert!(f.store.staged_digests().unwrap().is_empty());
    }

    #[test]
    fn listings_staged_before_a_failed_send_survive_the_next_prepare() {
        let f = fixture();
        subscriber(&f, "all@example.com", &[]);
        listing(&f, "Rust Engineer");

        let prepare = PrepareDailyDigest::new(f.store.clone(), PERIOD);
        prepare
            .run(&mut StepContext::fresh(), &tick(names::DIGEST_PREPARE))
            .unwrap();
        assert_eq!(f.store.staged_digests().unwrap()[0].listings.len(), 1);

        // The send run never happened; a fresh listing shows up before the
        // next prepare tick. The undelivered entry must not be dropped.
        listing(&f, "Data Engineer");
        prepare
            .run(&mut StepContext::fresh(), &tick(names::DIGEST_PREPARE))
            .unwrap();

        let staged = f.store.staged_digests().unwrap();
        assert_eq!(staged.len(), 1);
        let titles: Vec<_> = staged[0].listings.iter().map(|l| l.title.as_str()).collect();
        assert_eq!(titles, ["Rust Engineer", "Data Engineer"]);
    }

    #[test]
    fn inactive_subscriptions_are_ignored() {
        let f = fixture();
        let user = UserId::new();
        f.store
            .upsert_user(User::new(user, "Quiet", "quiet@example.com", UserKind::JobSeeker))
            .unwrap();
        f.store
            .upsert_subscription(NotificationSubscription::new(user, false, vec![]))
            .unwrap();
        listing(&f, "Rust Engineer");

        PrepareDailyDigest::new(f.store.clone(), PERIOD)
            .run(&mut StepContext::fresh(), &tick(names::DIGEST_PREPARE))
            .unwrap();
        assert!(f.store.staged_digests().unwrap().is_empty());
    }
}
