//! Identity-provider lifecycle sync functions.
//!
//! One function per webhook event, keeping the local directory in step with
//! the provider's view of users, organizations, and memberships. Deliveries
//! can arrive duplicated or out of order, so:
//!
//! - creation events upsert (create-if-absent, update-if-present)
//! - deletion events no-op when the target is already gone
//! - update events no-op when the target has not been created yet; the gap
//!   is logged at debug and the invocation still succeeds

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info};

use hireboard_core::{OrgId, UserId};
use hireboard_directory::{
    DirectoryStore, Membership, MembershipRole, Organization, Upserted, User, UserKind,
};
use hireboard_events::{names, Event, Function, StepContext, StepError, Trigger};

use crate::{parse_payload, store_step_err};

fn default_kind() -> UserKind {
    UserKind::JobSeeker
}

#[derive(Debug, Deserialize)]
struct UserCreatedPayload {
    id: UserId,
    name: String,
    email: String,
    #[serde(default = "default_kind")]
    kind: UserKind,
}

#[derive(Debug, Deserialize)]
struct UserUpdatedPayload {
    id: UserId,
    name: String,
    email: String,
}

#[derive(Debug, Deserialize)]
struct UserDeletedPayload {
    id: UserId,
}

#[derive(Debug, Deserialize)]
struct OrgCreatedPayload {
    id: OrgId,
    name: String,
}

#[derive(Debug, Deserialize)]
struct OrgDeletedPayload {
    id: OrgId,
}

#[derive(Debug, Deserialize)]
struct MembershipPayload {
    user_id: UserId,
    org_id: OrgId,
    #[serde(default = "default_role")]
    role: MembershipRole,
}

fn default_role() -> MembershipRole {
    MembershipRole::Member
}

/// Syncs `user.created` into the directory.
pub struct UserCreated {
    store: Arc<dyn DirectoryStore>,
}

impl UserCreated {
    pub fn new(store: Arc<dyn DirectoryStore>) -> Self {
        Self { store }
    }
}

impl Function for UserCreated {
    fn slug(&self) -> &'static str {
        "sync-user-created"
    }

    fn trigger(&self) -> Trigger {
        Trigger::event(names::USER_CREATED)
    }

    fn run(&self, step: &mut StepContext, event: &Event) -> Result<(), StepError> {
        let payload: UserCreatedPayload = parse_payload(event)?;
        let store = self.store.clone();
        let outcome: String = step.run("sync-user", move || {
            let id = payload.id;
            let user = User::new(id, payload.name, payload.email, payload.kind);
            let outcome = store.upsert_user(user).map_err(store_step_err)?;
            info!(user = %id, ?outcome, "user synced");
            Ok(match outcome {
                Upserted::Created => "created".to_string(),
                Upserted::Updated => "updated".to_string(),
            })
        })?;
        debug!(outcome, "user.created handled");
        Ok(())
    }
}

/// Syncs `user.updated` into the directory.
pub struct UserUpdated {
    store: Arc<dyn DirectoryStore>,
}

impl UserUpdated {
    pub fn new(store: Arc<dyn DirectoryStore>) -> Self {
        Self { store }
    }
}

impl Function for UserUpdated {
    fn slug(&self) -> &'static str {
        "sync-user-updated"
    }

    fn trigger(&self) -> Trigger {
        Trigger::event(names::USER_UPDATED)
    }

    fn run(&self, step: &mut StepContext, event: &Event) -> Result<(), StepError> {
        let payload: UserUpdatedPayload = parse_payload(event)?;
        let store = self.store.clone();
        step.run("update-user", move || {
            let applied = store
                .update_user(payload.id, payload.name, payload.email)
                .map_err(store_step_err)?;
            if !applied {
                // Update arrived before (or after) the entity exists; the
                // delete/create event carries the authoritative state.
                debug!(user = %payload.id, "update for unknown user ignored");
            }
            Ok(applied)
        })?;
        Ok(())
    }
}

/// Syncs `user.deleted`; cascades to the user's owned rows.
pub struct UserDeleted {
    store: Arc<dyn DirectoryStore>,
}

impl UserDeleted {
    pub fn new(store: Arc<dyn DirectoryStore>) -> Self {
        Self { store }
    }
}

impl Function for UserDeleted {
    fn slug(&self) -> &'static str {
        "sync-user-deleted"
    }

    fn trigger(&self) -> Trigger {
        Trigger::event(names::USER_DELETED)
    }

    fn run(&self, step: &mut StepContext, event: &Event) -> Result<(), StepError> {
        let payload: UserDeletedPayload = parse_payload(event)?;
        let store = self.store.clone();
        step.run("delete-user", move || {
            let removed = store.delete_user(payload.id).map_err(store_step_err)?;
            if removed {
                info!(user = %payload.id, "user deleted");
            } else {
                debug!(user = %payload.id, "delete for absent user ignored");
            }
            Ok(removed)
        })?;
        Ok(())
    }
}

/// Syncs `organization.created` into the directory.
pub struct OrgCreated {
    store: Arc<dyn DirectoryStore>,
}

impl OrgCreated {
    pub fn new(store: Arc<dyn DirectoryStore>) -> Self {
        Self { store }
    }
}

impl Function for OrgCreated {
    fn slug(&self) -> &'static str {
        "sync-org-created"
    }

    fn trigger(&self) -> Trigger {
        Trigger::event(names::ORG_CREATED)
    }

    fn run(&self, step: &mut StepContext, event: &Event) -> Result<(), StepError> {
        let payload: OrgCreatedPayload = parse_payload(event)?;
        let store = self.store.clone();
        step.run("sync-org", move || {
            let id = payload.id;
            let outcome = store
                .upsert_org(Organization::new(id, payload.name))
                .map_err(store_step_err)?;
            info!(org = %id, ?outcome, "organization synced");
            Ok(outcome == Upserted::Created)
        })?;
        Ok(())
    }
}

/// Syncs `organization.updated` into the directory.
pub struct OrgUpdated {
    store: Arc<dyn DirectoryStore>,
}

impl OrgUpdated {
    pub fn new(store: Arc<dyn DirectoryStore>) -> Self {
        Self { store }
    }
}

impl Function for OrgUpdated {
    fn slug(&self) -> &'static str {
        "sync-org-updated"
    }

    fn trigger(&self) -> Trigger {
        Trigger::event(names::ORG_UPDATED)
    }

    fn run(&self, step: &mut StepContext, event: &Event) -> Result<(), StepError> {
        let payload: OrgCreatedPayload = parse_payload(event)?;
        let store = self.store.clone();
        step.run("update-org", move || {
            let applied = store
                .update_org(payload.id, payload.name)
                .map_err(store_step_err)?;
            if !applied {
                debug!(org = %payload.id, "update for unknown organization ignored");
            }
            Ok(applied)
        })?;
        Ok(())
    }
}

/// Syncs `organization.deleted`; cascades to listings and memberships.
pub struct OrgDeleted {
    store: Arc<dyn DirectoryStore>,
}

impl OrgDeleted {
    pub fn new(store: Arc<dyn DirectoryStore>) -> Self {
        Self { store }
    }
}

impl Function for OrgDeleted {
    fn slug(&self) -> &'static str {
        "sync-org-deleted"
    }

    fn trigger(&self) -> Trigger {
        Trigger::event(names::ORG_DELETED)
    }

    fn run(&self, step: &mut StepContext, event: &Event) -> Result<(), StepError> {
        let payload: OrgDeletedPayload = parse_payload(event)?;
        let store = self.store.clone();
        step.run("delete-org", move || {
            let removed = store.delete_org(payload.id).map_err(store_step_err)?;
            if removed {
                info!(org = %payload.id, "organization deleted");
            } else {
                debug!(org = %payload.id, "delete for absent organization ignored");
            }
            Ok(removed)
        })?;
        Ok(())
    }
}

/// Syncs `organizationMembership.created`.
///
/// Both endpoints must already exist; a dangling reference is a permanent
/// input error, not something a retry can fix. Role changes arrive from the
/// provider as delete+create, so there is no membership update function.
pub struct MembershipCreated {
    store: Arc<dyn DirectoryStore>,
}

impl MembershipCreated {
    pub fn new(store: Arc<dyn DirectoryStore>) -> Self {
        Self { store }
    }
}

impl Function for MembershipCreated {
    fn slug(&self) -> &'static str {
        "sync-membership-created"
    }

    fn trigger(&self) -> Trigger {
        Trigger::event(names::MEMBERSHIP_CREATED)
    }

    fn run(&self, step: &mut StepContext, event: &Event) -> Result<(), StepError> {
        let payload: MembershipPayload = parse_payload(event)?;
        let store = self.store.clone();
        step.run("create-membership", move || {
            let membership = Membership::new(payload.user_id, payload.org_id, payload.role);
            let outcome = store.create_membership(membership).map_err(store_step_err)?;
            info!(user = %payload.user_id, org = %payload.org_id, ?outcome, "membership synced");
            Ok(outcome == Upserted::Created)
        })?;
        Ok(())
    }
}

/// Syncs `organizationMembership.deleted`.
pub struct MembershipDeleted {
    store: Arc<dyn DirectoryStore>,
}

impl MembershipDeleted {
    pub fn new(store: Arc<dyn DirectoryStore>) -> Self {
        Self { store }
    }
}

impl Function for MembershipDeleted {
    fn slug(&self) -> &'static str {
        "sync-membership-deleted"
    }

    fn trigger(&self) -> Trigger {
        Trigger::event(names::MEMBERSHIP_DELETED)
    }

    fn run(&self, step: &mut StepContext, event: &Event) -> Result<(), StepError> {
        let payload: MembershipPayload = parse_payload(event)?;
        let store = self.store.clone();
        step.run("delete-membership", move || {
            let removed = store
                .delete_membership(payload.user_id, payload.org_id)
                .map_err(store_step_err)?;
            if !removed {
                debug!(user = %payload.user_id, org = %payload.org_id, "delete for absent membership ignored");
            }
            Ok(removed)
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hireboard_directory::InMemoryDirectory;
    use proptest::prelude::*;
    use serde_json::json;
    use uuid::Uuid;

    fn store() -> Arc<InMemoryDirectory> {
        Arc::new(InMemoryDirectory::new())
    }

    fn user_event(name: &str, id: Uuid, user_name: &str, email: &str) -> Event {
        Event::new(name, json!({ "id": id, "name": user_name, "email": email }))
    }

    #[test]
    fn duplicate_user_created_yields_one_user_with_last_attributes() {
        let store = store();
        let handler = UserCreated::new(store.clone());
        let id = Uuid::now_v7();

        let first = user_event(names::USER_CREATED, id, "Ada", "ada@example.com");
        let second = user_event(names::USER_CREATED, id, "Ada Lovelace", "ada@example.com");

        handler.run(&mut StepContext::fresh(), &first).unwrap();
        handler.run(&mut StepContext::fresh(), &second).unwrap();
        // Redelivery of the last event must also be harmless.
        handler.run(&mut StepContext::fresh(), &second).unwrap();

        let user = store.get_user(UserId::from_uuid(id)).unwrap().unwrap();
        assert_eq!(user.name, "Ada Lovelace");
    }

    proptest! {
        #[test]
        fn repeated_user_created_deliveries_are_idempotent(
            deliveries in 1usize..6,
            name in "[a-zA-Z ]{1,24}",
        ) {
            let store = store();
            let handler = UserCreated::new(store.clone());
            let id = Uuid::now_v7();
            let event = user_event(names::USER_CREATED, id, &name, "p@example.com");

            for _ in 0..deliveries {
                handler.run(&mut StepContext::fresh(), &event).unwrap();
            }

            let user = store.get_user(UserId::from_uuid(id)).unwrap().unwrap();
            prop_assert_eq!(user.name, name);
        }
    }

    #[test]
    fn update_after_delete_neither_errors_nor_resurrects() {
        let store = store();
        let id = Uuid::now_v7();

        UserCreated::new(store.clone())
            .run(
                &mut StepContext::fresh(),
                &user_event(names::USER_CREATED, id, "Ada", "ada@example.com"),
            )
            .unwrap();

        UserDeleted::new(store.clone())
            .run(&mut StepContext::fresh(), &Event::new(names::USER_DELETED, json!({ "id": id })))
            .unwrap();

        UserUpdated::new(store.clone())
            .run(
                &mut StepContext::fresh(),
                &user_event(names::USER_UPDATED, id, "Ghost", "ghost@example.com"),
            )
            .unwrap();

        assert!(store.get_user(UserId::from_uuid(id)).unwrap().is_none());
    }

    #[test]
    fn delete_for_absent_user_is_a_no_op() {
        let handler = UserDeleted::new(store());
        let event = Event::new(names::USER_DELETED, json!({ "id": Uuid::now_v7() }));
        handler.run(&mut StepContext::fresh(), &event).unwrap();
    }

    #[test]
    fn membership_with_missing_endpoint_is_fatal() {
        let store = store();
        let handler = MembershipCreated::new(store);
        let event = Event::new(
            names::MEMBERSHIP_CREATED,
            json!({ "user_id": Uuid::now_v7(), "org_id": Uuid::now_v7() }),
        );

        let err = handler.run(&mut StepContext::fresh(), &event).unwrap_err();
        assert!(!err.is_retryable());
    }

    #[test]
    fn concurrent_membership_events_yield_one_row() {
        let store = store();
        let user = Uuid::now_v7();
        let org = Uuid::now_v7();

        UserCreated::new(store.clone())
            .run(
                &mut StepContext::fresh(),
                &user_event(names::USER_CREATED, user, "Ada", "ada@example.com"),
            )
            .unwrap();
        OrgCreated::new(store.clone())
            .run(
                &mut StepContext::fresh(),
                &Event::new(names::ORG_CREATED, json!({ "id": org, "name": "Acme" })),
            )
            .unwrap();

        let event = Event::new(
            names::MEMBERSHIP_CREATED,
            json!({ "user_id": user, "org_id": org, "role": "member" }),
        );

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                let event = event.clone();
                std::thread::spawn(move || {
                    MembershipCreated::new(store).run(&mut StepContext::fresh(), &event)
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap().unwrap();
        }

        let rows = store.memberships_for_user(UserId::from_uuid(user)).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn malformed_payload_is_fatal() {
        let handler = UserCreated::new(store());
        let event = Event::new(names::USER_CREATED, json!({ "id": "not-a-uuid" }));
        let err = handler.run(&mut StepContext::fresh(), &event).unwrap_err();
        assert!(!err.is_retryable());
    }
}
