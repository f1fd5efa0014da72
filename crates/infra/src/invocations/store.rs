//! Invocation storage implementations.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::Utc;

use hireboard_core::InvocationId;

use super::types::{DeadLetterEntry, Invocation, InvocationStatus};

/// Invocation store abstraction.
pub trait InvocationStore: Send + Sync {
    /// Enqueue a new invocation.
    fn enqueue(&self, invocation: Invocation) -> Result<InvocationId, InvocationStoreError>;

    /// Get an invocation by ID.
    fn get(&self, id: InvocationId) -> Result<Option<Invocation>, InvocationStoreError>;

    /// Update an invocation (step log, status, schedule).
    fn update(&self, invocation: &Invocation) -> Result<(), InvocationStoreError>;

    /// Claim the next pending invocation that is ready to execute.
    /// Returns None if none are available. Claiming marks it running.
    fn claim_next(&self) -> Result<Option<Invocation>, InvocationStoreError>;

    /// List invocations by status discriminant (None = all).
    fn list_by_status(
        &self,
        status: Option<InvocationStatus>,
        limit: usize,
    ) -> Result<Vec<Invocation>, InvocationStoreError>;

    /// Move an invocation to the dead-letter queue.
    fn dead_letter(&self, invocation: Invocation, reason: String) -> Result<(), InvocationStoreError>;

    /// List dead-lettered invocations for operator review.
    fn list_dead_letters(&self, limit: usize) -> Result<Vec<DeadLetterEntry>, InvocationStoreError>;

    /// Requeue a dead-lettered invocation (operator-initiated replay).
    fn retry_dead_letter(&self, id: InvocationId) -> Result<Invocation, InvocationStoreError>;

    /// Queue statistics.
    fn stats(&self) -> Result<InvocationStats, InvocationStoreError>;
}

/// Invocation store error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum InvocationStoreError {
    #[error("invocation not found: {0}")]
    NotFound(InvocationId),
    #[error("invocation already exists: {0}")]
    AlreadyExists(InvocationId),
    #[error("storage error: {0}")]
    Storage(String),
}

/// Queue statistics.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct InvocationStats {
    pub pending: usize,
    pub running: usize,
    pub completed: usize,
    pub failed: usize,
    pub dead_lettered: usize,
}

/// In-memory invocation store for tests/dev and the default wiring.
#[derive(Debug, Default)]
pub struct InMemoryInvocationStore {
    invocations: RwLock<HashMap<InvocationId, Invocation>>,
    dead_letters: RwLock<HashMap<InvocationId, DeadLetterEntry>>,
}

impl InMemoryInvocationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl InvocationStore for InMemoryInvocationStore {
    fn enqueue(&self, invocation: Invocation) -> Result<InvocationId, InvocationStoreError> {
        let mut invocations = self.invocations.write().unwrap();
        if invocations.contains_key(&invocation.id) {
            return Err(InvocationStoreError::AlreadyExists(invocation.id));
        }
        let id = invocation.id;
        invocations.insert(id, invocation);
        Ok(id)
    }

    fn get(&self, id: InvocationId) -> Result<Option<Invocation>, InvocationStoreError> {
        Ok(self.invocations.read().unwrap().get(&id).cloned())
    }

    fn update(&self, invocation: &Invocation) -> Result<(), InvocationStoreError> {
        let mut invocations = self.invocations.write().unwrap();
        if !invocations.contains_key(&invocation.id) {
            return Err(InvocationStoreError::NotFound(invocation.id));
        }
        invocations.insert(invocation.id, invocation.clone());
        Ok(())
    }

    fn claim_next(&self) -> Result<Option<Invocation>, InvocationStoreError> {
        let mut invocations = self.invocations.write().unwrap();

        // Oldest ready invocation first (FIFO by creation time).
        let mut candidates: Vec<_> = invocations
            .values()
            .filter(|i| {
                matches!(
                    i.status,
                    InvocationStatus::Pending | InvocationStatus::Failed { .. }
                ) && i.is_ready()
            })
            .collect();
        candidates.sort_by_key(|i| i.created_at);

        if let Some(inv) = candidates.first() {
            let id = inv.id;
            if let Some(inv) = invocations.get_mut(&id) {
                inv.mark_running();
                return Ok(Some(inv.clone()));
            }
        }

        Ok(None)
    }

    fn list_by_status(
        &self,
        status: Option<InvocationStatus>,
        limit: usize,
    ) -> Result<Vec<Invocation>, InvocationStoreError> {
        let invocations = self.invocations.read().unwrap();
        let mut result: Vec<_> = invocations
            .values()
            .filter(|i| {
                status
                    .as_ref()
                    .is_none_or(|s| std::mem::discriminant(&i.status) == std::mem::discriminant(s))
            })
            .cloned()
            .collect();

        result.sort_by_key(|i| i.created_at);
        result.truncate(limit);
        Ok(result)
    }

    fn dead_letter(&self, mut invocation: Invocation, reason: String) -> Result<(), InvocationStoreError> {
        let mut invocations = self.invocations.write().unwrap();
        let mut dls = self.dead_letters.write().unwrap();

        invocation.status = InvocationStatus::DeadLettered {
            error: reason.clone(),
            attempts: invocation.attempt,
        };
        invocation.updated_at = Utc::now();

        invocations.remove(&invocation.id);
        dls.insert(invocation.id, DeadLetterEntry::new(invocation, reason));

        Ok(())
    }

    fn list_dead_letters(&self, limit: usize) -> Result<Vec<DeadLetterEntry>, InvocationStoreError> {
        let dls = self.dead_letters.read().unwrap();
        let mut result: Vec<_> = dls.values().cloned().collect();
        result.sort_by_key(|e| e.dead_lettered_at);
        result.truncate(limit);
        Ok(result)
    }

    fn retry_dead_letter(&self, id: InvocationId) -> Result<Invocation, InvocationStoreError> {
        let mut invocations = self.invocations.write().unwrap();
        let mut dls = self.dead_letters.write().unwrap();

        let entry = dls.remove(&id).ok_or(InvocationStoreError::NotFound(id))?;

        let mut invocation = entry.invocation;
        invocation.status = InvocationStatus::Pending;
        invocation.attempt = 0;
        invocation.scheduled_at = None;
        invocation.updated_at = Utc::now();
        invocation.history.clear();
        // The step log is kept on purpose: completed steps stay completed.

        invocations.insert(invocation.id, invocation.clone());
        Ok(invocation)
    }

    fn stats(&self) -> Result<InvocationStats, InvocationStoreError> {
        let invocations = self.invocations.read().unwrap();
        let dls = self.dead_letters.read().unwrap();

        let mut stats = InvocationStats::default();

        for inv in invocations.values() {
            match &inv.status {
                InvocationStatus::Pending => stats.pending += 1,
                InvocationStatus::Running => stats.running += 1,
                InvocationStatus::Completed => stats.completed += 1,
                InvocationStatus::Failed { .. } => stats.failed += 1,
                InvocationStatus::DeadLettered { .. } => stats.dead_lettered += 1,
            }
        }
        stats.dead_lettered += dls.len();

        Ok(stats)
    }
}

impl<S> InvocationStore for Arc<S>
where
    S: InvocationStore + ?Sized,
{
    fn enqueue(&self, invocation: Invocation) -> Result<InvocationId, InvocationStoreError> {
        (**self).enqueue(invocation)
    }

    fn get(&self, id: InvocationId) -> Result<Option<Invocation>, InvocationStoreError> {
        (**self).get(id)
    }

    fn update(&self, invocation: &Invocation) -> Result<(), InvocationStoreError> {
        (**self).update(invocation)
    }

    fn claim_next(&self) -> Result<Option<Invocation>, InvocationStoreError> {
        (**self).claim_next()
    }

    fn list_by_status(
        &self,
        status: Option<InvocationStatus>,
        limit: usize,
    ) -> Result<Vec<Invocation>, InvocationStoreError> {
        (**self).list_by_status(status, limit)
    }

    fn dead_letter(&self, invocation: Invocation, reason: String) -> Result<(), InvocationStoreError> {
        (**self).dead_letter(invocation, reason)
    }

    fn list_dead_letters(&self, limit: usize) -> Result<Vec<DeadLetterEntry>, InvocationStoreError> {
        (**self).list_dead_letters(limit)
    }

    fn retry_dead_letter(&self, id: InvocationId) -> Result<Invocation, InvocationStoreError> {
        (**self).retry_dead_letter(id)
    }

    fn stats(&self) -> Result<InvocationStats, InvocationStoreError> {
        (**self).stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hireboard_events::Event;
    use serde_json::json;

    fn event() -> Event {
        Event::new("user.created", json!({"id": "u"}))
    }

    #[test]
    fn enqueue_and_claim() {
        let store = InMemoryInvocationStore::new();
        let inv = Invocation::new("sync-user-created", event());
        let id = store.enqueue(inv).unwrap();

        let claimed = store.claim_next().unwrap().unwrap();
        assert_eq!(claimed.id, id);
        assert!(matches!(claimed.status, InvocationStatus::Running));
        assert_eq!(claimed.attempt, 1);

        // No more ready invocations.
        assert!(store.claim_next().unwrap().is_none());
    }

    #[test]
    fn backoff_schedule_is_honored_by_claim() {
        let store = InMemoryInvocationStore::new();
        let mut inv = Invocation::new("summarize-resume", event());
        inv.mark_running();
        inv.mark_failed("transient".to_string(), true, Utc::now());
        assert!(inv.scheduled_at.is_some());
        store.enqueue(inv).unwrap();

        // Scheduled in the future; not claimable yet.
        assert!(store.claim_next().unwrap().is_none());
    }

    #[test]
    fn dead_letter_flow() {
        let store = InMemoryInvocationStore::new();
        let inv = Invocation::new("rank-application", event());
        let id = inv.id;
        store.enqueue(inv).unwrap();

        let mut claimed = store.claim_next().unwrap().unwrap();
        claimed.mark_failed("payload malformed".to_string(), false, Utc::now());
        store
            .dead_letter(claimed, "payload malformed".to_string())
            .unwrap();

        assert!(store.get(id).unwrap().is_none());

        let dls = store.list_dead_letters(10).unwrap();
        assert_eq!(dls.len(), 1);
        assert_eq!(dls[0].invocation.id, id);

        let retried = store.retry_dead_letter(id).unwrap();
        assert!(matches!(retried.status, InvocationStatus::Pending));
        assert!(store.list_dead_letters(10).unwrap().is_empty());
    }

    #[test]
    fn stats_tracking() {
        let store = InMemoryInvocationStore::new();
        for _ in 0..5 {
            store
                .enqueue(Invocation::new("sync-user-created", event()))
                .unwrap();
        }

        let stats = store.stats().unwrap();
        assert_eq!(stats.pending, 5);

        store.claim_next().unwrap();
        store.claim_next().unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.pending, 3);
        assert_eq!(stats.running, 2);
    }
}
