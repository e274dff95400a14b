//! In-memory document store and event outbox.
//!
//! Used by tests and demos. The store can be switched offline to simulate an
//! unreachable backend.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use tg_core::ports::{DocumentStorePort, EventOutboxPort};
use tg_core::{EventId, OnboardingEvent, OnboardingState, UserId};

#[derive(Default)]
pub struct InMemoryDocumentStore {
    records: Mutex<HashMap<UserId, OnboardingState>>,
    events: Mutex<Vec<OnboardingEvent>>,
    offline: AtomicBool,
    put_attempts: AtomicUsize,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// While offline every call fails.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Seed a record without going through `put_record`.
    pub async fn insert_record(&self, user_id: UserId, state: OnboardingState) {
        self.records.lock().await.insert(user_id, state);
    }

    pub async fn record(&self, user_id: &UserId) -> Option<OnboardingState> {
        self.records.lock().await.get(user_id).cloned()
    }

    pub async fn events(&self) -> Vec<OnboardingEvent> {
        self.events.lock().await.clone()
    }

    /// Number of `put_record` calls, failed ones included.
    pub fn put_attempts(&self) -> usize {
        self.put_attempts.load(Ordering::SeqCst)
    }

    fn ensure_online(&self) -> anyhow::Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            anyhow::bail!("document store unreachable");
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStorePort for InMemoryDocumentStore {
    async fn get_record(&self, user_id: &UserId) -> anyhow::Result<Option<OnboardingState>> {
        self.ensure_online()?;
        Ok(self.record(user_id).await)
    }

    async fn put_record(&self, user_id: &UserId, state: &OnboardingState) -> anyhow::Result<()> {
        self.put_attempts.fetch_add(1, Ordering::SeqCst);
        self.ensure_online()?;
        self.insert_record(user_id.clone(), state.clone()).await;
        Ok(())
    }

    async fn append_event(&self, event: &OnboardingEvent) -> anyhow::Result<()> {
        self.ensure_online()?;
        self.events.lock().await.push(event.clone());
        Ok(())
    }
}

/// Outbox that lives as long as the value does. Share one across sessions
/// to stand in for the on-disk file.
#[derive(Default)]
pub struct InMemoryEventOutbox {
    events: Mutex<Vec<OnboardingEvent>>,
}

impl InMemoryEventOutbox {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventOutboxPort for InMemoryEventOutbox {
    async fn push(&self, event: &OnboardingEvent) -> anyhow::Result<()> {
        self.events.lock().await.push(event.clone());
        Ok(())
    }

    async fn pending(&self) -> anyhow::Result<Vec<OnboardingEvent>> {
        Ok(self.events.lock().await.clone())
    }

    async fn remove(&self, id: &EventId) -> anyhow::Result<()> {
        self.events.lock().await.retain(|event| &event.id != id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn offline_store_rejects_calls() {
        let store = InMemoryDocumentStore::new();
        store.set_offline(true);

        assert!(store.get_record(&"u1".into()).await.is_err());
        assert!(store
            .put_record(&"u1".into(), &OnboardingState::default())
            .await
            .is_err());
        assert_eq!(store.put_attempts(), 1);

        store.set_offline(false);
        store
            .put_record(&"u1".into(), &OnboardingState::default())
            .await
            .unwrap();
        assert!(store.record(&"u1".into()).await.is_some());
    }
}
