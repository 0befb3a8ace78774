//! Draft access for a session, with the memory-only fallback.
//!
//! The first persistence failure swaps the durable store for an in-memory one
//! and retries the operation there. The session keeps working; drafts from
//! then on last only as long as the process.

use crate::store::DraftStore;
use draftkeeper_types::{Draft, SessionEvent, StoreError};
use tokio::sync::broadcast;
use tracing::warn;

pub struct SessionDrafts {
    store: DraftStore,
    degraded: bool,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionDrafts {
    pub fn new(store: DraftStore, events: broadcast::Sender<SessionEvent>) -> Self {
        Self {
            store,
            degraded: false,
            events,
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    pub fn store(&self) -> &DraftStore {
        &self.store
    }

    /// Switch to memory-only drafts.
    fn degrade(&mut self, err: &StoreError) {
        warn!("Draft store failed, keeping drafts in memory: {}", err);
        self.store = DraftStore::in_memory();
        self.degraded = true;
        let _ = self.events.send(SessionEvent::StoreDegraded {
            error: err.to_string(),
        });
    }

    pub async fn get(&mut self, path: &str) -> Result<Option<Draft>, StoreError> {
        match self.store.get(path).await {
            Err(e) if !self.degraded => {
                self.degrade(&e);
                self.store.get(path).await
            }
            result => result,
        }
    }

    pub async fn save(&mut self, path: &str, content: &str) -> Result<Draft, StoreError> {
        match self.store.save(path, content).await {
            Err(e) if !self.degraded => {
                self.degrade(&e);
                self.store.save(path, content).await
            }
            result => result,
        }
    }

    pub async fn remove(&mut self, path: &str) -> Result<(), StoreError> {
        match self.store.remove(path).await {
            Err(e) if !self.degraded => {
                self.degrade(&e);
                self.store.remove(path).await
            }
            result => result,
        }
    }

    /// Renames are all-or-nothing, so failures are returned without fallback.
    pub async fn rename(&mut self, old_path: &str, new_path: &str) -> Result<(), StoreError> {
        self.store.rename(old_path, new_path).await
    }
}
