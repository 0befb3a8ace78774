//! In-memory draft backend, used by tests and as the degraded fallback.

use async_trait::async_trait;
use draftkeeper_types::{Draft, DraftBackend, StoreError};
use std::collections::BTreeMap;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
pub struct MemoryBackend {
    drafts: RwLock<BTreeMap<String, Draft>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DraftBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<Draft>, StoreError> {
        Ok(self.drafts.read().await.get(key).cloned())
    }

    async fn put(&self, draft: &Draft) -> Result<(), StoreError> {
        self.drafts
            .write()
            .await
            .insert(draft.file_path.clone(), draft.clone());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.drafts.write().await.remove(key);
        Ok(())
    }

    async fn rename(&self, old_key: &str, new_key: &str) -> Result<bool, StoreError> {
        let mut drafts = self.drafts.write().await;
        match drafts.remove(old_key) {
            Some(draft) => {
                drafts.insert(new_key.to_string(), draft.rekeyed(new_key));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list(&self) -> Result<Vec<Draft>, StoreError> {
        Ok(self.drafts.read().await.values().cloned().collect())
    }
}
