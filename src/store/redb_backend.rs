//! Draft backend persisted in a `redb` database.

use async_trait::async_trait;
use draftkeeper_types::{Draft, DraftBackend, StoreError};
use redb::{Database, ReadableTable, TableDefinition};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;

// Drafts as JSON, keyed by raw path string
const DRAFTS_TABLE: TableDefinition<&str, &str> = TableDefinition::new("drafts");

pub struct RedbBackend {
    db: Arc<RwLock<Database>>,
}

impl RedbBackend {
    /// Create or open a draft database at the given path
    ///
    /// Missing parent directories are created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path).map_err(StoreError::database)?;

        // Create the table up front so readers never see TableDoesNotExist
        let write_txn = db.begin_write().map_err(StoreError::database)?;
        {
            write_txn
                .open_table(DRAFTS_TABLE)
                .map_err(StoreError::database)?;
        }
        write_txn.commit().map_err(StoreError::database)?;

        Ok(Self {
            db: Arc::new(RwLock::new(db)),
        })
    }
}

#[async_trait]
impl DraftBackend for RedbBackend {
    async fn get(&self, key: &str) -> Result<Option<Draft>, StoreError> {
        let db = self.db.read().await;
        let read_txn = db.begin_read().map_err(StoreError::database)?;
        let table = read_txn
            .open_table(DRAFTS_TABLE)
            .map_err(StoreError::database)?;

        let Some(json) = table.get(key).map_err(StoreError::database)? else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_str(json.value())?))
    }

    async fn put(&self, draft: &Draft) -> Result<(), StoreError> {
        let draft_json = serde_json::to_string(draft)?;

        let db = self.db.write().await;
        let write_txn = db.begin_write().map_err(StoreError::database)?;
        {
            let mut table = write_txn
                .open_table(DRAFTS_TABLE)
                .map_err(StoreError::database)?;
            table
                .insert(draft.file_path.as_str(), draft_json.as_str())
                .map_err(StoreError::database)?;
        }
        write_txn.commit().map_err(StoreError::database)?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let db = self.db.write().await;
        let write_txn = db.begin_write().map_err(StoreError::database)?;
        {
            let mut table = write_txn
                .open_table(DRAFTS_TABLE)
                .map_err(StoreError::database)?;
            table.remove(key).map_err(StoreError::database)?;
        }
        write_txn.commit().map_err(StoreError::database)?;
        Ok(())
    }

    async fn rename(&self, old_key: &str, new_key: &str) -> Result<bool, StoreError> {
        let db = self.db.write().await;
        let write_txn = db.begin_write().map_err(StoreError::database)?;
        {
            let mut table = write_txn
                .open_table(DRAFTS_TABLE)
                .map_err(StoreError::database)?;

            let existing = match table.get(old_key).map_err(StoreError::database)? {
                Some(json) => Some(serde_json::from_str::<Draft>(json.value())?),
                None => None,
            };
            let Some(draft) = existing else {
                return Ok(false);
            };

            let moved_json = serde_json::to_string(&draft.rekeyed(new_key))?;
            table
                .insert(new_key, moved_json.as_str())
                .map_err(StoreError::database)?;
            table.remove(old_key).map_err(StoreError::database)?;
        }
        // Both keys change in one commit
        write_txn.commit().map_err(StoreError::database)?;
        Ok(true)
    }

    async fn list(&self) -> Result<Vec<Draft>, StoreError> {
        let db = self.db.read().await;
        let read_txn = db.begin_read().map_err(StoreError::database)?;
        let table = read_txn
            .open_table(DRAFTS_TABLE)
            .map_err(StoreError::database)?;

        let mut drafts = Vec::new();
        for entry in table.iter().map_err(StoreError::database)? {
            let (_key, json) = entry.map_err(StoreError::database)?;
            drafts.push(serde_json::from_str(json.value())?);
        }
        Ok(drafts)
    }
}
