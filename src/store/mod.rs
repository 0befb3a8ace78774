//! Durable store of unsaved document snapshots, keyed by file path.
//!
//! `DraftStore` wraps a [`DraftBackend`] and adds the guarantees the session
//! engine relies on:
//! - upsert semantics with strictly increasing timestamps
//! - at most one save/remove/rename in flight per path
//! - renames that lock both endpoints, so a rename waits for any pending
//!   save on either path to settle first

mod memory;
mod redb_backend;

pub use memory::MemoryBackend;
pub use redb_backend::RedbBackend;

use draftkeeper_types::{Draft, DraftBackend, StoreError};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OwnedMutexGuard;
use tracing::debug;

#[derive(Clone)]
pub struct DraftStore {
    backend: Arc<dyn DraftBackend>,
    locks: Arc<PathLocks>,
    last_timestamp: Arc<AtomicI64>,
}

impl DraftStore {
    pub fn new(backend: Arc<dyn DraftBackend>) -> Self {
        Self {
            backend,
            locks: Arc::new(PathLocks::default()),
            last_timestamp: Arc::new(AtomicI64::new(0)),
        }
    }

    /// Create or open a redb-backed store at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        Ok(Self::new(Arc::new(RedbBackend::open(path)?)))
    }

    /// A store that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()))
    }

    /// Insert or fully replace the draft for `path`, stamped with the current time.
    pub async fn save(&self, path: &str, content: &str) -> Result<Draft, StoreError> {
        let _guard = self.locks.lock(path).await;
        let draft = Draft::new(path, content, self.next_timestamp());
        self.backend.put(&draft).await?;
        debug!("Saved draft for {} ({} bytes)", path, content.len());
        Ok(draft)
    }

    pub async fn get(&self, path: &str) -> Result<Option<Draft>, StoreError> {
        self.backend.get(path).await
    }

    /// Remove the draft for `path`. Removing an absent draft succeeds.
    pub async fn remove(&self, path: &str) -> Result<(), StoreError> {
        let _guard = self.locks.lock(path).await;
        self.backend.remove(path).await?;
        debug!("Removed draft for {}", path);
        Ok(())
    }

    /// Move the draft at `old_path` to `new_path`; a no-op when there is none.
    pub async fn rename(&self, old_path: &str, new_path: &str) -> Result<(), StoreError> {
        if old_path == new_path {
            return Ok(());
        }

        // Fixed lock order keeps two crossing renames from deadlocking
        let (first, second) = if old_path < new_path {
            (old_path, new_path)
        } else {
            (new_path, old_path)
        };
        let _first = self.locks.lock(first).await;
        let _second = self.locks.lock(second).await;

        if self.backend.rename(old_path, new_path).await? {
            debug!("Moved draft {} -> {}", old_path, new_path);
        }
        Ok(())
    }

    /// Every stored draft, ordered by path.
    pub async fn list(&self) -> Result<Vec<Draft>, StoreError> {
        self.backend.list().await
    }

    fn next_timestamp(&self) -> i64 {
        let now = chrono::Utc::now().timestamp_millis();
        let previous = self
            .last_timestamp
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or_else(|last| last);
        now.max(previous + 1)
    }
}

/// One async mutex per path, created on demand and dropped when unused.
#[derive(Default)]
struct PathLocks {
    inner: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl PathLocks {
    async fn lock(&self, key: &str) -> PathGuard<'_> {
        let mutex = {
            let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            map.entry(key.to_string()).or_default().clone()
        };
        let guard = mutex.lock_owned().await;
        PathGuard {
            locks: self,
            key: key.to_string(),
            guard: Some(guard),
        }
    }
}

struct PathGuard<'a> {
    locks: &'a PathLocks,
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for PathGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut map = self
            .locks
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // Only the map still holds the mutex: nobody is waiting on this path
        if map
            .get(&self.key)
            .is_some_and(|mutex| Arc::strong_count(mutex) == 1)
        {
            map.remove(&self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::FailingBackend;

    #[tokio::test]
    async fn test_save_replaces_previous_draft() {
        let store = DraftStore::in_memory();
        let first = store.save("note.md", "one").await.unwrap();
        let second = store.save("note.md", "two").await.unwrap();

        assert!(second.timestamp > first.timestamp);
        assert_eq!(store.get("note.md").await.unwrap(), Some(second));
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let store = DraftStore::in_memory();
        store.save("note.md", "x").await.unwrap();
        store.remove("note.md").await.unwrap();
        store.remove("note.md").await.unwrap();
        assert!(store.get("note.md").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rename_preserves_draft() {
        let store = DraftStore::in_memory();
        let draft = store.save("old.md", "keep me").await.unwrap();

        store.rename("old.md", "new.md").await.unwrap();

        assert!(store.get("old.md").await.unwrap().is_none());
        assert_eq!(
            store.get("new.md").await.unwrap(),
            Some(draft.rekeyed("new.md"))
        );
    }

    #[tokio::test]
    async fn test_rename_absent_is_noop() {
        let store = DraftStore::in_memory();
        store.rename("nothing.md", "other.md").await.unwrap();
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_saves_leave_one_entry() {
        let store = DraftStore::in_memory();
        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.save("race.md", &format!("v{}", i)).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let drafts = store.list().await.unwrap();
        assert_eq!(drafts.len(), 1);
        assert!(store.locks.inner.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_crossing_renames_do_not_deadlock() {
        let store = DraftStore::in_memory();
        store.save("a.md", "a").await.unwrap();
        store.save("b.md", "b").await.unwrap();

        let s1 = store.clone();
        let s2 = store.clone();
        let (r1, r2) = tokio::join!(s1.rename("a.md", "b.md"), s2.rename("b.md", "a.md"));
        r1.unwrap();
        r2.unwrap();

        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_backend_failure_is_reported() {
        let store = DraftStore::new(Arc::new(FailingBackend));
        let err = store.save("note.md", "x").await.unwrap_err();
        assert!(matches!(err, StoreError::Database(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_rename_never_shows_both_or_neither_key() {
        let store = DraftStore::in_memory();
        store.save("old.md", "body").await.unwrap();

        let reader = {
            let store = store.clone();
            tokio::spawn(async move {
                for _ in 0..500 {
                    // Once the new key exists it stays, so seeing it before the
                    // old one means both existed at once
                    let new = store.get("new.md").await.unwrap().is_some();
                    let old = store.get("old.md").await.unwrap().is_some();
                    assert!(!(new && old), "both keys present");

                    // Once the old key is gone it stays gone
                    let old = store.get("old.md").await.unwrap().is_some();
                    let new = store.get("new.md").await.unwrap().is_some();
                    assert!(old || new, "neither key present");
                    tokio::task::yield_now().await;
                }
            })
        };
        tokio::task::yield_now().await;
        store.rename("old.md", "new.md").await.unwrap();
        reader.await.unwrap();

        assert_eq!(
            store.get("new.md").await.unwrap().map(|d| d.content),
            Some("body".to_string())
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_list_snapshots_during_renames_hold_one_draft() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = DraftStore::open(dir.path().join("drafts.redb")).unwrap();
        store.save("a.md", "body").await.unwrap();

        let renamer = {
            let store = store.clone();
            tokio::spawn(async move {
                for i in 0..50 {
                    let (from, to) = if i % 2 == 0 { ("a.md", "b.md") } else { ("b.md", "a.md") };
                    store.rename(from, to).await.unwrap();
                }
            })
        };
        while !renamer.is_finished() {
            let drafts = store.list().await.unwrap();
            assert_eq!(drafts.len(), 1, "saw {:?}", drafts);
            assert_eq!(drafts[0].content, "body");
            tokio::task::yield_now().await;
        }
        renamer.await.unwrap();
        assert_eq!(store.get("a.md").await.unwrap().map(|d| d.content), Some("body".to_string()));
    }
}
