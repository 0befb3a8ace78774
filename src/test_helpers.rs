//! In-memory collaborators for tests.
//!
//! `FakeFiles` stands in for the filesystem, `FakeWatcher` lets a test decide
//! exactly when change notifications arrive, and `FailingBackend` rejects
//! every draft operation.

use async_trait::async_trait;
use draftkeeper_types::{
    ChangeEvent, Draft, DraftBackend, FileProvider, StoreError, WatchError, WatchHandle,
    WatchProvider, WriteError,
};
use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Files held in a map, with switchable write and rename failures.
#[derive(Debug, Default)]
pub struct FakeFiles {
    files: Mutex<HashMap<String, String>>,
    writes: Mutex<Vec<(String, String)>>,
    fail_writes: AtomicBool,
    fail_renames: AtomicBool,
}

impl FakeFiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.set_file(path, content);
        self
    }

    /// Change a file behind the session's back.
    pub fn set_file(&self, path: &str, content: &str) {
        lock(&self.files).insert(path.to_string(), content.to_string());
    }

    pub fn content(&self, path: &str) -> Option<String> {
        lock(&self.files).get(path).cloned()
    }

    /// Every successful write, in order.
    pub fn writes(&self) -> Vec<(String, String)> {
        lock(&self.writes).clone()
    }

    pub fn write_count(&self) -> usize {
        lock(&self.writes).len()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_renames(&self, fail: bool) {
        self.fail_renames.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl FileProvider for FakeFiles {
    async fn read_file(&self, path: &str) -> io::Result<String> {
        self.content(path)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.to_string()))
    }

    async fn write_file(&self, path: &str, content: &str) -> Result<(), WriteError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "write refused").into());
        }
        self.set_file(path, content);
        lock(&self.writes).push((path.to_string(), content.to_string()));
        Ok(())
    }

    async fn rename_entry(&self, old_path: &str, new_path: &str) -> io::Result<()> {
        if self.fail_renames.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "rename refused"));
        }
        let mut files = lock(&self.files);
        let content = files
            .remove(old_path)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, old_path.to_string()))?;
        files.insert(new_path.to_string(), content);
        Ok(())
    }
}

struct FakeSubscription {
    path: String,
    tx: mpsc::Sender<ChangeEvent>,
    stopped: Arc<AtomicBool>,
}

/// Watch provider driven by the test through [`FakeWatcher::emit`].
#[derive(Default)]
pub struct FakeWatcher {
    subscriptions: Mutex<Vec<FakeSubscription>>,
    failing: AtomicBool,
}

impl FakeWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent `start_watching` calls fail.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Deliver a change for `path` to every live subscription on it.
    /// Returns how many subscriptions received it.
    pub fn emit(&self, path: &str) -> usize {
        lock(&self.subscriptions)
            .iter()
            .filter(|s| s.path == path && !s.stopped.load(Ordering::SeqCst))
            .filter(|s| s.tx.try_send(ChangeEvent::new(path)).is_ok())
            .count()
    }

    /// Push an event for `path` into the most recent subscription regardless
    /// of what it watches, like a provider with a stale buffer.
    pub fn emit_on_latest(&self, path: &str) -> bool {
        lock(&self.subscriptions)
            .last()
            .is_some_and(|s| s.tx.try_send(ChangeEvent::new(path)).is_ok())
    }

    /// Number of subscriptions not yet stopped.
    pub fn active_count(&self) -> usize {
        lock(&self.subscriptions)
            .iter()
            .filter(|s| !s.stopped.load(Ordering::SeqCst))
            .count()
    }

    /// Paths of the subscriptions not yet stopped.
    pub fn active_paths(&self) -> Vec<String> {
        lock(&self.subscriptions)
            .iter()
            .filter(|s| !s.stopped.load(Ordering::SeqCst))
            .map(|s| s.path.clone())
            .collect()
    }
}

#[async_trait]
impl WatchProvider for FakeWatcher {
    async fn start_watching(
        &self,
        path: &str,
        events: mpsc::Sender<ChangeEvent>,
    ) -> Result<Box<dyn WatchHandle>, WatchError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(WatchError::Notify(format!("cannot watch {}", path)));
        }
        let stopped = Arc::new(AtomicBool::new(false));
        lock(&self.subscriptions).push(FakeSubscription {
            path: path.to_string(),
            tx: events,
            stopped: stopped.clone(),
        });
        Ok(Box::new(FakeWatchHandle { stopped }))
    }
}

struct FakeWatchHandle {
    stopped: Arc<AtomicBool>,
}

impl WatchHandle for FakeWatchHandle {
    fn stop(&mut self) {
        self.stopped.store(true, Ordering::SeqCst);
    }
}

impl Drop for FakeWatchHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Draft backend whose every operation fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingBackend;

#[async_trait]
impl DraftBackend for FailingBackend {
    async fn get(&self, _key: &str) -> Result<Option<Draft>, StoreError> {
        Err(StoreError::database("backend unavailable"))
    }

    async fn put(&self, _draft: &Draft) -> Result<(), StoreError> {
        Err(StoreError::database("backend unavailable"))
    }

    async fn remove(&self, _key: &str) -> Result<(), StoreError> {
        Err(StoreError::database("backend unavailable"))
    }

    async fn rename(&self, _old_key: &str, _new_key: &str) -> Result<bool, StoreError> {
        Err(StoreError::database("backend unavailable"))
    }

    async fn list(&self) -> Result<Vec<Draft>, StoreError> {
        Err(StoreError::database("backend unavailable"))
    }
}
