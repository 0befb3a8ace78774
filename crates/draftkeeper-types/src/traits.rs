//! Collaborator abstractions the session engine calls into.
//!
//! These traits decouple the engine from the real filesystem, the platform
//! watcher and the draft database, so tests can run isolated sessions
//! against in-memory fakes.

use crate::draft::Draft;
use crate::error::{StoreError, WatchError, WriteError};
use crate::events::ChangeEvent;
use crate::settings::Settings;
use async_trait::async_trait;
use std::io;
use tokio::sync::mpsc;

/// Reads, writes and renames document files.
#[async_trait]
pub trait FileProvider: Send + Sync {
    async fn read_file(&self, path: &str) -> io::Result<String>;

    async fn write_file(&self, path: &str, content: &str) -> Result<(), WriteError>;

    async fn rename_entry(&self, old_path: &str, new_path: &str) -> io::Result<()>;
}

/// A live subscription returned by [`WatchProvider::start_watching`].
///
/// Dropping the handle must stop the subscription as well.
pub trait WatchHandle: Send {
    /// Stop delivering events. Calling this more than once is a no-op.
    fn stop(&mut self);
}

/// Produces change notifications for a single path.
#[async_trait]
pub trait WatchProvider: Send + Sync {
    /// Start delivering [`ChangeEvent`]s for `path` into `events`.
    async fn start_watching(
        &self,
        path: &str,
        events: mpsc::Sender<ChangeEvent>,
    ) -> Result<Box<dyn WatchHandle>, WatchError>;
}

/// Ordered durable key-value medium holding drafts by path.
#[async_trait]
pub trait DraftBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Draft>, StoreError>;

    /// Insert or fully replace the draft stored under `draft.file_path`.
    async fn put(&self, draft: &Draft) -> Result<(), StoreError>;

    /// Remove a draft. Removing an absent key succeeds.
    async fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// Move the draft at `old_key` to `new_key` in one step, so readers never
    /// see both keys or neither. Returns `false` when there was nothing to move.
    async fn rename(&self, old_key: &str, new_key: &str) -> Result<bool, StoreError>;

    /// All drafts, ordered by key.
    async fn list(&self) -> Result<Vec<Draft>, StoreError>;
}

/// Supplies read-only configuration. Implementations should not cache.
#[async_trait]
pub trait SettingsProvider: Send + Sync {
    async fn settings(&self) -> Settings;
}
