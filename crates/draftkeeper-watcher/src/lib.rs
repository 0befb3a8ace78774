//! Filesystem watching for draftkeeper.
//!
//! Provides a [`WatchProvider`](draftkeeper_types::WatchProvider) backed by
//! the `notify` crate. The session engine only sees `ChangeEvent { path }`.

pub mod watcher;

pub use watcher::{file_watcher_task, NotifyWatchHandle, NotifyWatchProvider, FILE_DEBOUNCE_MS};
