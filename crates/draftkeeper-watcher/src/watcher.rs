//! Single-file watcher built on `notify`.
//!
//! Each subscription owns one platform watcher and one tokio task. Stopping
//! the handle aborts the task, which drops the watcher and its channel, so
//! nothing buffered for the old path can leak into a later subscription.

use async_trait::async_trait;
use draftkeeper_types::{ChangeEvent, WatchError, WatchHandle, WatchProvider};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Default debounce duration for file change notifications (100ms)
pub const FILE_DEBOUNCE_MS: u64 = 100;

/// [`WatchProvider`] that watches the parent directory of the target file.
///
/// Many editors write atomically (temp file, then rename over the target),
/// which replaces the inode. Watching the directory catches those writes.
#[derive(Debug, Clone)]
pub struct NotifyWatchProvider {
    debounce: Duration,
}

impl NotifyWatchProvider {
    pub fn new() -> Self {
        Self::with_debounce(Duration::from_millis(FILE_DEBOUNCE_MS))
    }

    pub fn with_debounce(debounce: Duration) -> Self {
        Self { debounce }
    }
}

impl Default for NotifyWatchProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WatchProvider for NotifyWatchProvider {
    async fn start_watching(
        &self,
        path: &str,
        events: mpsc::Sender<ChangeEvent>,
    ) -> Result<Box<dyn WatchHandle>, WatchError> {
        let file_path = PathBuf::from(path);
        tokio::fs::metadata(&file_path).await?;
        let parent_dir = watch_dir_for(&file_path)?;

        let (notify_tx, notify_rx) = mpsc::channel::<Result<Event, notify::Error>>(100);
        let mut watcher = RecommendedWatcher::new(
            move |res| {
                let _ = notify_tx.blocking_send(res);
            },
            Config::default(),
        )
        .map_err(|e| WatchError::Notify(e.to_string()))?;

        watcher
            .watch(&parent_dir, RecursiveMode::NonRecursive)
            .map_err(|e| WatchError::Notify(e.to_string()))?;

        info!(
            "Watching file: {} (via parent dir: {})",
            file_path.display(),
            parent_dir.display()
        );

        let task = tokio::spawn(file_watcher_task(
            watcher,
            file_path,
            path.to_string(),
            notify_rx,
            events,
            self.debounce,
        ));
        Ok(Box::new(NotifyWatchHandle::new(task)))
    }
}

/// Handle for a running [`file_watcher_task`].
#[derive(Debug)]
pub struct NotifyWatchHandle {
    task: Option<JoinHandle<()>>,
}

impl NotifyWatchHandle {
    pub fn new(task: JoinHandle<()>) -> Self {
        Self { task: Some(task) }
    }
}

impl WatchHandle for NotifyWatchHandle {
    fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for NotifyWatchHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

fn watch_dir_for(file_path: &Path) -> Result<PathBuf, WatchError> {
    match file_path.parent() {
        Some(p) if p.as_os_str().is_empty() => Ok(PathBuf::from(".")),
        Some(p) => Ok(p.to_path_buf()),
        None => Err(WatchError::NoParent(file_path.display().to_string())),
    }
}

/// True when `event_path` refers to `file_path`.
fn matches_target(event_path: &Path, file_path: &Path, canonical_file_path: &Path) -> bool {
    if let Ok(canonical) = event_path.canonicalize() {
        if canonical == canonical_file_path {
            return true;
        }
    }
    event_path.file_name() == file_path.file_name() && event_path.parent() == file_path.parent()
}

/// Whether a notify event should count as a change of the target file.
///
/// Renames in either direction count: an atomic save lands as a rename onto
/// the target, and a rename away means the file is gone.
fn should_trigger(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Remove(_) | EventKind::Modify(_)
    )
}

/// Task that turns raw notify events into debounced [`ChangeEvent`]s.
///
/// - Filters events to the target file
/// - Restarts the debounce deadline on every matching event
/// - Sends one `ChangeEvent { path: key }` once the deadline passes
/// - Logs watcher errors and keeps going
/// - Exits when the receiver is dropped
///
/// The watcher is owned by the task so that aborting the task tears it down.
pub async fn file_watcher_task(
    watcher: RecommendedWatcher,
    file_path: PathBuf,
    key: String,
    mut notify_rx: mpsc::Receiver<Result<Event, notify::Error>>,
    tx: mpsc::Sender<ChangeEvent>,
    debounce: Duration,
) {
    let _watcher = watcher;
    let canonical_file_path = file_path
        .canonicalize()
        .unwrap_or_else(|_| file_path.clone());
    let mut debounce_timer: Option<tokio::time::Instant> = None;

    loop {
        tokio::select! {
            res = notify_rx.recv() => {
                match res {
                    Some(Ok(event)) => {
                        let affects_target = event
                            .paths
                            .iter()
                            .any(|p| matches_target(p, &file_path, &canonical_file_path));
                        if affects_target && should_trigger(&event.kind) {
                            debug!("Change on {}: {:?}", key, event.kind);
                            debounce_timer = Some(tokio::time::Instant::now() + debounce);
                        }
                    }
                    Some(Err(e)) => warn!("File watcher error for {}: {}", key, e),
                    None => break,
                }
            }
            _ = async {
                if let Some(deadline) = debounce_timer {
                    tokio::time::sleep_until(deadline).await;
                } else {
                    std::future::pending::<()>().await;
                }
            } => {
                debounce_timer = None;
                if tx.send(ChangeEvent::new(key.clone())).await.is_err() {
                    break;
                }
            }
        }
    }

    debug!("Stopped watching: {}", key);
}
