//! The single live external-change subscription of a session.
//!
//! Every `watch` gets a fresh channel. Switching paths stops the old provider
//! handle and drops the old receiver, so events the provider buffered for the
//! previous path are discarded with it.

use draftkeeper_types::{ChangeEvent, WatchError, WatchHandle, WatchProvider};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

const EVENT_BUFFER: usize = 16;

pub struct WatchSubscription {
    provider: Arc<dyn WatchProvider>,
    active: Option<ActiveWatch>,
}

struct ActiveWatch {
    path: String,
    handle: Box<dyn WatchHandle>,
    events: mpsc::Receiver<ChangeEvent>,
}

impl WatchSubscription {
    pub fn new(provider: Arc<dyn WatchProvider>) -> Self {
        Self {
            provider,
            active: None,
        }
    }

    /// Stop any current subscription, then watch `path`. An empty path only stops.
    pub async fn watch(&mut self, path: &str) -> Result<(), WatchError> {
        self.unwatch();
        if path.is_empty() {
            return Ok(());
        }

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let handle = self.provider.start_watching(path, tx).await?;
        info!("Started watching: {}", path);
        self.active = Some(ActiveWatch {
            path: path.to_string(),
            handle,
            events: rx,
        });
        Ok(())
    }

    /// Stop the current subscription, if any.
    pub fn unwatch(&mut self) {
        if let Some(mut active) = self.active.take() {
            active.handle.stop();
            debug!("Stopped watching: {}", active.path);
        }
    }

    pub fn watched_path(&self) -> Option<&str> {
        self.active.as_ref().map(|a| a.path.as_str())
    }

    pub fn is_watching(&self) -> bool {
        self.active.is_some()
    }

    /// Next change event for the watched path.
    ///
    /// Pending forever while nothing is watched. Cancel-safe.
    pub async fn recv(&mut self) -> ChangeEvent {
        loop {
            let Some(active) = self.active.as_mut() else {
                return std::future::pending().await;
            };
            match active.events.recv().await {
                Some(event) if event.path == active.path => return event,
                Some(event) => debug!("Discarding event for unwatched path {}", event.path),
                None => {
                    warn!("Watch provider for {} went away", active.path);
                    self.active = None;
                }
            }
        }
    }
}

impl Drop for WatchSubscription {
    fn drop(&mut self) {
        self.unwatch();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::FakeWatcher;
    use std::time::Duration;

    async fn recv_soon(sub: &mut WatchSubscription) -> Option<ChangeEvent> {
        tokio::time::timeout(Duration::from_millis(50), sub.recv())
            .await
            .ok()
    }

    #[tokio::test]
    async fn test_delivers_events_for_watched_path() {
        let watcher = Arc::new(FakeWatcher::new());
        let mut sub = WatchSubscription::new(watcher.clone());

        sub.watch("a.md").await.unwrap();
        assert_eq!(watcher.emit("a.md"), 1);
        assert_eq!(recv_soon(&mut sub).await, Some(ChangeEvent::new("a.md")));
    }

    #[tokio::test]
    async fn test_switch_drops_buffered_events_for_old_path() {
        let watcher = Arc::new(FakeWatcher::new());
        let mut sub = WatchSubscription::new(watcher.clone());

        sub.watch("a.md").await.unwrap();
        watcher.emit("a.md");
        sub.watch("b.md").await.unwrap();

        assert_eq!(watcher.active_count(), 1);
        assert_eq!(recv_soon(&mut sub).await, None);

        // A provider that misroutes an old-path event is filtered too
        watcher.emit_on_latest("a.md");
        assert_eq!(recv_soon(&mut sub).await, None);

        watcher.emit("b.md");
        assert_eq!(recv_soon(&mut sub).await, Some(ChangeEvent::new("b.md")));
    }

    #[tokio::test]
    async fn test_empty_path_only_stops() {
        let watcher = Arc::new(FakeWatcher::new());
        let mut sub = WatchSubscription::new(watcher.clone());

        sub.watch("a.md").await.unwrap();
        sub.watch("").await.unwrap();
        assert!(!sub.is_watching());
        assert_eq!(watcher.active_count(), 0);

        sub.unwatch();
        sub.unwatch();
    }

    #[tokio::test]
    async fn test_failed_watch_leaves_nothing_watched() {
        let watcher = Arc::new(FakeWatcher::new());
        let mut sub = WatchSubscription::new(watcher.clone());
        sub.watch("a.md").await.unwrap();

        watcher.set_failing(true);
        assert!(sub.watch("b.md").await.is_err());
        assert_eq!(sub.watched_path(), None);
        assert_eq!(watcher.active_count(), 0);
    }
}
