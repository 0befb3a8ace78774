//! Reaction to change notifications for the open file.

use super::guard::SavingGuard;
use draftkeeper_types::{ChangeEvent, ReloadMode};
use tracing::debug;

/// A change the user has not answered yet. Later changes coalesce into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingNotification {
    pub path: String,
    /// Number of change events folded into this notification
    pub events: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeDecision {
    /// Not about the watched path
    Ignored,
    /// Presumed echo of our own write
    Echo,
    Reload,
    Prompt,
}

#[derive(Debug, Default)]
pub struct ExternalChangeCoordinator {
    pending: Option<PendingNotification>,
}

impl ExternalChangeCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide what a change event should do. Does not touch the pending slot.
    pub fn decide(
        &self,
        event: &ChangeEvent,
        watched: Option<&str>,
        guard: &SavingGuard,
        mode: ReloadMode,
        buffer_dirty: bool,
    ) -> ChangeDecision {
        if watched != Some(event.path.as_str()) {
            return ChangeDecision::Ignored;
        }
        if guard.is_active() {
            debug!("Ignoring change to {} while saving", event.path);
            return ChangeDecision::Echo;
        }
        match mode {
            ReloadMode::Auto => ChangeDecision::Reload,
            ReloadMode::Confirm => ChangeDecision::Prompt,
            ReloadMode::WhenClean if buffer_dirty => ChangeDecision::Prompt,
            ReloadMode::WhenClean => ChangeDecision::Reload,
        }
    }

    /// Record a notification for `path`. Returns true if this is a new one,
    /// false if it was folded into the existing notification.
    pub fn record(&mut self, path: &str) -> bool {
        match &mut self.pending {
            Some(pending) if pending.path == path => {
                pending.events += 1;
                debug!("Coalesced change for {} ({} events)", path, pending.events);
                false
            }
            slot => {
                *slot = Some(PendingNotification {
                    path: path.to_string(),
                    events: 1,
                });
                true
            }
        }
    }

    pub fn pending(&self) -> Option<&PendingNotification> {
        self.pending.as_ref()
    }

    pub fn take(&mut self) -> Option<PendingNotification> {
        self.pending.take()
    }

    pub fn clear(&mut self) {
        self.pending = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn guard() -> SavingGuard {
        SavingGuard::new(Duration::from_millis(500))
    }

    #[tokio::test(start_paused = true)]
    async fn test_active_guard_marks_echo() {
        let coordinator = ExternalChangeCoordinator::new();
        let mut guard = guard();
        guard.begin();

        let event = ChangeEvent::new("a.md");
        for mode in [ReloadMode::Auto, ReloadMode::Confirm, ReloadMode::WhenClean] {
            assert_eq!(
                coordinator.decide(&event, Some("a.md"), &guard, mode, true),
                ChangeDecision::Echo
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_other_paths_are_ignored() {
        let coordinator = ExternalChangeCoordinator::new();
        let event = ChangeEvent::new("old.md");
        assert_eq!(
            coordinator.decide(&event, Some("new.md"), &guard(), ReloadMode::Auto, false),
            ChangeDecision::Ignored
        );
        assert_eq!(
            coordinator.decide(&event, None, &guard(), ReloadMode::Auto, false),
            ChangeDecision::Ignored
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_when_clean_depends_on_dirty_buffer() {
        let coordinator = ExternalChangeCoordinator::new();
        let event = ChangeEvent::new("a.md");
        let guard = guard();
        assert_eq!(
            coordinator.decide(&event, Some("a.md"), &guard, ReloadMode::WhenClean, false),
            ChangeDecision::Reload
        );
        assert_eq!(
            coordinator.decide(&event, Some("a.md"), &guard, ReloadMode::WhenClean, true),
            ChangeDecision::Prompt
        );
    }

    #[test]
    fn test_record_coalesces_per_path() {
        let mut coordinator = ExternalChangeCoordinator::new();
        assert!(coordinator.record("a.md"));
        assert!(!coordinator.record("a.md"));
        assert_eq!(
            coordinator.pending(),
            Some(&PendingNotification {
                path: "a.md".into(),
                events: 2
            })
        );

        assert!(coordinator.record("b.md"));
        assert_eq!(coordinator.take().map(|p| p.path), Some("b.md".to_string()));
        assert!(coordinator.pending().is_none());
    }
}
