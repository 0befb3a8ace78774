//! Suppression of change notifications caused by our own writes.
//!
//! The guard is a counter rather than a flag so that nested writes (a rename
//! issued while a save is still settling) keep it raised throughout. After the
//! outermost `end()` it stays active for a settle window, which absorbs the
//! delivery delay of the platform watcher.

use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug)]
pub struct SavingGuard {
    depth: usize,
    settle_until: Option<Instant>,
    settle_window: Duration,
}

impl SavingGuard {
    pub fn new(settle_window: Duration) -> Self {
        Self {
            depth: 0,
            settle_until: None,
            settle_window,
        }
    }

    /// A self-initiated write is starting.
    pub fn begin(&mut self) {
        self.depth += 1;
    }

    /// A self-initiated write finished; the guard drops after the settle window.
    pub fn end(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        let until = Instant::now() + self.settle_window;
        self.settle_until = Some(match self.settle_until {
            Some(existing) if existing > until => existing,
            _ => until,
        });
    }

    pub fn is_active(&self) -> bool {
        self.depth > 0 || self.settle_until.is_some_and(|until| Instant::now() < until)
    }

    /// Applies to writes that end after this call.
    pub fn set_settle_window(&mut self, settle_window: Duration) {
        self.settle_window = settle_window;
    }

    pub fn settle_window(&self) -> Duration {
        self.settle_window
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SETTLE: Duration = Duration::from_millis(300);

    #[tokio::test(start_paused = true)]
    async fn test_inactive_until_begin() {
        let mut guard = SavingGuard::new(SETTLE);
        assert!(!guard.is_active());
        guard.begin();
        assert!(guard.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stays_active_for_settle_window() {
        let mut guard = SavingGuard::new(SETTLE);
        guard.begin();
        guard.end();
        assert!(guard.is_active());

        tokio::time::advance(Duration::from_millis(299)).await;
        assert!(guard.is_active());

        tokio::time::advance(Duration::from_millis(2)).await;
        assert!(!guard.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_nested_writes_keep_guard_raised() {
        let mut guard = SavingGuard::new(SETTLE);
        guard.begin();
        guard.begin();
        guard.end();

        tokio::time::advance(SETTLE * 2).await;
        assert!(guard.is_active(), "outer write still running");

        guard.end();
        assert!(guard.is_active());
        tokio::time::advance(SETTLE + Duration::from_millis(1)).await;
        assert!(!guard.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbalanced_end_does_not_underflow() {
        let mut guard = SavingGuard::new(SETTLE);
        guard.end();
        tokio::time::advance(SETTLE * 2).await;
        assert!(!guard.is_active());
        guard.begin();
        assert!(guard.is_active());
    }
}
