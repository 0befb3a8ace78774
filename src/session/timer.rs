//! Cancellable one-shot deadline used for debouncing.

use std::time::Duration;
use tokio::time::Instant;

/// Holds at most one scheduled deadline. Scheduling again replaces it.
#[derive(Debug, Default)]
pub struct DebounceTimer {
    deadline: Option<Instant>,
}

impl DebounceTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// (Re)start the timer; any earlier deadline is dropped.
    pub fn schedule(&mut self, delay: Duration) {
        self.deadline = Some(Instant::now() + delay);
    }

    /// Returns true if a deadline was pending.
    pub fn cancel(&mut self) -> bool {
        self.deadline.take().is_some()
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Resolves once the deadline passes, disarming the timer.
    ///
    /// Never resolves while unarmed. Cancel-safe: dropping the future before
    /// it completes leaves the deadline in place.
    pub async fn fired(&mut self) {
        match self.deadline {
            Some(deadline) => {
                tokio::time::sleep_until(deadline).await;
                self.deadline = None;
            }
            None => std::future::pending::<()>().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_reschedule_pushes_deadline_out() {
        let mut timer = DebounceTimer::new();
        let start = Instant::now();
        timer.schedule(Duration::from_millis(100));
        tokio::time::advance(Duration::from_millis(60)).await;
        timer.schedule(Duration::from_millis(100));

        timer.fired().await;
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(160), "fired early: {:?}", elapsed);
        assert!(elapsed < Duration::from_millis(170), "fired late: {:?}", elapsed);
        assert!(!timer.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_timer_never_fires() {
        let mut timer = DebounceTimer::new();
        timer.schedule(Duration::from_millis(10));
        assert!(timer.cancel());
        assert!(!timer.cancel());

        let fired = tokio::time::timeout(Duration::from_secs(1), timer.fired()).await;
        assert!(fired.is_err());
    }
}
