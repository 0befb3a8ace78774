//! Debounced persistence of buffer edits.
//!
//! Two timers run per open document:
//! - the draft timer persists the buffer to the DraftStore (always on)
//! - the write timer persists it to the real file (only with auto-save)
//!
//! Both restart on every edit, so a burst of edits produces one write of the
//! last content. Edits that return the buffer to the last durably written
//! content cancel whatever was pending.
//!
//! State per open file: `Idle -> PendingWrite -> Writing -> Idle`.

use super::drafts::SessionDrafts;
use super::guard::SavingGuard;
use super::timer::DebounceTimer;
use draftkeeper_types::{FileProvider, Settings, StoreError, WriteError};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutosaveState {
    Idle,
    PendingWrite,
    Writing,
}

/// Which timer fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Due {
    Draft,
    Write,
}

/// What an edit did to the schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    /// Content equals the last durable content and nothing was pending
    Unchanged,
    /// Content went back to the last durable content; pending work was dropped.
    /// `stale_draft` is true when a draft of the abandoned edits was stored.
    Reverted { stale_draft: bool },
    /// Timers (re)started
    Scheduled,
}

/// Result of a file write attempt.
#[derive(Debug)]
pub struct WriteOutcome {
    pub result: Result<(), WriteError>,
    /// A draft operation that failed alongside the write
    pub store_error: Option<StoreError>,
}

#[derive(Debug)]
pub struct AutosaveScheduler {
    state: AutosaveState,
    last_durable: String,
    draft_written: bool,
    draft_timer: DebounceTimer,
    write_timer: DebounceTimer,
}

impl AutosaveScheduler {
    /// `baseline` is the content currently known to be durable.
    pub fn new(baseline: impl Into<String>) -> Self {
        Self {
            state: AutosaveState::Idle,
            last_durable: baseline.into(),
            draft_written: false,
            draft_timer: DebounceTimer::new(),
            write_timer: DebounceTimer::new(),
        }
    }

    pub fn state(&self) -> AutosaveState {
        self.state
    }

    pub fn last_durable(&self) -> &str {
        &self.last_durable
    }

    pub fn is_dirty(&self, buffer: &str) -> bool {
        buffer != self.last_durable
    }

    /// A draft or file write is scheduled or running.
    pub fn is_pending(&self) -> bool {
        self.state != AutosaveState::Idle || self.draft_timer.is_armed()
    }

    /// Handle a buffer edit. `to_file` is false for documents with no file.
    pub fn on_edit(&mut self, content: &str, settings: &Settings, to_file: bool) -> EditOutcome {
        if content == self.last_durable {
            let had_pending = self.cancel();
            let stale_draft = std::mem::take(&mut self.draft_written);
            if had_pending || stale_draft {
                debug!("Edit reverted to saved content, dropping pending work");
                return EditOutcome::Reverted { stale_draft };
            }
            return EditOutcome::Unchanged;
        }

        self.draft_timer.schedule(settings.draft_delay());
        if to_file && settings.auto_save {
            self.write_timer.schedule(settings.auto_save_delay());
            self.state = AutosaveState::PendingWrite;
        }
        EditOutcome::Scheduled
    }

    /// Resolves when one of the timers fires. Pending forever when idle.
    pub async fn next_due(&mut self) -> Due {
        tokio::select! {
            _ = self.draft_timer.fired() => Due::Draft,
            _ = self.write_timer.fired() => Due::Write,
        }
    }

    /// Cancel both timers. Returns true if anything was scheduled.
    pub fn cancel(&mut self) -> bool {
        let draft = self.draft_timer.cancel();
        let write = self.write_timer.cancel();
        self.state = AutosaveState::Idle;
        draft || write
    }

    /// The buffer was replaced with `content` that is known to be durable.
    pub fn reset_baseline(&mut self, content: impl Into<String>) {
        self.cancel();
        self.last_durable = content.into();
        self.draft_written = false;
    }

    /// The draft was stored by someone else (recovery, close).
    pub fn mark_draft_written(&mut self) {
        self.draft_written = true;
    }

    /// Draft timer fired: persist `content` as a draft unless it is already durable.
    pub async fn save_draft(
        &mut self,
        path: &str,
        content: &str,
        drafts: &mut SessionDrafts,
    ) -> Result<bool, StoreError> {
        if content == self.last_durable {
            return Ok(false);
        }
        drafts.save(path, content).await?;
        self.draft_written = true;
        Ok(true)
    }

    /// Write `content` to the file now.
    ///
    /// On success the draft is removed and `content` becomes the new baseline.
    /// On failure the draft is kept (or created) as the durable record and the
    /// file is left as it was.
    pub async fn write(
        &mut self,
        path: &str,
        content: &str,
        guard: &mut SavingGuard,
        files: &dyn FileProvider,
        drafts: &mut SessionDrafts,
    ) -> WriteOutcome {
        self.write_timer.cancel();
        self.state = AutosaveState::Writing;
        guard.begin();

        let result = files.write_file(path, content).await;
        let store_error = match &result {
            Ok(()) => {
                info!("Saved {} ({} bytes)", path, content.len());
                self.last_durable = content.to_string();
                self.draft_timer.cancel();
                self.draft_written = false;
                drafts.remove(path).await.err()
            }
            Err(e) => {
                warn!("Auto-save of {} failed, keeping draft: {}", path, e);
                let saved = drafts.save(path, content).await;
                if saved.is_ok() {
                    self.draft_written = true;
                }
                saved.err()
            }
        };

        guard.end();
        self.state = AutosaveState::Idle;
        WriteOutcome {
            result,
            store_error,
        }
    }
}
