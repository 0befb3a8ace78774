//! The session engine: one open document, its draft, and its file.
//!
//! All state transitions run on the caller's task. Timer firings and change
//! notifications are pulled in through [`Session::next_wakeup`] and applied
//! with [`Session::handle_wakeup`], so they never interleave with each other
//! or with direct calls such as [`Session::on_buffer_changed`].

use super::autosave::{AutosaveScheduler, AutosaveState, Due, EditOutcome};
use super::drafts::SessionDrafts;
use super::external::{ChangeDecision, ExternalChangeCoordinator, PendingNotification};
use super::guard::SavingGuard;
use super::recovery::{RecoveryResolver, Resolution};
use super::subscription::WatchSubscription;
use crate::store::DraftStore;
use draftkeeper_types::{
    is_untitled, untitled_path, ChangeEvent, FileProvider, ReloadMode, RenameError, SessionError,
    SessionEvent, SessionResult, Settings, SettingsProvider, WatchProvider, WriteError,
};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

const EVENT_CAPACITY: usize = 64;

/// Something the session has to react to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Wakeup {
    Autosave(Due),
    External(ChangeEvent),
}

struct Document {
    path: String,
    buffer: String,
    autosave: AutosaveScheduler,
}

impl Document {
    fn new(path: &str, buffer: String, baseline: &str) -> Self {
        Self {
            path: path.to_string(),
            buffer,
            autosave: AutosaveScheduler::new(baseline),
        }
    }
}

pub struct Session {
    files: Arc<dyn FileProvider>,
    settings: Arc<dyn SettingsProvider>,
    drafts: SessionDrafts,
    watch: WatchSubscription,
    guard: SavingGuard,
    external: ExternalChangeCoordinator,
    document: Option<Document>,
    recovery: Option<RecoveryResolver>,
    events: broadcast::Sender<SessionEvent>,
}

impl Session {
    pub fn new(
        files: Arc<dyn FileProvider>,
        watcher: Arc<dyn WatchProvider>,
        settings: Arc<dyn SettingsProvider>,
        store: DraftStore,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            files,
            settings,
            drafts: SessionDrafts::new(store, events.clone()),
            watch: WatchSubscription::new(watcher),
            guard: SavingGuard::new(Settings::default().settle_window()),
            external: ExternalChangeCoordinator::new(),
            document: None,
            recovery: None,
            events,
        }
    }

    /// Receive [`SessionEvent`]s published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: SessionEvent) {
        // No receivers is fine
        let _ = self.events.send(event);
    }

    // ---- Queries ----

    pub fn current_path(&self) -> Option<&str> {
        self.document.as_ref().map(|d| d.path.as_str())
    }

    pub fn buffer(&self) -> Option<&str> {
        self.document.as_ref().map(|d| d.buffer.as_str())
    }

    /// The buffer differs from the last content known to be durable.
    pub fn is_dirty(&self) -> bool {
        self.document
            .as_ref()
            .is_some_and(|d| d.autosave.is_dirty(&d.buffer))
    }

    pub fn is_save_pending(&self) -> bool {
        self.document
            .as_ref()
            .is_some_and(|d| d.autosave.is_pending())
    }

    pub fn is_recovery_pending(&self) -> bool {
        self.recovery.as_ref().is_some_and(|r| r.is_pending())
    }

    pub fn recovery(&self) -> Option<&RecoveryResolver> {
        self.recovery.as_ref()
    }

    pub fn pending_notification(&self) -> Option<&PendingNotification> {
        self.external.pending()
    }

    pub fn autosave_state(&self) -> Option<AutosaveState> {
        self.document.as_ref().map(|d| d.autosave.state())
    }

    pub fn watched_path(&self) -> Option<&str> {
        self.watch.watched_path()
    }

    pub fn is_store_degraded(&self) -> bool {
        self.drafts.is_degraded()
    }

    pub fn draft_store(&self) -> &DraftStore {
        self.drafts.store()
    }

    // ---- Opening and recovery ----

    /// Open `path`, closing the current document first.
    ///
    /// Untitled documents load from their draft. Files are read from disk and
    /// compared with any stored draft; a differing draft leaves the session in
    /// [`Resolution::AwaitingUserChoice`] until [`Session::choose_draft`] or
    /// [`Session::choose_file`] is called.
    pub async fn open_file(&mut self, path: &str) -> SessionResult<Resolution> {
        self.close().await?;

        if is_untitled(path) {
            let draft = self.drafts.get(path).await?;
            let mut document = Document::new(path, String::new(), "");
            if let Some(draft) = draft {
                document.buffer = draft.content;
                document.autosave.mark_draft_written();
            }
            self.document = Some(document);
            info!("Opened untitled document {}", path);
            self.emit(SessionEvent::Opened {
                path: path.to_string(),
            });
            return Ok(Resolution::UseDraft);
        }

        let content = self.files.read_file(path).await?;
        let resolver = RecoveryResolver::resolve(path, content.clone(), &mut self.drafts).await?;
        let resolution = resolver.resolution();
        let pending = resolver.is_pending();
        self.document = Some(Document::new(path, content.clone(), &content));
        self.recovery = Some(resolver);

        // Changes during a recovery prompt are held as a pending notification
        self.start_watch(path).await;

        if pending {
            self.emit(SessionEvent::RecoveryPending {
                path: path.to_string(),
            });
            return Ok(resolution);
        }

        info!("Opened {}", path);
        self.emit(SessionEvent::Opened {
            path: path.to_string(),
        });
        Ok(resolution)
    }

    /// Answer a recovery prompt with the draft. Returns the new buffer.
    pub async fn choose_draft(&mut self) -> SessionResult<String> {
        let recovery = self
            .recovery
            .as_mut()
            .ok_or(SessionError::NoRecoveryPending)?;
        let content = recovery.choose_draft()?;
        let path = recovery.path().to_string();

        let document = self.document.as_mut().ok_or(SessionError::NoDocument)?;
        document.buffer = content.clone();
        document.autosave.mark_draft_written();

        self.emit(SessionEvent::Recovered {
            path,
            used_draft: true,
        });
        Ok(content)
    }

    /// Answer a recovery prompt with the file; the draft is discarded.
    ///
    /// The file is read again, so changes made while the prompt was open
    /// end up in the buffer and any notification for them is dropped.
    pub async fn choose_file(&mut self) -> SessionResult<String> {
        let recovery = self
            .recovery
            .as_mut()
            .ok_or(SessionError::NoRecoveryPending)?;
        let loaded = recovery.choose_file(&mut self.drafts).await?;
        let path = recovery.path().to_string();

        let content = match self.files.read_file(&path).await {
            Ok(content) => content,
            Err(e) => {
                warn!("Re-reading {} failed, using content from open: {}", path, e);
                loaded
            }
        };

        let document = self.document.as_mut().ok_or(SessionError::NoDocument)?;
        document.buffer = content.clone();
        document.autosave.reset_baseline(content.clone());
        self.external.clear();

        self.emit(SessionEvent::Recovered {
            path,
            used_draft: false,
        });
        Ok(content)
    }

    /// Watch failures disable change detection for this document only.
    async fn start_watch(&mut self, path: &str) {
        if is_untitled(path) {
            self.watch.unwatch();
            return;
        }
        if let Err(e) = self.watch.watch(path).await {
            warn!("Not watching {} for external changes: {}", path, e);
            self.emit(SessionEvent::WatchFailed {
                path: path.to_string(),
                error: e.to_string(),
            });
        }
    }

    // ---- Editing and saving ----

    /// The editing surface changed the buffer of `path`.
    ///
    /// Changes for a path other than the open one are ignored.
    pub async fn on_buffer_changed(&mut self, path: &str, content: &str) -> SessionResult<()> {
        if self.is_recovery_pending() {
            return Err(SessionError::RecoveryPending(path.to_string()));
        }
        let Some(document) = self.document.as_mut().filter(|d| d.path == path) else {
            debug!("Ignoring edit for {} which is not open", path);
            return Ok(());
        };

        let settings = self.settings.settings().await;
        document.buffer = content.to_string();
        let untitled = is_untitled(path);
        let outcome = document.autosave.on_edit(content, &settings, !untitled);

        if let EditOutcome::Reverted { stale_draft: true } = outcome {
            // An untitled document keeps an empty draft so it stays listed
            if untitled {
                self.drafts.save(path, "").await?;
            } else {
                self.drafts.remove(path).await?;
            }
        }
        Ok(())
    }

    /// Write the buffer to its file now, cancelling pending autosaves.
    pub async fn save(&mut self) -> SessionResult<()> {
        if let Some(recovery) = self.recovery.as_ref().filter(|r| r.is_pending()) {
            return Err(SessionError::RecoveryPending(recovery.path().to_string()));
        }
        self.write_document().await
    }

    async fn write_document(&mut self) -> SessionResult<()> {
        let settings = self.settings.settings().await;
        self.guard.set_settle_window(settings.settle_window());

        let document = self.document.as_mut().ok_or(SessionError::NoDocument)?;
        if is_untitled(&document.path) {
            return Err(WriteError::Untitled(document.path.clone()).into());
        }

        let outcome = document
            .autosave
            .write(
                &document.path,
                &document.buffer,
                &mut self.guard,
                self.files.as_ref(),
                &mut self.drafts,
            )
            .await;
        let path = document.path.clone();

        if let Some(e) = &outcome.store_error {
            error!("Draft update after writing {} failed: {}", path, e);
        }
        match outcome.result {
            Ok(()) => {
                self.emit(SessionEvent::Saved { path });
                Ok(())
            }
            Err(e) => {
                self.emit(SessionEvent::SaveFailed {
                    path,
                    error: e.to_string(),
                });
                Err(e.into())
            }
        }
    }

    async fn write_draft(&mut self) -> SessionResult<()> {
        let Some(document) = self.document.as_mut() else {
            return Ok(());
        };
        let saved = document
            .autosave
            .save_draft(&document.path, &document.buffer, &mut self.drafts)
            .await?;
        if saved {
            let path = document.path.clone();
            self.emit(SessionEvent::DraftSaved { path });
        }
        Ok(())
    }

    /// Create an untitled document called `name` and open it.
    ///
    /// An existing untitled draft with the same name is reopened as is.
    pub async fn new_untitled(&mut self, name: &str) -> SessionResult<String> {
        let path = untitled_path(name);
        self.close().await?;
        if self.drafts.get(&path).await?.is_none() {
            self.drafts.save(&path, "").await?;
        }
        self.open_file(&path).await?;
        Ok(path)
    }

    /// Write an untitled document to `new_path` and continue editing it there.
    pub async fn save_as(&mut self, new_path: &str) -> SessionResult<()> {
        let settings = self.settings.settings().await;
        self.guard.set_settle_window(settings.settle_window());

        let document = self.document.as_mut().ok_or(SessionError::NoDocument)?;
        if !is_untitled(&document.path) {
            return Err(SessionError::NotUntitled(document.path.clone()));
        }
        if is_untitled(new_path) {
            return Err(WriteError::Untitled(new_path.to_string()).into());
        }

        self.guard.begin();
        let result = self.files.write_file(new_path, &document.buffer).await;
        self.guard.end();

        let old_path = document.path.clone();
        if let Err(e) = result {
            warn!("Save as {} failed: {}", new_path, e);
            let error = e.to_string();
            self.emit(SessionEvent::SaveFailed {
                path: old_path,
                error,
            });
            return Err(e.into());
        }

        document.path = new_path.to_string();
        let buffer = document.buffer.clone();
        document.autosave.reset_baseline(buffer);

        self.drafts.remove(&old_path).await?;
        self.drafts.remove(new_path).await?;
        self.start_watch(new_path).await;

        info!("Saved {} as {}", old_path, new_path);
        self.emit(SessionEvent::Saved {
            path: new_path.to_string(),
        });
        self.emit(SessionEvent::Renamed {
            from: old_path,
            to: new_path.to_string(),
        });
        Ok(())
    }

    /// Move the open file to `new_path`, taking its draft and watch along.
    ///
    /// All or nothing: when the draft cannot follow, the file is moved back
    /// and the session still points at the old path.
    pub async fn rename(&mut self, new_path: &str) -> SessionResult<()> {
        if let Some(recovery) = self.recovery.as_ref().filter(|r| r.is_pending()) {
            return Err(SessionError::RecoveryPending(recovery.path().to_string()));
        }
        let old_path = self
            .document
            .as_ref()
            .map(|d| d.path.clone())
            .ok_or(SessionError::NoDocument)?;
        if is_untitled(&old_path) {
            return Err(RenameError::Untitled(old_path).into());
        }
        if old_path == new_path {
            return Ok(());
        }

        self.guard.begin();
        let result = self.rename_entry_and_draft(&old_path, new_path).await;
        self.guard.end();
        result?;

        if let Some(document) = self.document.as_mut() {
            document.path = new_path.to_string();
        }
        self.external.clear();
        self.start_watch(new_path).await;

        info!("Renamed {} -> {}", old_path, new_path);
        self.emit(SessionEvent::Renamed {
            from: old_path,
            to: new_path.to_string(),
        });
        Ok(())
    }

    async fn rename_entry_and_draft(
        &mut self,
        old_path: &str,
        new_path: &str,
    ) -> Result<(), RenameError> {
        self.files
            .rename_entry(old_path, new_path)
            .await
            .map_err(RenameError::Entry)?;

        if let Err(e) = self.drafts.rename(old_path, new_path).await {
            warn!("Draft for {} could not follow rename, rolling back: {}", old_path, e);
            if let Err(rollback) = self.files.rename_entry(new_path, old_path).await {
                error!(
                    "Rolling back rename {} -> {} failed: {}",
                    old_path, new_path, rollback
                );
            }
            return Err(RenameError::Draft(e));
        }
        Ok(())
    }

    /// Close the open document, keeping unsaved content as a draft.
    pub async fn close(&mut self) -> SessionResult<()> {
        let recovering = self.is_recovery_pending();
        let Some(mut document) = self.release() else {
            return Ok(());
        };

        let cancelled = document.autosave.cancel();
        if !recovering && document.autosave.is_dirty(&document.buffer) {
            if cancelled {
                debug!("Flushing pending edits of {} to draft", document.path);
            }
            self.drafts.save(&document.path, &document.buffer).await?;
        }

        info!("Closed {}", document.path);
        self.emit(SessionEvent::Closed {
            path: document.path,
        });
        Ok(())
    }

    /// Close the open document and throw away its draft.
    pub async fn close_discarding(&mut self) -> SessionResult<()> {
        let Some(mut document) = self.release() else {
            return Ok(());
        };
        document.autosave.cancel();
        self.drafts.remove(&document.path).await?;

        info!("Closed {} discarding unsaved changes", document.path);
        self.emit(SessionEvent::Closed {
            path: document.path,
        });
        Ok(())
    }

    fn release(&mut self) -> Option<Document> {
        self.watch.unwatch();
        self.external.clear();
        self.recovery = None;
        self.document.take()
    }

    // ---- External changes ----

    /// Reload the file behind a pending notification.
    pub async fn accept_external_change(&mut self) -> SessionResult<()> {
        if let Some(recovery) = self.recovery.as_ref().filter(|r| r.is_pending()) {
            return Err(SessionError::RecoveryPending(recovery.path().to_string()));
        }
        let path = self
            .external
            .pending()
            .map(|p| p.path.clone())
            .ok_or(SessionError::NoPendingChange)?;
        if self.current_path() != Some(path.as_str()) {
            self.external.clear();
            return Err(SessionError::NoPendingChange);
        }

        let content = match self.files.read_file(&path).await {
            Ok(content) => content,
            Err(e) => {
                self.report_reload_failure(&path, &e);
                return Err(e.into());
            }
        };
        self.apply_reload(content).await
    }

    /// Keep the buffer and drop the pending notification.
    pub fn dismiss_external_change(&mut self) -> SessionResult<()> {
        let pending = self.external.take().ok_or(SessionError::NoPendingChange)?;
        info!("Keeping local edits over external change to {}", pending.path);
        self.emit(SessionEvent::ExternalChangeDismissed { path: pending.path });
        Ok(())
    }

    async fn on_external_change(&mut self, event: ChangeEvent) -> SessionResult<()> {
        let settings = self.settings.settings().await;
        // Never replace the buffer under an open recovery prompt
        let mode = if self.is_recovery_pending() {
            ReloadMode::Confirm
        } else {
            settings.reload_mode
        };
        let dirty = self.is_dirty();
        let decision =
            self.external
                .decide(&event, self.watch.watched_path(), &self.guard, mode, dirty);

        match decision {
            ChangeDecision::Ignored => Ok(()),
            ChangeDecision::Echo => {
                self.emit(SessionEvent::EchoSuppressed { path: event.path });
                Ok(())
            }
            ChangeDecision::Reload | ChangeDecision::Prompt => {
                let content = match self.files.read_file(&event.path).await {
                    Ok(content) => content,
                    Err(e) => {
                        self.report_reload_failure(&event.path, &e);
                        return Err(e.into());
                    }
                };

                // Unsaved edits still need the prompt or reload
                let durable = !dirty
                    && self
                        .document
                        .as_ref()
                        .is_some_and(|d| d.autosave.last_durable() == content);
                if durable {
                    debug!("File {} matches last saved content, ignoring", event.path);
                    self.emit(SessionEvent::EchoSuppressed { path: event.path });
                    return Ok(());
                }

                if decision == ChangeDecision::Reload {
                    return self.apply_reload(content).await;
                }
                if self.external.record(&event.path) {
                    info!("{} changed on disk, waiting for confirmation", event.path);
                    self.emit(SessionEvent::ExternalChangePending { path: event.path });
                }
                Ok(())
            }
        }
    }

    async fn apply_reload(&mut self, content: String) -> SessionResult<()> {
        let document = self.document.as_mut().ok_or(SessionError::NoDocument)?;
        document.buffer = content.clone();
        document.autosave.reset_baseline(content);
        let path = document.path.clone();

        self.external.clear();
        self.drafts.remove(&path).await?;

        info!("Reloaded {} from disk", path);
        self.emit(SessionEvent::Reloaded { path });
        Ok(())
    }

    fn report_reload_failure(&self, path: &str, err: &std::io::Error) {
        warn!("Failed to read changed file {}: {}", path, err);
        self.emit(SessionEvent::ReloadFailed {
            path: path.to_string(),
            error: err.to_string(),
        });
    }

    // ---- Event loop ----

    /// Wait for the next timer firing or change notification.
    ///
    /// Cancel-safe, so it can sit in a `select!` next to other input sources.
    pub async fn next_wakeup(&mut self) -> Wakeup {
        let recovering = self.is_recovery_pending();
        let document = self.document.as_mut();
        let watch = &mut self.watch;

        let autosave = async move {
            match document {
                Some(document) if !recovering => document.autosave.next_due().await,
                _ => std::future::pending().await,
            }
        };

        tokio::select! {
            due = autosave => Wakeup::Autosave(due),
            event = watch.recv() => Wakeup::External(event),
        }
    }

    /// Apply a wakeup returned by [`Session::next_wakeup`].
    pub async fn handle_wakeup(&mut self, wakeup: Wakeup) -> SessionResult<()> {
        match wakeup {
            Wakeup::Autosave(Due::Draft) => self.write_draft().await,
            Wakeup::Autosave(Due::Write) => self.write_document().await,
            Wakeup::External(event) => self.on_external_change(event).await,
        }
    }

    /// Wait for and handle one wakeup.
    pub async fn step(&mut self) -> SessionResult<Wakeup> {
        let wakeup = self.next_wakeup().await;
        self.handle_wakeup(wakeup.clone()).await?;
        Ok(wakeup)
    }
}
