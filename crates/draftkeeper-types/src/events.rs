//! Events flowing into and out of a session.

/// A watch provider noticed that a path changed on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub path: String,
}

impl ChangeEvent {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

/// Notifications published by a session for UI surfacing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A document was opened and its buffer populated
    Opened { path: String },
    /// A draft differs from the file; the caller must choose one
    RecoveryPending { path: String },
    /// The recovery prompt was answered
    Recovered { path: String, used_draft: bool },
    /// Buffer content was persisted as a draft
    DraftSaved { path: String },
    /// Buffer content reached the real file
    Saved { path: String },
    /// Writing the file failed; the content was kept as a draft
    SaveFailed { path: String, error: String },
    /// The buffer was replaced with the file content from disk
    Reloaded { path: String },
    /// Reading the changed file failed; the buffer is untouched
    ReloadFailed { path: String, error: String },
    /// The file changed externally and the caller should ask the user
    ExternalChangePending { path: String },
    /// The user kept the buffer over an external change
    ExternalChangeDismissed { path: String },
    /// A change notification was attributed to our own write
    EchoSuppressed { path: String },
    /// External-change detection is disabled for this document
    WatchFailed { path: String, error: String },
    /// Draft persistence failed; drafts are kept in memory from now on
    StoreDegraded { error: String },
    /// The document moved to a new path
    Renamed { from: String, to: String },
    /// The document was closed
    Closed { path: String },
}

impl SessionEvent {
    /// The document path this event refers to, if any.
    pub fn path(&self) -> Option<&str> {
        match self {
            SessionEvent::Opened { path }
            | SessionEvent::RecoveryPending { path }
            | SessionEvent::Recovered { path, .. }
            | SessionEvent::DraftSaved { path }
            | SessionEvent::Saved { path }
            | SessionEvent::SaveFailed { path, .. }
            | SessionEvent::Reloaded { path }
            | SessionEvent::ReloadFailed { path, .. }
            | SessionEvent::ExternalChangePending { path }
            | SessionEvent::ExternalChangeDismissed { path }
            | SessionEvent::EchoSuppressed { path }
            | SessionEvent::WatchFailed { path, .. }
            | SessionEvent::Closed { path } => Some(path),
            SessionEvent::Renamed { to, .. } => Some(to),
            SessionEvent::StoreDegraded { .. } => None,
        }
    }
}
