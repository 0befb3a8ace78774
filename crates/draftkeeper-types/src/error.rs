//! Error types for the session engine.
//!
//! None of these are fatal. Each one degrades the synchronization guarantees
//! of a single document while the rest of the engine keeps running.

use std::io;
use thiserror::Error;

/// Draft persistence is unavailable or corrupt.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Backend database failure (open, transaction, table access)
    #[error("Database error: {0}")]
    Database(String),

    /// A stored record could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error underneath the backend
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl StoreError {
    /// Create a database error
    pub fn database(msg: impl ToString) -> Self {
        Self::Database(msg.to_string())
    }
}

/// Writing the buffer to the real file failed. The file on disk is unchanged.
#[derive(Error, Debug)]
pub enum WriteError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Untitled documents have no file to write to; use save-as
    #[error("Document has no file on disk: {0}")]
    Untitled(String),
}

/// An external-change subscription could not be established.
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Error reported by the platform watcher
    #[error("Watcher error: {0}")]
    Notify(String),

    /// The path has no parent directory to watch
    #[error("Cannot watch path without parent directory: {0}")]
    NoParent(String),
}

/// A rename was rejected. Drafts and the watch target are left as they were.
#[derive(Error, Debug)]
pub enum RenameError {
    /// The filesystem entry could not be renamed
    #[error("Rename failed: {0}")]
    Entry(#[source] io::Error),

    /// The entry was renamed but the draft could not follow; the entry rename was rolled back
    #[error("Draft migration failed: {0}")]
    Draft(#[source] StoreError),

    #[error("Untitled documents cannot be renamed on disk: {0}")]
    Untitled(String),
}

/// Unified error for callers of the session API.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Write(#[from] WriteError),

    #[error(transparent)]
    Watch(#[from] WatchError),

    #[error(transparent)]
    Rename(#[from] RenameError),

    /// Reading the file from disk failed
    #[error("Read error: {0}")]
    Read(#[from] io::Error),

    #[error("No document is open")]
    NoDocument,

    /// The open document is still waiting for a draft/file choice
    #[error("Recovery choice pending for {0}")]
    RecoveryPending(String),

    #[error("No recovery choice is pending")]
    NoRecoveryPending,

    #[error("No external change is pending")]
    NoPendingChange,

    #[error("Document is not untitled: {0}")]
    NotUntitled(String),
}

/// Result type alias for session operations
pub type SessionResult<T> = Result<T, SessionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StoreError::database("table missing");
        assert_eq!(err.to_string(), "Database error: table missing");

        let err = WriteError::Untitled("untitled://a.md".into());
        assert_eq!(
            err.to_string(),
            "Document has no file on disk: untitled://a.md"
        );
    }

    #[test]
    fn test_session_error_from_store() {
        let err: SessionError = StoreError::database("boom").into();
        assert!(matches!(err, SessionError::Store(_)));
        assert_eq!(err.to_string(), "Database error: boom");
    }

    #[test]
    fn test_session_error_from_io_is_read() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "gone");
        let err: SessionError = io_err.into();
        assert!(matches!(err, SessionError::Read(_)));
    }
}
