//! The persisted unsaved snapshot of a document.

use serde::{Deserialize, Serialize};

/// Latest unsaved content for a document, keyed by its path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Draft {
    /// Raw path string the draft belongs to (the store key)
    pub file_path: String,
    /// Full buffer content at the time of the write
    pub content: String,
    /// Milliseconds since the Unix epoch, strictly increasing per store
    pub timestamp: i64,
}

impl Draft {
    pub fn new(file_path: impl Into<String>, content: impl Into<String>, timestamp: i64) -> Self {
        Self {
            file_path: file_path.into(),
            content: content.into(),
            timestamp,
        }
    }

    /// Same content and timestamp, stored under another key.
    pub fn rekeyed(&self, new_path: &str) -> Self {
        Self {
            file_path: new_path.to_string(),
            content: self.content.clone(),
            timestamp: self.timestamp,
        }
    }
}
