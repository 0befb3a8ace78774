//! Helpers for documents that have no file on disk yet.

/// Prefix marking a document that only exists as a draft.
pub const UNTITLED_SCHEME: &str = "untitled://";

/// True for keys created by [`untitled_path`].
pub fn is_untitled(path: &str) -> bool {
    path.starts_with(UNTITLED_SCHEME)
}

/// Build the draft key for a new untitled document, e.g. `untitled://todo.md`.
pub fn untitled_path(name: &str) -> String {
    format!("{}{}", UNTITLED_SCHEME, name)
}

/// The display name of an untitled document, or `None` for real paths.
pub fn untitled_name(path: &str) -> Option<&str> {
    path.strip_prefix(UNTITLED_SCHEME)
}
