//! Shared types for the draftkeeper session engine.

pub mod draft;
pub mod error;
pub mod events;
pub mod path;
pub mod settings;
pub mod traits;

pub use draft::Draft;
pub use error::{RenameError, SessionError, SessionResult, StoreError, WatchError, WriteError};
pub use events::{ChangeEvent, SessionEvent};
pub use path::{is_untitled, untitled_name, untitled_path, UNTITLED_SCHEME};
pub use settings::{ReloadMode, Settings, ViewMode};
pub use traits::{DraftBackend, FileProvider, SettingsProvider, WatchHandle, WatchProvider};
