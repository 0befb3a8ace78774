pub mod cli;
pub mod files;
pub mod session;
pub mod settings;
pub mod store;
pub mod test_helpers;

pub use draftkeeper_types::{
    ChangeEvent, Draft, ReloadMode, SessionError, SessionEvent, SessionResult, Settings, ViewMode,
};
pub use files::TokioFiles;
pub use session::{Resolution, Session, Wakeup};
pub use settings::{JsonSettings, StaticSettings};
pub use store::DraftStore;
