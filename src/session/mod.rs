//! The synchronization engine for a single editing session.
//!
//! [`Session`] owns one open document and reconciles three copies of it: the
//! editor buffer, the file on disk, and the draft in the [`DraftStore`].
//!
//! [`DraftStore`]: crate::store::DraftStore

mod autosave;
mod drafts;
mod engine;
mod external;
mod guard;
mod recovery;
mod subscription;
mod timer;

pub use autosave::{AutosaveScheduler, AutosaveState, Due, EditOutcome, WriteOutcome};
pub use drafts::SessionDrafts;
pub use engine::{Session, Wakeup};
pub use external::{ChangeDecision, ExternalChangeCoordinator, PendingNotification};
pub use guard::SavingGuard;
pub use recovery::{RecoveryResolver, Resolution};
pub use subscription::WatchSubscription;
pub use timer::DebounceTimer;
