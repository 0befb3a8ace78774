//! Drafts surviving a process restart, on a real filesystem and redb database.

use draftkeeper::session::{Resolution, Session, Wakeup};
use draftkeeper::test_helpers::FakeWatcher;
use draftkeeper::{DraftStore, Settings, StaticSettings, TokioFiles};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn settings() -> Settings {
    Settings {
        auto_save: false,
        draft_delay_ms: 10,
        ..Settings::default()
    }
}

fn open_session(db: &Path) -> Session {
    Session::new(
        Arc::new(TokioFiles),
        Arc::new(FakeWatcher::new()),
        Arc::new(StaticSettings(settings())),
        DraftStore::open(db).unwrap(),
    )
}

#[tokio::test]
async fn draft_survives_restart_without_close() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("drafts.redb");
    let file = dir.path().join("note.md");
    let file = file.to_str().unwrap();
    std::fs::write(file, "original").unwrap();

    {
        let mut session = open_session(&db);
        assert_eq!(session.open_file(file).await.unwrap(), Resolution::UseFile);
        session.on_buffer_changed(file, "hello").await.unwrap();
        assert!(matches!(session.step().await.unwrap(), Wakeup::Autosave(_)));
        // Dropped without close, like a crash
    }

    let mut session = open_session(&db);
    assert_eq!(
        session.open_file(file).await.unwrap(),
        Resolution::AwaitingUserChoice
    );
    assert_eq!(session.choose_draft().await.unwrap(), "hello");

    session.save().await.unwrap();
    assert_eq!(std::fs::read_to_string(file).unwrap(), "hello");
    assert!(session.draft_store().list().await.unwrap().is_empty());
}

#[tokio::test]
async fn rename_on_disk_moves_draft() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("drafts.redb");
    let old = dir.path().join("old.md");
    let new = dir.path().join("new.md");
    let (old, new) = (old.to_str().unwrap(), new.to_str().unwrap());
    std::fs::write(old, "text").unwrap();

    let mut session = open_session(&db);
    session.open_file(old).await.unwrap();
    session.on_buffer_changed(old, "unsaved").await.unwrap();
    session.step().await.unwrap();

    session.rename(new).await.unwrap();
    assert!(!Path::new(old).exists());
    assert_eq!(std::fs::read_to_string(new).unwrap(), "text");

    let drafts = session.draft_store().list().await.unwrap();
    assert_eq!(drafts.len(), 1);
    assert_eq!(drafts[0].file_path, new);
    assert_eq!(drafts[0].content, "unsaved");
}
