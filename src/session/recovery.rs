//! Draft-versus-file decision made once per file open.

use super::drafts::SessionDrafts;
use draftkeeper_types::{Draft, SessionError, StoreError};
use tracing::info;

/// How the open resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The buffer holds the file content
    UseFile,
    /// The buffer holds the draft content (untitled documents, or after `choose_draft`)
    UseDraft,
    /// A draft differs from the file; call `choose_draft` or `choose_file`
    AwaitingUserChoice,
}

#[derive(Debug)]
pub struct RecoveryResolver {
    path: String,
    file_content: String,
    draft: Option<Draft>,
    resolution: Resolution,
}

impl RecoveryResolver {
    /// Compare the stored draft for `path` with the freshly loaded file.
    ///
    /// A draft identical to the file is redundant and gets removed.
    pub async fn resolve(
        path: &str,
        file_content: String,
        drafts: &mut SessionDrafts,
    ) -> Result<Self, StoreError> {
        let draft = drafts.get(path).await?;
        let (draft, resolution) = match draft {
            None => (None, Resolution::UseFile),
            Some(draft) if draft.content == file_content => {
                drafts.remove(path).await?;
                (None, Resolution::UseFile)
            }
            Some(draft) => {
                info!("Found unsaved draft for {}", path);
                (Some(draft), Resolution::AwaitingUserChoice)
            }
        };

        Ok(Self {
            path: path.to_string(),
            file_content,
            draft,
            resolution,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn is_pending(&self) -> bool {
        self.resolution == Resolution::AwaitingUserChoice
    }

    pub fn draft(&self) -> Option<&Draft> {
        self.draft.as_ref()
    }

    pub fn file_content(&self) -> &str {
        &self.file_content
    }

    /// Keep the draft. Returns the content for the buffer.
    ///
    /// The draft stays in the store until the next successful save.
    pub fn choose_draft(&mut self) -> Result<String, SessionError> {
        if !self.is_pending() {
            return Err(SessionError::NoRecoveryPending);
        }
        let content = self
            .draft
            .as_ref()
            .map(|d| d.content.clone())
            .ok_or(SessionError::NoRecoveryPending)?;
        self.resolution = Resolution::UseDraft;
        info!("Recovered draft for {}", self.path);
        Ok(content)
    }

    /// Discard the draft. Returns the content for the buffer.
    pub async fn choose_file(&mut self, drafts: &mut SessionDrafts) -> Result<String, SessionError> {
        if !self.is_pending() {
            return Err(SessionError::NoRecoveryPending);
        }
        drafts.remove(&self.path).await?;
        self.draft = None;
        self.resolution = Resolution::UseFile;
        info!("Discarded draft for {}", self.path);
        Ok(self.file_content.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::DraftStore;
    use tokio::sync::broadcast;

    fn drafts() -> SessionDrafts {
        let (tx, _rx) = broadcast::channel(8);
        SessionDrafts::new(DraftStore::in_memory(), tx)
    }

    #[tokio::test]
    async fn test_no_draft_uses_file() {
        let mut drafts = drafts();
        let resolver = RecoveryResolver::resolve("a.md", "file".into(), &mut drafts)
            .await
            .unwrap();
        assert_eq!(resolver.resolution(), Resolution::UseFile);
    }

    #[tokio::test]
    async fn test_identical_draft_is_discarded_silently() {
        let mut drafts = drafts();
        drafts.save("a.md", "same").await.unwrap();

        let resolver = RecoveryResolver::resolve("a.md", "same".into(), &mut drafts)
            .await
            .unwrap();
        assert_eq!(resolver.resolution(), Resolution::UseFile);
        assert!(drafts.get("a.md").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_differing_draft_waits_for_choice() {
        let mut drafts = drafts();
        for (file, draft) in [("", "x"), ("a", "b"), ("long text", "long text!")] {
            drafts.save("a.md", draft).await.unwrap();
            let resolver = RecoveryResolver::resolve("a.md", file.into(), &mut drafts)
                .await
                .unwrap();
            assert!(resolver.is_pending(), "file {:?} vs draft {:?}", file, draft);
            assert_eq!(resolver.file_content(), file);
            assert_eq!(resolver.draft().map(|d| d.content.as_str()), Some(draft));
        }
    }

    #[tokio::test]
    async fn test_choose_draft_keeps_it_stored() {
        let mut drafts = drafts();
        drafts.save("a.md", "draft").await.unwrap();
        let mut resolver = RecoveryResolver::resolve("a.md", "file".into(), &mut drafts)
            .await
            .unwrap();

        assert_eq!(resolver.choose_draft().unwrap(), "draft");
        assert_eq!(resolver.resolution(), Resolution::UseDraft);
        assert!(drafts.get("a.md").await.unwrap().is_some());

        // Terminal: a second answer is rejected
        assert!(matches!(
            resolver.choose_file(&mut drafts).await,
            Err(SessionError::NoRecoveryPending)
        ));
    }

    #[tokio::test]
    async fn test_choose_file_removes_draft() {
        let mut drafts = drafts();
        drafts.save("a.md", "draft").await.unwrap();
        let mut resolver = RecoveryResolver::resolve("a.md", "file".into(), &mut drafts)
            .await
            .unwrap();

        assert_eq!(resolver.choose_file(&mut drafts).await.unwrap(), "file");
        assert!(drafts.get("a.md").await.unwrap().is_none());
        assert!(resolver.choose_draft().is_err());
    }
}
