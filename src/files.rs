//! File provider backed by `tokio::fs`.

use async_trait::async_trait;
use draftkeeper_types::{FileProvider, WriteError};
use std::io;
use tokio::fs;

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioFiles;

#[async_trait]
impl FileProvider for TokioFiles {
    async fn read_file(&self, path: &str) -> io::Result<String> {
        fs::read_to_string(path).await
    }

    async fn write_file(&self, path: &str, content: &str) -> Result<(), WriteError> {
        fs::write(path, content).await?;
        Ok(())
    }

    async fn rename_entry(&self, old_path: &str, new_path: &str) -> io::Result<()> {
        fs::rename(old_path, new_path).await
    }
}
