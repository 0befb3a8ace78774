//! Settings providers.
//!
//! The session asks its provider for a fresh [`Settings`] on every autosave
//! trigger, so edits to the settings file apply without a restart.

use async_trait::async_trait;
use draftkeeper_types::{Settings, SettingsProvider};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::warn;

/// Settings stored as JSON on disk. Missing keys use defaults.
#[derive(Debug, Clone)]
pub struct JsonSettings {
    path: PathBuf,
}

impl JsonSettings {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load settings, falling back to defaults when the file is missing or invalid.
    pub async fn load(&self) -> Settings {
        match fs::read_to_string(&self.path).await {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!("Ignoring invalid settings file {}: {}", self.path.display(), e);
                Settings::default()
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Settings::default(),
            Err(e) => {
                warn!("Failed to read settings {}: {}", self.path.display(), e);
                Settings::default()
            }
        }
    }

    /// Apply `change` to the current settings and persist the result.
    pub async fn update(&self, change: impl FnOnce(&mut Settings)) -> io::Result<Settings> {
        let mut settings = self.load().await;
        change(&mut settings);
        let content = serde_json::to_string_pretty(&settings)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        fs::write(&self.path, content).await?;
        Ok(settings)
    }

    /// Forget all stored settings.
    pub async fn reset(&self) -> io::Result<()> {
        match fs::remove_file(&self.path).await {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl SettingsProvider for JsonSettings {
    async fn settings(&self) -> Settings {
        self.load().await
    }
}

/// Fixed settings held in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticSettings(pub Settings);

#[async_trait]
impl SettingsProvider for StaticSettings {
    async fn settings(&self) -> Settings {
        self.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use draftkeeper_types::ViewMode;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let settings = JsonSettings::new(dir.path().join("settings.json"));
        assert_eq!(settings.load().await, Settings::default());
    }

    #[tokio::test]
    async fn test_invalid_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();
        assert_eq!(JsonSettings::new(path).load().await, Settings::default());
    }

    #[tokio::test]
    async fn test_update_persists_and_reset_clears() {
        let dir = TempDir::new().unwrap();
        let settings = JsonSettings::new(dir.path().join("conf").join("settings.json"));

        let updated = settings
            .update(|s| {
                s.auto_save_delay_ms = 250;
                s.view_mode = ViewMode::PreviewOnly;
            })
            .await
            .unwrap();
        assert_eq!(updated.auto_save_delay_ms, 250);
        assert_eq!(settings.settings().await, updated);

        settings.reset().await.unwrap();
        settings.reset().await.unwrap();
        assert_eq!(settings.settings().await, Settings::default());
    }
}
