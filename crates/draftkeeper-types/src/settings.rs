//! User-facing configuration consumed by the session engine.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default delay before buffer edits are written to the file.
pub const DEFAULT_AUTO_SAVE_DELAY_MS: u64 = 1000;

/// Default delay before buffer edits are written as a draft.
pub const DEFAULT_DRAFT_DELAY_MS: u64 = 500;

/// Default grace period after a self-write during which change events are echoes.
pub const DEFAULT_SETTLE_WINDOW_MS: u64 = 500;

/// Which panes the editor shows by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViewMode {
    SideBySide,
    #[default]
    EditorOnly,
    PreviewOnly,
}

/// How an external change to the open file is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReloadMode {
    /// Always replace the buffer with the file content
    Auto,
    /// Always ask first
    Confirm,
    /// Reload when the buffer has no unsaved edits, otherwise ask
    #[default]
    WhenClean,
}

/// Settings snapshot. Missing keys fall back to their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub auto_save: bool,
    pub auto_save_delay_ms: u64,
    pub draft_delay_ms: u64,
    pub settle_window_ms: u64,
    pub view_mode: ViewMode,
    pub reload_mode: ReloadMode,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            auto_save: true,
            auto_save_delay_ms: DEFAULT_AUTO_SAVE_DELAY_MS,
            draft_delay_ms: DEFAULT_DRAFT_DELAY_MS,
            settle_window_ms: DEFAULT_SETTLE_WINDOW_MS,
            view_mode: ViewMode::default(),
            reload_mode: ReloadMode::default(),
        }
    }
}

impl Settings {
    pub fn auto_save_delay(&self) -> Duration {
        Duration::from_millis(self.auto_save_delay_ms)
    }

    pub fn draft_delay(&self) -> Duration {
        Duration::from_millis(self.draft_delay_ms)
    }

    pub fn settle_window(&self) -> Duration {
        Duration::from_millis(self.settle_window_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_merges_over_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{"autoSave": false, "viewMode": "side-by-side"}"#).unwrap();
        assert!(!settings.auto_save);
        assert_eq!(settings.view_mode, ViewMode::SideBySide);
        assert_eq!(settings.auto_save_delay_ms, DEFAULT_AUTO_SAVE_DELAY_MS);
        assert_eq!(settings.reload_mode, ReloadMode::WhenClean);
    }

    #[test]
    fn test_reload_mode_names() {
        let mode: ReloadMode = serde_json::from_str(r#""when-clean""#).unwrap();
        assert_eq!(mode, ReloadMode::WhenClean);
        assert_eq!(
            serde_json::to_string(&ReloadMode::Confirm).unwrap(),
            r#""confirm""#
        );
    }
}
