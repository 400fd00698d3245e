//! User preferences stored alongside the records.

use serde::{Deserialize, Serialize};

/// Expiry horizons (in days) used when none are configured.
pub const DEFAULT_NOTIFICATION_DAYS: [u32; 2] = [7, 30];

/// Application settings persisted in the `settings` section of the data file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Expiry horizons in days. Kept sorted ascending without duplicates.
    #[serde(default = "default_notification_days")]
    pub notification_days: Vec<u32>,
    #[serde(default = "default_auto_backup")]
    pub auto_backup: bool,
    /// UI language tag. Not interpreted by the backend.
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_notification_days() -> Vec<u32> {
    DEFAULT_NOTIFICATION_DAYS.to_vec()
}

fn default_auto_backup() -> bool {
    true
}

fn default_language() -> String {
    "tr".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            notification_days: default_notification_days(),
            auto_backup: default_auto_backup(),
            language: default_language(),
        }
    }
}

impl Settings {
    /// Sorts `notification_days` ascending and drops duplicates.
    pub fn normalize(&mut self) {
        self.notification_days.sort_unstable();
        self.notification_days.dedup();
    }

    /// Horizons a scan should evaluate: the configured set, or the defaults
    /// when the set is empty.
    #[must_use]
    pub fn horizons(&self) -> Vec<u32> {
        if self.notification_days.is_empty() {
            default_notification_days()
        } else {
            self.notification_days.clone()
        }
    }

    /// Shallow merge: every key present in `patch` replaces the current value
    /// wholesale. The result is normalized.
    pub fn apply(&mut self, patch: SettingsPatch) {
        if let Some(days) = patch.notification_days {
            self.notification_days = days;
        }
        if let Some(auto_backup) = patch.auto_backup {
            self.auto_backup = auto_backup;
        }
        if let Some(language) = patch.language {
            self.language = language;
        }
        self.normalize();
    }
}

/// Partial settings update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification_days: Option<Vec<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_backup: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}
