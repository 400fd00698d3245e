//! Settings operations, persisted through the record store's save path.

use policykeeper_core::{Settings, SettingsPatch};
use tracing::debug;

use super::record_store::RecordStore;
use crate::error::StoreError;

impl RecordStore {
    #[must_use]
    pub fn settings(&self) -> Settings {
        self.state.lock().settings.clone()
    }

    /// Shallow-merges `patch` into the current settings and persists.
    ///
    /// # Errors
    ///
    /// [`StoreError::Persistence`] if the save fails; the previous settings
    /// are put back.
    pub fn update_settings(&self, patch: SettingsPatch) -> Result<Settings, StoreError> {
        let mut state = self.state.lock();
        let previous = state.settings.clone();
        state.settings.apply(patch);

        if let Err(e) = self.persist_locked(&state) {
            state.settings = previous;
            return Err(e);
        }
        debug!(days = ?state.settings.notification_days, "settings updated");
        Ok(state.settings.clone())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::Arc;

    use policykeeper_core::SystemClock;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn update_merges_and_survives_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("insurances.json");
        let store = RecordStore::load(&path, Arc::new(SystemClock::utc()));

        let patch = SettingsPatch {
            notification_days: Some(vec![30, 1, 30]),
            ..SettingsPatch::default()
        };
        let updated = store.update_settings(patch).unwrap();

        assert_eq!(updated.notification_days, vec![1, 30]);
        assert!(updated.auto_backup);
        assert_eq!(updated.language, "tr");

        let reloaded = RecordStore::load(&path, Arc::new(SystemClock::utc()));
        assert_eq!(reloaded.settings(), updated);
    }

    #[test]
    fn failed_save_restores_previous_settings() {
        let dir = TempDir::new().unwrap();
        let data_dir = dir.path().join("data");
        let store = RecordStore::load(data_dir.join("insurances.json"), Arc::new(SystemClock::utc()));
        fs::remove_dir_all(&data_dir).unwrap();
        fs::write(&data_dir, b"blocker").unwrap();

        let patch = SettingsPatch {
            language: Some("en".to_string()),
            ..SettingsPatch::default()
        };
        assert!(store.update_settings(patch).is_err());
        assert_eq!(store.settings(), Settings::default());
    }
}
