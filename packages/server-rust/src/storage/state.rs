//! The full persisted state and its decoding rules.

use std::collections::HashSet;
use std::path::Path;

use policykeeper_core::{Record, Settings};
use serde::Serialize;
use serde_json::Value;

use crate::error::StoreError;

/// Top-level key holding the record list.
pub const RECORDS_KEY: &str = "records";
/// Key used for the record list by older data files; accepted on read.
pub const LEGACY_RECORDS_KEY: &str = "insurances";
/// Top-level key holding the settings object.
pub const SETTINGS_KEY: &str = "settings";

/// Everything the data file holds: `{ "records": [...], "settings": {...} }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PersistedState {
    pub records: Vec<Record>,
    pub settings: Settings,
}

impl PersistedState {
    /// Decodes and validates data-file content read from `path`.
    ///
    /// Requires a JSON object with a list-valued `records` (or legacy
    /// `insurances`) field whose entries decode as records with distinct ids.
    /// A missing `settings` object falls back to defaults.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] describing the first problem found.
    pub fn decode(path: &Path, bytes: &[u8]) -> Result<Self, StoreError> {
        let mut root: Value = serde_json::from_slice(bytes)
            .map_err(|e| StoreError::validation(path, format!("not valid JSON: {e}")))?;
        let object = root
            .as_object_mut()
            .ok_or_else(|| StoreError::validation(path, "top level is not an object"))?;

        let records = object
            .remove(RECORDS_KEY)
            .or_else(|| object.remove(LEGACY_RECORDS_KEY))
            .ok_or_else(|| StoreError::validation(path, "missing `records` list"))?;
        if !records.is_array() {
            return Err(StoreError::validation(path, "`records` is not a list"));
        }
        let records: Vec<Record> = serde_json::from_value(records)
            .map_err(|e| StoreError::validation(path, format!("malformed record: {e}")))?;

        let mut seen = HashSet::with_capacity(records.len());
        if let Some(dup) = records.iter().find(|r| !seen.insert(r.id.as_str())) {
            return Err(StoreError::validation(
                path,
                format!("duplicate record id {}", dup.id),
            ));
        }

        let mut settings: Settings = match object.remove(SETTINGS_KEY) {
            Some(Value::Null) | None => Settings::default(),
            Some(value) => serde_json::from_value(value)
                .map_err(|e| StoreError::validation(path, format!("malformed settings: {e}")))?,
        };
        settings.normalize();

        Ok(Self { records, settings })
    }

    /// Pretty-printed JSON for the data file.
    ///
    /// # Errors
    ///
    /// Propagates serializer failures.
    pub fn encode(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path() -> &'static Path {
        Path::new("insurances.json")
    }

    fn record_json(id: &str) -> Value {
        serde_json::json!({
            "id": id,
            "name": "Zeynep",
            "surname": "Arslan",
            "phone": "555 01 02",
            "policyType": "Sağlık",
            "startDate": "2026-01-01",
            "endDate": "2026-12-31",
            "createdAt": "2026-01-01T09:00:00Z",
            "updatedAt": "2026-01-01T09:00:00Z"
        })
    }

    #[test]
    fn decodes_full_state() {
        let bytes = serde_json::to_vec(&serde_json::json!({
            "records": [record_json("a"), record_json("b")],
            "settings": { "notificationDays": [30, 7, 7], "autoBackup": false, "language": "en" }
        }))
        .unwrap();

        let state = PersistedState::decode(path(), &bytes).unwrap();

        assert_eq!(state.records.len(), 2);
        assert_eq!(state.records[1].id, "b");
        assert_eq!(state.settings.notification_days, vec![7, 30]);
        assert!(!state.settings.auto_backup);
    }

    #[test]
    fn accepts_legacy_records_key() {
        let bytes = serde_json::to_vec(&serde_json::json!({
            "insurances": [record_json("old")]
        }))
        .unwrap();

        let state = PersistedState::decode(path(), &bytes).unwrap();

        assert_eq!(state.records[0].id, "old");
        assert_eq!(state.settings, Settings::default());
    }

    #[test]
    fn rejects_missing_records() {
        let err = PersistedState::decode(path(), br#"{"settings":{}}"#).unwrap_err();
        assert!(matches!(err, StoreError::Validation { .. }));
        assert!(err.to_string().contains("missing `records`"));
    }

    #[test]
    fn rejects_non_list_records() {
        let err = PersistedState::decode(path(), br#"{"records":{"a":1}}"#).unwrap_err();
        assert!(err.to_string().contains("not a list"));
    }

    #[test]
    fn rejects_garbage() {
        let err = PersistedState::decode(path(), b"{ truncated").unwrap_err();
        assert!(matches!(err, StoreError::Validation { .. }));
    }

    #[test]
    fn rejects_duplicate_ids() {
        let bytes = serde_json::to_vec(&serde_json::json!({
            "records": [record_json("same"), record_json("same")]
        }))
        .unwrap();
        let err = PersistedState::decode(path(), &bytes).unwrap_err();
        assert!(err.to_string().contains("duplicate record id same"));
    }

    #[test]
    fn encode_writes_records_and_settings_keys() {
        let state = PersistedState::default();
        let json: Value = serde_json::from_slice(&state.encode().unwrap()).unwrap();
        assert!(json[RECORDS_KEY].is_array());
        assert!(json[SETTINGS_KEY].is_object());
    }
}
