//! Commands accepted at the process boundary.
//!
//! Each command is an internally tagged object: the `op` key selects the
//! operation (`"insurance:create"`, `"settings:get"`, ...) and the remaining
//! keys are its arguments, camelCase like the data file.

use serde::{Deserialize, Serialize};

use crate::record::{NewRecord, RecordPatch};
use crate::settings::SettingsPatch;

/// One operation requested by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op")]
pub enum Command {
    #[serde(rename = "insurance:create")]
    CreateRecord { record: NewRecord },

    #[serde(rename = "insurance:getAll")]
    GetAllRecords,

    #[serde(rename = "insurance:getById")]
    GetRecord { id: String },

    #[serde(rename = "insurance:update")]
    UpdateRecord { id: String, updates: RecordPatch },

    #[serde(rename = "insurance:delete")]
    DeleteRecord { id: String },

    #[serde(rename = "insurance:search")]
    Search { query: String },

    /// Records ending within `days` calendar days from today, soonest first.
    #[serde(rename = "insurance:filterByEndDate")]
    FilterByEndDate { days: i64 },

    #[serde(rename = "settings:get")]
    GetSettings,

    #[serde(rename = "settings:update")]
    UpdateSettings { settings: SettingsPatch },

    #[serde(rename = "data:backup")]
    Backup,

    #[serde(rename = "data:restore")]
    Restore { path: String },

    #[serde(rename = "data:listBackups")]
    ListBackups,

    #[serde(rename = "scheduler:start")]
    StartScheduler,

    #[serde(rename = "scheduler:stop")]
    StopScheduler,

    #[serde(rename = "scheduler:triggerScanNow")]
    TriggerScanNow,
}

impl Command {
    /// Wire name of the operation, for logging.
    #[must_use]
    pub fn op_name(&self) -> &'static str {
        match self {
            Self::CreateRecord { .. } => "insurance:create",
            Self::GetAllRecords => "insurance:getAll",
            Self::GetRecord { .. } => "insurance:getById",
            Self::UpdateRecord { .. } => "insurance:update",
            Self::DeleteRecord { .. } => "insurance:delete",
            Self::Search { .. } => "insurance:search",
            Self::FilterByEndDate { .. } => "insurance:filterByEndDate",
            Self::GetSettings => "settings:get",
            Self::UpdateSettings { .. } => "settings:update",
            Self::Backup => "data:backup",
            Self::Restore { .. } => "data:restore",
            Self::ListBackups => "data:listBackups",
            Self::StartScheduler => "scheduler:start",
            Self::StopScheduler => "scheduler:stop",
            Self::TriggerScanNow => "scheduler:triggerScanNow",
        }
    }

    /// Whether the command changes persisted state.
    #[must_use]
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Self::CreateRecord { .. }
                | Self::UpdateRecord { .. }
                | Self::DeleteRecord { .. }
                | Self::UpdateSettings { .. }
                | Self::Restore { .. }
        )
    }
}

/// A command plus an optional caller-chosen correlation id, echoed back in
/// the matching [`Reply`](super::Reply).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    /// Kept apart from command arguments such as `id`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<u64>,
    #[serde(flatten)]
    pub command: Command,
}
