//! Persistent storage for policy records and settings.
//!
//! - [`StateFile`]: crash-safe read/replace of the canonical JSON file
//! - [`RecordStore`]: the in-memory collection, its CRUD/query operations and
//!   settings, each mutation persisted before it returns
//! - [`BackupManager`]: timestamped copies of the data file and restore

pub mod backup;
pub mod file;
pub mod record_store;
pub mod settings;
pub mod state;

pub use backup::BackupManager;
pub use file::StateFile;
pub use record_store::{LoadOutcome, RecordStore};
pub use state::PersistedState;
