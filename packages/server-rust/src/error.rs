//! Error taxonomy for store, settings, and backup operations.

use std::io;
use std::path::{Path, PathBuf};

/// Errors returned by [`RecordStore`](crate::storage::RecordStore) and
/// [`BackupManager`](crate::storage::BackupManager) operations.
///
/// Every variant leaves in-memory state equal to the last durable state.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A record id or file path does not exist.
    #[error("{what} not found: {key}")]
    NotFound { what: &'static str, key: String },

    /// Backup content does not have the expected shape.
    #[error("invalid data file {path}: {reason}")]
    Validation { path: PathBuf, reason: String },

    /// Serializing or writing the canonical data file failed.
    #[error("failed to persist {path}: {source}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Filesystem access outside the persist step failed (backup copy, reads).
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StoreError {
    pub(crate) fn record_not_found(id: &str) -> Self {
        Self::NotFound {
            what: "record",
            key: id.to_string(),
        }
    }

    pub(crate) fn file_not_found(path: &Path) -> Self {
        Self::NotFound {
            what: "file",
            key: path.display().to_string(),
        }
    }

    pub(crate) fn validation(path: &Path, reason: impl Into<String>) -> Self {
        Self::Validation {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    pub(crate) fn persistence(path: &Path, source: io::Error) -> Self {
        Self::Persistence {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Whether this is a [`StoreError::NotFound`].
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
