//! Point-in-time copies of the data file and restoring from them.
//!
//! Backups are siblings of the canonical file named
//! `<stem>_backup_<YYYY-MM-DDTHH-MM-SS>[-N].<ext>`, stamped in UTC.

use std::cmp::Reverse;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use time::macros::format_description;
use time::UtcOffset;
use tracing::{debug, info, warn};

use super::file::StateFile;
use super::record_store::RecordStore;
use super::state::PersistedState;
use crate::error::StoreError;

const STAMP_LEN: usize = "YYYY-MM-DDTHH-MM-SS".len();

/// Creates, lists and restores backups of a [`RecordStore`]'s data file.
#[derive(Clone)]
pub struct BackupManager {
    store: Arc<RecordStore>,
}

impl BackupManager {
    #[must_use]
    pub fn new(store: Arc<RecordStore>) -> Self {
        Self { store }
    }

    /// Copies the canonical file to a new timestamped sibling and returns its
    /// path. Never overwrites an existing backup.
    ///
    /// # Errors
    ///
    /// [`StoreError::Io`] if the canonical file is missing or the copy fails.
    pub fn backup(&self) -> Result<PathBuf, StoreError> {
        let stamp = self
            .store
            .clock
            .now()
            .to_offset(UtcOffset::UTC)
            .format(format_description!(
                "[year]-[month]-[day]T[hour]-[minute]-[second]"
            ))
            .map_err(|e| StoreError::io(self.store.path(), io::Error::other(e)))?;

        let target = self.store.with_file_locked(|file| {
            let names = BackupNames::of(file);
            let target = (0u32..)
                .map(|n| names.path_for(&stamp, n))
                .find(|p| !p.exists())
                .unwrap_or_else(|| names.path_for(&stamp, 0));
            fs::copy(file.path(), &target).map_err(|e| StoreError::io(file.path(), e))?;
            Ok::<_, StoreError>(target)
        })?;

        info!(backup = %target.display(), "backup written");
        Ok(target)
    }

    /// Writes a backup when the `autoBackup` setting is on. Run at shutdown.
    ///
    /// A failed backup is logged and reported as `None`; it never blocks exit.
    pub fn backup_if_enabled(&self) -> Option<PathBuf> {
        if !self.store.settings().auto_backup {
            debug!("auto backup disabled");
            return None;
        }
        match self.backup() {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(error = %e, "auto backup failed");
                None
            }
        }
    }

    /// Replaces the whole store state with the content of `path`.
    ///
    /// The restored state is persisted to the canonical file before it
    /// becomes visible. Returns the number of restored records.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if `path` does not exist, [`StoreError::Io`]
    /// if it cannot be read, [`StoreError::Validation`] if its content is
    /// malformed, [`StoreError::Persistence`] if the save fails. Current state
    /// is untouched on every error.
    pub fn restore(&self, path: impl AsRef<Path>) -> Result<usize, StoreError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                StoreError::file_not_found(path)
            } else {
                StoreError::io(path, e)
            }
        })?;
        let state = PersistedState::decode(path, &bytes)?;
        let records = state.records.len();

        self.store.replace_state(state)?;
        info!(source = %path.display(), records, "data restored from backup");
        Ok(records)
    }

    /// Existing backups of the canonical file, newest first.
    ///
    /// # Errors
    ///
    /// [`StoreError::Io`] if the data directory cannot be listed.
    pub fn list_backups(&self) -> Result<Vec<PathBuf>, StoreError> {
        let file = StateFile::new(self.store.path());
        let names = BackupNames::of(&file);
        let dir = file.dir().unwrap_or_else(|| Path::new("."));

        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(dir, e)),
        };

        let mut found: Vec<((String, u32), PathBuf)> = entries
            .filter_map(Result::ok)
            .filter_map(|entry| {
                let name = entry.file_name().into_string().ok()?;
                let key = names.sort_key(&name)?;
                Some((key, entry.path()))
            })
            .collect();
        found.sort_by_key(|(key, _)| Reverse(key.clone()));
        Ok(found.into_iter().map(|(_, path)| path).collect())
    }
}

/// Naming scheme for backups of one canonical file.
struct BackupNames {
    dir: Option<PathBuf>,
    prefix: String,
    suffix: String,
}

impl BackupNames {
    fn of(file: &StateFile) -> Self {
        let path = file.path();
        let stem = path
            .file_stem()
            .map_or_else(|| "data".to_string(), |s| s.to_string_lossy().into_owned());
        let suffix = path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        Self {
            dir: file.dir().map(Path::to_path_buf),
            prefix: format!("{stem}_backup_"),
            suffix,
        }
    }

    fn path_for(&self, stamp: &str, counter: u32) -> PathBuf {
        let name = if counter == 0 {
            format!("{}{stamp}{}", self.prefix, self.suffix)
        } else {
            format!("{}{stamp}-{counter}{}", self.prefix, self.suffix)
        };
        match &self.dir {
            Some(dir) => dir.join(name),
            None => PathBuf::from(name),
        }
    }

    /// `(stamp, counter)` for a backup file name, `None` for anything else.
    fn sort_key(&self, name: &str) -> Option<(String, u32)> {
        let middle = name
            .strip_prefix(&self.prefix)?
            .strip_suffix(&self.suffix)?;
        if middle.len() < STAMP_LEN || !middle.is_char_boundary(STAMP_LEN) {
            return None;
        }
        let (stamp, rest) = middle.split_at(STAMP_LEN);
        let counter = match rest {
            "" => 0,
            _ => rest.strip_prefix('-')?.parse().ok()?,
        };
        Some((stamp.to_string(), counter))
    }
}
