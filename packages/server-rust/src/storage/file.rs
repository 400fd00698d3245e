//! Crash-safe access to the canonical data file.
//!
//! Writes go to a temp file in the same directory, are fsynced, and are then
//! renamed over the canonical path, so a reader sees either the previous or
//! the new content in full.

use std::fs;
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};

use tracing::warn;

use super::state::PersistedState;
use crate::error::StoreError;

/// Handle to the canonical data file.
#[derive(Debug, Clone)]
pub struct StateFile {
    path: PathBuf,
}

impl StateFile {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads and decodes the file.
    ///
    /// Returns `Ok(None)` when the file does not exist.
    ///
    /// # Errors
    ///
    /// [`StoreError::Io`] if the file exists but cannot be read,
    /// [`StoreError::Validation`] if its content does not decode.
    pub fn read(&self) -> Result<Option<PersistedState>, StoreError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io(&self.path, e)),
        };
        PersistedState::decode(&self.path, &bytes).map(Some)
    }

    /// Serializes `state` and atomically replaces the file with it.
    ///
    /// Creates the parent directory if it is missing. Returns only after the
    /// new content has been fsynced and renamed into place.
    ///
    /// # Errors
    ///
    /// [`StoreError::Persistence`] on any serialization or filesystem failure.
    /// The canonical file is left untouched in that case.
    pub fn write(&self, state: &PersistedState) -> Result<(), StoreError> {
        let bytes = state
            .encode()
            .map_err(|e| StoreError::persistence(&self.path, e.into()))?;

        let temp_path = self.temp_path();
        let result = self.write_via(&temp_path, &bytes);
        if result.is_err() {
            // Best effort; the temp name is private to this process.
            let _ = fs::remove_file(&temp_path);
        }
        result.map_err(|e| StoreError::persistence(&self.path, e))?;

        // Content is already in place; a failed directory sync is not a failed save.
        if let Err(e) = self.sync_dir() {
            warn!(path = %self.path.display(), error = %e, "failed to sync data directory");
        }
        Ok(())
    }

    /// Flushes the directory entry so the rename itself is durable.
    #[cfg(unix)]
    fn sync_dir(&self) -> io::Result<()> {
        fs::File::open(self.dir().unwrap_or_else(|| Path::new(".")))?.sync_all()
    }

    #[cfg(not(unix))]
    #[allow(clippy::unused_self, clippy::unnecessary_wraps)]
    fn sync_dir(&self) -> io::Result<()> {
        Ok(())
    }

    fn write_via(&self, temp_path: &Path, bytes: &[u8]) -> io::Result<()> {
        if let Some(dir) = self.dir() {
            fs::create_dir_all(dir)?;
        }

        let mut file = fs::File::create(temp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        drop(file);

        fs::rename(temp_path, &self.path)
    }

    /// Parent directory, or `None` for a bare file name in the working directory.
    pub(crate) fn dir(&self) -> Option<&Path> {
        self.path.parent().filter(|p| !p.as_os_str().is_empty())
    }

    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map_or_else(|| "data".into(), |n| n.to_string_lossy().into_owned());
        let temp_name = format!(".{name}.tmp.{}", std::process::id());
        match self.dir() {
            Some(dir) => dir.join(temp_name),
            None => PathBuf::from(temp_name),
        }
    }
}
