//! The single owner of the in-memory record collection and its data file.
//!
//! Every mutation runs inside one critical section that covers both the
//! in-memory change and the persist step. A mutation whose persist fails is
//! undone before the lock is released, so memory always equals the last
//! durable state.

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use policykeeper_core::{ClockSource, NewRecord, Record, RecordPatch};
use tracing::{debug, error, info};

use super::file::StateFile;
use super::state::PersistedState;
use crate::error::StoreError;

/// How [`RecordStore::load`] found the data file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// No file existed; defaults were written.
    Created,
    /// The file decoded successfully.
    Loaded { records: usize },
    /// The file could not be used; the store runs on in-memory defaults and
    /// the file is left as found until the next successful mutation.
    Degraded { reason: String },
}

/// Record collection plus settings, backed by one JSON file.
pub struct RecordStore {
    file: StateFile,
    pub(crate) state: Mutex<PersistedState>,
    pub(crate) clock: Arc<dyn ClockSource>,
    outcome: LoadOutcome,
}

impl RecordStore {
    /// Opens the store at `path`.
    ///
    /// Never fails: a missing file is created with defaults, an unreadable
    /// one puts the store in degraded mode (see [`LoadOutcome`]).
    pub fn load(path: impl AsRef<Path>, clock: Arc<dyn ClockSource>) -> Self {
        let file = StateFile::new(path.as_ref());
        let (state, outcome) = match file.read() {
            Ok(Some(state)) => {
                let records = state.records.len();
                info!(path = %file.path().display(), records, "data file loaded");
                (state, LoadOutcome::Loaded { records })
            }
            Ok(None) => {
                let state = PersistedState::default();
                match file.write(&state) {
                    Ok(()) => {
                        info!(path = %file.path().display(), "data file created");
                        (state, LoadOutcome::Created)
                    }
                    Err(e) => {
                        error!(error = %e, "could not create data file, running on defaults");
                        (
                            state,
                            LoadOutcome::Degraded {
                                reason: e.to_string(),
                            },
                        )
                    }
                }
            }
            Err(e) => {
                error!(error = %e, "data file unusable, running on defaults");
                (
                    PersistedState::default(),
                    LoadOutcome::Degraded {
                        reason: e.to_string(),
                    },
                )
            }
        };

        Self {
            file,
            state: Mutex::new(state),
            clock,
            outcome,
        }
    }

    #[must_use]
    pub fn load_outcome(&self) -> &LoadOutcome {
        &self.outcome
    }

    /// Canonical data file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Appends a new record with a fresh id and current timestamps.
    ///
    /// # Errors
    ///
    /// [`StoreError::Persistence`] if the save fails; the append is undone.
    pub fn create(&self, fields: NewRecord) -> Result<Record, StoreError> {
        let mut state = self.state.lock();
        let id = fresh_id(&state.records);
        let record = Record::new(id, fields, self.clock.now());
        state.records.push(record.clone());

        if let Err(e) = self.file.write(&state) {
            state.records.pop();
            return Err(e);
        }
        debug!(id = %record.id, "record created");
        Ok(record)
    }

    /// All records in insertion order.
    #[must_use]
    pub fn get_all(&self) -> Vec<Record> {
        self.state.lock().records.clone()
    }

    /// # Errors
    ///
    /// [`StoreError::NotFound`] if no record has `id`.
    pub fn get_by_id(&self, id: &str) -> Result<Record, StoreError> {
        self.state
            .lock()
            .records
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| StoreError::record_not_found(id))
    }

    /// Merges `patch` over the record with `id` and persists.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if absent, [`StoreError::Persistence`] if the
    /// save fails (the previous record is put back).
    pub fn update(&self, id: &str, patch: RecordPatch) -> Result<Record, StoreError> {
        let mut state = self.state.lock();
        let index = position(&state.records, id)?;
        let previous = state.records[index].clone();
        state.records[index].apply(patch, self.clock.now());

        if let Err(e) = self.file.write(&state) {
            state.records[index] = previous;
            return Err(e);
        }
        debug!(id, "record updated");
        Ok(state.records[index].clone())
    }

    /// Removes the record with `id` and persists. Returns the removed record.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if absent, [`StoreError::Persistence`] if the
    /// save fails (the record is reinserted at its original position).
    pub fn delete(&self, id: &str) -> Result<Record, StoreError> {
        let mut state = self.state.lock();
        let index = position(&state.records, id)?;
        let removed = state.records.remove(index);

        if let Err(e) = self.file.write(&state) {
            state.records.insert(index, removed);
            return Err(e);
        }
        debug!(id, "record deleted");
        Ok(removed)
    }

    /// Records matching `query`, in collection order.
    #[must_use]
    pub fn search(&self, query: &str) -> Vec<Record> {
        self.state
            .lock()
            .records
            .iter()
            .filter(|r| r.matches(query))
            .cloned()
            .collect()
    }

    /// Records ending within `days` calendar days of today, soonest first.
    #[must_use]
    pub fn filter_by_end_date(&self, days: i64) -> Vec<Record> {
        let today = self.clock.today();
        let mut hits: Vec<Record> = self
            .state
            .lock()
            .records
            .iter()
            .filter(|r| r.ends_within(today, days))
            .cloned()
            .collect();
        // Stable: equal end dates keep collection order.
        hits.sort_by_key(|r| r.end_date);
        hits
    }

    /// Persists `next` and only then makes it the in-memory state.
    pub(crate) fn replace_state(&self, next: PersistedState) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        self.file.write(&next)?;
        *state = next;
        Ok(())
    }

    /// Runs `f` against the canonical path while no mutation can touch it.
    pub(crate) fn with_file_locked<R>(&self, f: impl FnOnce(&StateFile) -> R) -> R {
        let _guard = self.state.lock();
        f(&self.file)
    }

    pub(crate) fn persist_locked(&self, state: &PersistedState) -> Result<(), StoreError> {
        self.file.write(state)
    }
}

fn position(records: &[Record], id: &str) -> Result<usize, StoreError> {
    records
        .iter()
        .position(|r| r.id == id)
        .ok_or_else(|| StoreError::record_not_found(id))
}

fn fresh_id(records: &[Record]) -> String {
    loop {
        let id = uuid::Uuid::new_v4().to_string();
        if records.iter().all(|r| r.id != id) {
            return id;
        }
    }
}
