//! Policy keeper backend: a durable insurance record store with backups and a
//! periodic expiry-notification scheduler.

pub mod error;
pub mod service;
pub mod storage;

pub use error::StoreError;
pub use service::{CommandRouter, ExpiryScheduler, ServerConfig};
pub use storage::{BackupManager, LoadOutcome, RecordStore};
