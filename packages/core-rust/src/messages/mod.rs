//! Wire schema between the presentation layer and the backend process.
//!
//! Requests are JSON objects tagged by `op` (see [`Command`]); every request is
//! answered by exactly one [`Reply`]. Field names are camelCase to match the
//! persisted data file.

pub mod command;
pub mod reply;

pub use command::{Command, Request};
pub use reply::Reply;
