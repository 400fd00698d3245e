//! Command handling and background scanning.
//!
//! 1. **Routing** (`router`): decodes requests and dispatches them to the store
//! 2. **Scheduling** (`scheduler`): periodic and on-demand expiry scans
//! 3. **Sinks** (`sink`): where expiry notifications go
//! 4. **Background workers** (`worker`): the task loop the scheduler runs on
//! 5. **Configuration** (`config`): CLI/env settings for the binary

pub mod config;
pub mod router;
pub mod scheduler;
pub mod sink;
pub mod worker;

// Re-export key types for convenient access.
pub use config::{Cli, ConfigError, ServerConfig};
pub use router::{CommandRouter, DispatchError, SchedulerStatus};
pub use scheduler::{
    run_scan, ExpiryScanner, ExpiryScheduler, ScanReport, ScanTask, SchedulerState,
    DEFAULT_SCAN_INTERVAL,
};
pub use sink::{ChannelSink, CompositeNotificationSink, LogSink, NotificationSink};
pub use worker::{BackgroundRunnable, BackgroundWorker};
