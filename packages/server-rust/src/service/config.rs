use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use super::scheduler::DEFAULT_SCAN_INTERVAL;

/// Server-level configuration.
///
/// Controls where data lives, how often the expiry scan runs, and logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Canonical data file. Backups are written next to it.
    pub data_file: PathBuf,
    /// Time between periodic expiry scans. Never zero.
    pub scan_interval: Duration,
    /// Whether the expiry scheduler starts with the process.
    pub start_scheduler: bool,
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub log_filter: String,
    /// Emit logs as JSON lines instead of human-readable text.
    pub log_json: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            data_file: PathBuf::from("data/insurances.json"),
            scan_interval: DEFAULT_SCAN_INTERVAL,
            start_scheduler: true,
            log_filter: "info".to_string(),
            log_json: false,
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("scan interval must be greater than zero")]
    ZeroScanInterval,
}

/// Command-line arguments, each with an environment fallback.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "policykeeper",
    version,
    about = "Insurance policy store with expiry notifications, driven by JSON lines on stdin"
)]
pub struct Cli {
    /// Path to the data file
    #[arg(long, env = "POLICYKEEPER_DATA_FILE", default_value = "data/insurances.json")]
    pub data_file: PathBuf,

    /// Seconds between expiry scans
    #[arg(long, env = "POLICYKEEPER_SCAN_INTERVAL_SECS", default_value_t = DEFAULT_SCAN_INTERVAL.as_secs())]
    pub scan_interval_secs: u64,

    /// Do not start the expiry scheduler at launch
    #[arg(long)]
    pub no_scheduler: bool,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, env = "POLICYKEEPER_LOG", default_value = "info")]
    pub log: String,

    /// Emit logs as JSON
    #[arg(long, env = "POLICYKEEPER_LOG_JSON")]
    pub log_json: bool,
}

impl TryFrom<Cli> for ServerConfig {
    type Error = ConfigError;

    fn try_from(cli: Cli) -> Result<Self, Self::Error> {
        if cli.scan_interval_secs == 0 {
            return Err(ConfigError::ZeroScanInterval);
        }
        Ok(Self {
            data_file: cli.data_file,
            scan_interval: Duration::from_secs(cli.scan_interval_secs),
            start_scheduler: !cli.no_scheduler,
            log_filter: cli.log,
            log_json: cli.log_json,
        })
    }
}
