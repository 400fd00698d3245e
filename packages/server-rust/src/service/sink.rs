//! Destinations for expiry notifications.
//!
//! Defines [`NotificationSink`] and [`CompositeNotificationSink`], which fans
//! one event out to several sinks. A sink failure affects only that sink and
//! that event.

use std::sync::Arc;

use policykeeper_core::{ExpiryNotification, Urgency};
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Receiver of expiry notifications.
///
/// Used as `Arc<dyn NotificationSink>`. Implementations must not block for
/// long: they are called from the scan task.
pub trait NotificationSink: Send + Sync {
    /// Delivers one event.
    ///
    /// # Errors
    ///
    /// Returns an error if the event could not be delivered.
    fn notify(&self, event: &ExpiryNotification) -> anyhow::Result<()>;
}

/// Delivers each event to every registered sink.
#[derive(Default)]
pub struct CompositeNotificationSink {
    sinks: Vec<Arc<dyn NotificationSink>>,
}

impl CompositeNotificationSink {
    #[must_use]
    pub fn new(sinks: Vec<Arc<dyn NotificationSink>>) -> Self {
        Self { sinks }
    }

    pub fn add(&mut self, sink: Arc<dyn NotificationSink>) {
        self.sinks.push(sink);
    }
}

impl NotificationSink for CompositeNotificationSink {
    fn notify(&self, event: &ExpiryNotification) -> anyhow::Result<()> {
        let mut failed = 0usize;
        for sink in &self.sinks {
            if let Err(e) = sink.notify(event) {
                warn!(horizon_days = event.horizon_days, error = %e, "notification sink failed");
                failed += 1;
            }
        }
        if failed > 0 {
            anyhow::bail!("{failed} of {} sinks failed", self.sinks.len());
        }
        Ok(())
    }
}

/// Writes events to the log, critical ones at warn level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn notify(&self, event: &ExpiryNotification) -> anyhow::Result<()> {
        match event.urgency() {
            Urgency::Critical => warn!(
                horizon_days = event.horizon_days,
                count = event.count,
                title = %event.title(),
                "policies expiring"
            ),
            Urgency::Normal => info!(
                horizon_days = event.horizon_days,
                count = event.count,
                title = %event.title(),
                "policies expiring"
            ),
        }
        Ok(())
    }
}

/// Forwards events into a bounded channel without waiting.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<ExpiryNotification>,
}

impl ChannelSink {
    #[must_use]
    pub fn new(tx: mpsc::Sender<ExpiryNotification>) -> Self {
        Self { tx }
    }
}

impl NotificationSink for ChannelSink {
    fn notify(&self, event: &ExpiryNotification) -> anyhow::Result<()> {
        self.tx
            .try_send(event.clone())
            .map_err(|e| anyhow::anyhow!("notification channel: {e}"))
    }
}
