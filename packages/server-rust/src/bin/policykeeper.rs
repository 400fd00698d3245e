//! Stdio front end for the policy keeper backend.
//!
//! Reads one JSON request per line on stdin and writes one JSON reply per
//! line on stdout. Expiry notifications are interleaved on stdout as
//! `{"event":"expiry",...}` lines. Logs go to stderr.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use clap::Parser;
use policykeeper_core::{ClockSource, ExpiryNotification, SystemClock, Urgency};
use policykeeper_server::service::{
    ChannelSink, Cli, CommandRouter, CompositeNotificationSink, ExpiryScheduler, LogSink,
    ServerConfig,
};
use policykeeper_server::{BackupManager, RecordStore};
use serde::Serialize;
use time::UtcOffset;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Wire shape of a notification line on stdout.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExpiryEventLine<'a> {
    event: &'static str,
    title: String,
    body: String,
    urgency: Urgency,
    #[serde(flatten)]
    notification: &'a ExpiryNotification,
}

impl<'a> ExpiryEventLine<'a> {
    fn new(notification: &'a ExpiryNotification) -> Self {
        Self {
            event: "expiry",
            title: notification.title(),
            body: notification.body(),
            urgency: notification.urgency(),
            notification,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let config = ServerConfig::try_from(Cli::parse())?;
    init_tracing(&config)?;

    // The local offset can only be read while the process is single-threaded.
    let offset = UtcOffset::current_local_offset().unwrap_or_else(|e| {
        warn!(error = %e, "local UTC offset unavailable, using UTC for calendar dates");
        UtcOffset::UTC
    });

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;
    let result = runtime.block_on(run(config, offset));
    // The stdin reader may still be parked in a blocking read.
    runtime.shutdown_timeout(Duration::from_millis(500));
    result
}

fn init_tracing(config: &ServerConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_filter))
        .context("invalid log filter")?;
    let registry = tracing_subscriber::registry().with(filter);

    if config.log_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init()?;
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()?;
    }
    Ok(())
}

async fn run(config: ServerConfig, offset: UtcOffset) -> anyhow::Result<()> {
    let system_clock = SystemClock::with_offset(offset);
    let utc_offset = system_clock.offset();
    let clock: Arc<dyn ClockSource> = Arc::new(system_clock);
    let store = Arc::new(RecordStore::load(&config.data_file, clock));
    info!(
        path = %store.path().display(),
        outcome = ?store.load_outcome(),
        %utc_offset,
        "record store ready"
    );

    let (line_tx, line_rx) = mpsc::channel::<String>(256);
    let writer = tokio::spawn(write_lines(line_rx));

    let (event_tx, event_rx) = mpsc::channel::<ExpiryNotification>(64);
    let forwarder = tokio::spawn(forward_events(event_rx, line_tx.clone()));

    let mut sinks = CompositeNotificationSink::default();
    sinks.add(Arc::new(LogSink));
    sinks.add(Arc::new(ChannelSink::new(event_tx)));
    let scheduler = Arc::new(ExpiryScheduler::new(
        Arc::clone(&store),
        Arc::new(sinks),
        config.scan_interval,
    ));
    let router = CommandRouter::new(Arc::clone(&store), Arc::clone(&scheduler));

    if config.start_scheduler {
        scheduler.start().await;
    }

    let served = serve_stdin(&router, &line_tx).await;

    scheduler.stop().await;
    let backups = BackupManager::new(Arc::clone(&store));
    match tokio::task::spawn_blocking(move || backups.backup_if_enabled()).await {
        Ok(Some(path)) => info!(backup = %path.display(), "auto backup written"),
        Ok(None) => {}
        Err(e) => warn!(error = %e, "auto backup task failed"),
    }
    // Dropping the last sink handles closes the event channel, then the writer.
    drop(router);
    drop(scheduler);
    drop(line_tx);
    let _ = forwarder.await;
    let _ = writer.await;

    info!("shut down");
    served
}

async fn serve_stdin(router: &CommandRouter, line_tx: &mpsc::Sender<String>) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(interrupt);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read stdin")? else {
                    info!("stdin closed");
                    return Ok(());
                };
                if line.trim().is_empty() {
                    continue;
                }
                let reply = router.dispatch_json(&line).await;
                let encoded = serde_json::to_string(&reply).context("failed to encode reply")?;
                line_tx
                    .send(encoded)
                    .await
                    .context("stdout writer stopped")?;
            }
            result = &mut interrupt => {
                result.context("failed to listen for ctrl-c")?;
                info!("interrupted");
                return Ok(());
            }
        }
    }
}

async fn forward_events(
    mut events: mpsc::Receiver<ExpiryNotification>,
    line_tx: mpsc::Sender<String>,
) {
    while let Some(event) = events.recv().await {
        let line = match serde_json::to_string(&ExpiryEventLine::new(&event)) {
            Ok(line) => line,
            Err(e) => {
                error!(error = %e, "failed to encode expiry event");
                continue;
            }
        };
        if line_tx.send(line).await.is_err() {
            break;
        }
    }
}

async fn write_lines(mut lines: mpsc::Receiver<String>) {
    let mut stdout = tokio::io::stdout();
    while let Some(line) = lines.recv().await {
        let written = async {
            stdout.write_all(line.as_bytes()).await?;
            stdout.write_all(b"\n").await?;
            stdout.flush().await
        }
        .await;
        if let Err(e) = written {
            error!(error = %e, "stdout closed, dropping output");
            break;
        }
    }
}
