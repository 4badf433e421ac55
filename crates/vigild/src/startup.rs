use std::path::Path;
use std::sync::Arc;

use adapters::dispatch::{BroadcastDispatcher, LogAlertDispatcher};
use adapters::storage::{MemoryRecordStore, RedbRecordStore};
use application::AlertHandler;
use domain::alert::AlertEvent;
use domain::record::CollectedEvent;
use domain::rule::{load, oldest_period};
use infrastructure::config::{DispatcherKind, ServiceConfig, StoreBackend};
use infrastructure::constants::{
    ALERT_BROADCAST_CAPACITY, EVENT_CHANNEL_CAPACITY, GRACEFUL_SHUTDOWN_TIMEOUT,
};
use infrastructure::logging::init_logging;
use ports::secondary::alert_dispatcher::AlertDispatcher;
use ports::secondary::record_store::RecordStore;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli::Cli;

/// Run the daemon startup sequence and block until shutdown.
pub async fn run(cli: &Cli) -> anyhow::Result<()> {
    // ── 1. Load config ──────────────────────────────────────────────
    let config = ServiceConfig::load(Path::new(&cli.config))?;

    // ── 2. Initialize logging ───────────────────────────────────────
    // CLI flags take precedence over config file
    let log_level = cli.log_level.unwrap_or(config.service.log_level);
    let log_format = cli.log_format.unwrap_or(config.service.log_format);
    init_logging(log_level, log_format)?;

    info!(
        config_path = %cli.config,
        log_level = log_level.as_str(),
        log_format = log_format.as_str(),
        "vigil alerting daemon starting"
    );

    // ── 3. Load rules ───────────────────────────────────────────────
    let rules = load(&config.rule_dictionary());
    let oldest = oldest_period(&rules)?;
    info!(
        rule_count = rules.len(),
        oldest_period_ms = oldest.unwrap_or(0),
        "alerting rules loaded"
    );

    // ── 4. Build the record store ───────────────────────────────────
    let store: Arc<dyn RecordStore> = match config.store.backend {
        StoreBackend::Memory => Arc::new(MemoryRecordStore::new()),
        StoreBackend::Redb => {
            let path = config
                .store
                .path
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("store.path is required for the redb backend"))?;
            info!(path = %path.display(), "opening redb record store");
            Arc::new(RedbRecordStore::open(path)?)
        }
    };

    // ── 5. Build the dispatcher and handler ─────────────────────────
    // The stream dispatcher drops its broadcast sender with the
    // handler, which is what ends the forwarder task.
    let (dispatcher, forwarder): (Arc<dyn AlertDispatcher>, Option<JoinHandle<()>>) =
        match config.service.dispatcher {
            DispatcherKind::Log => (Arc::new(LogAlertDispatcher), None),
            DispatcherKind::Stream => {
                let stream = BroadcastDispatcher::new(ALERT_BROADCAST_CAPACITY);
                let forwarder = tokio::spawn(forward_alerts(stream.subscribe()));
                (Arc::new(stream), Some(forwarder))
            }
        };
    let handler = AlertHandler::new(rules, store, dispatcher)
        .with_topic_prefix(config.service.topic_prefix.clone());

    // ── 6. Wire event intake and run until shutdown ─────────────────
    let shutdown = CancellationToken::new();
    spawn_signal_listener(shutdown.clone());
    let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let reader = tokio::spawn(read_events(tx, shutdown.clone()));

    handler.run(rx, shutdown).await;

    match tokio::time::timeout(GRACEFUL_SHUTDOWN_TIMEOUT, reader).await {
        Ok(joined) => joined?,
        Err(_) => warn!("stdin reader still blocked at shutdown, detaching"),
    }
    if let Some(forwarder) = forwarder
        && tokio::time::timeout(GRACEFUL_SHUTDOWN_TIMEOUT, forwarder)
            .await
            .is_err()
    {
        warn!("alert forwarder still blocked at shutdown, detaching");
    }

    info!("vigil alerting daemon stopped");
    Ok(())
}

/// Cancel `shutdown` when the process receives SIGINT or SIGTERM.
fn spawn_signal_listener(shutdown: CancellationToken) {
    tokio::spawn(async move {
        let signal_name = wait_for_signal().await;
        info!(signal = signal_name, "shutdown signal received");
        shutdown.cancel();
    });
}

#[cfg(unix)]
async fn wait_for_signal() -> &'static str {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => "SIGINT",
                _ = sigterm.recv() => "SIGTERM",
            }
        }
        Err(error) => {
            warn!(%error, "cannot install SIGTERM handler, listening for Ctrl+C only");
            let _ = tokio::signal::ctrl_c().await;
            "SIGINT"
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> &'static str {
    let _ = tokio::signal::ctrl_c().await;
    "SIGINT"
}

/// Read newline-delimited JSON events from stdin and feed the handler.
/// Exits on EOF or shutdown; malformed lines are logged and skipped.
async fn read_events(tx: mpsc::Sender<CollectedEvent>, cancel_token: CancellationToken) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            () = cancel_token.cancelled() => break,
            line = lines.next_line() => {
                match line {
                    Ok(Some(line)) => {
                        let line = line.trim();
                        if line.is_empty() {
                            continue;
                        }
                        match serde_json::from_str::<CollectedEvent>(line) {
                            Ok(event) => {
                                if tx.send(event).await.is_err() {
                                    break;
                                }
                            }
                            Err(error) => {
                                warn!(%error, "discarding malformed event line");
                            }
                        }
                    }
                    Ok(None) => break, // EOF
                    Err(error) => {
                        warn!(%error, "stdin read failed");
                        break;
                    }
                }
            }
        }
    }
}

/// Write alerts from the stream dispatcher to stdout as JSON lines.
/// Exits when the broadcast sender is dropped.
async fn forward_alerts(mut rx: broadcast::Receiver<AlertEvent>) {
    let mut stdout = tokio::io::stdout();

    loop {
        match rx.recv().await {
            Ok(alert) => match serde_json::to_string(&alert) {
                Ok(mut line) => {
                    line.push('\n');
                    if let Err(error) = stdout.write_all(line.as_bytes()).await {
                        warn!(%error, "stdout write failed, stopping alert stream");
                        break;
                    }
                }
                Err(error) => warn!(%error, "cannot serialize alert"),
            },
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                warn!(missed, "alert stream lagging, alerts dropped");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
