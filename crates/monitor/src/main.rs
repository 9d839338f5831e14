//! `vitals-monitor` -- streaming patient vital-sign monitor.
//!
//! Ingests wire-format measurements from a WebSocket server (or a replay
//! file), stores them in memory and periodically evaluates clinical alert
//! rules for every patient with new data.
//!
//! # Environment variables
//!
//! | Variable                   | Required | Default  | Description                         |
//! |----------------------------|----------|----------|-------------------------------------|
//! | `STREAM_URL`               | yes*     | --       | WebSocket source, e.g. `ws://host:8080` |
//! | `INPUT_FILE`               | no       | --       | Replay this file instead (*replaces `STREAM_URL`) |
//! | `CONNECT_TIMEOUT_SECS`     | no       | `10`     | Connection timeout                  |
//! | `EVALUATION_INTERVAL_SECS` | no       | `5`      | Seconds between evaluation passes   |
//! | `EVALUATION_WINDOW_MINS`   | no       | `60`     | Trailing window per evaluation      |
//! | `LOG_FORMAT`               | no       | `pretty` | `pretty` or `json`                  |

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vitals_events::{BusListener, EventBus};
use vitals_ingest::{DataReader, FileReader, ReaderConfig, StreamReader};
use vitals_monitor::{EvaluationLoop, LogFormat, MonitorConfig, Source};
use vitals_store::DataStore;

/// How long to wait for the evaluation loop's final pass.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // Parsed before logging is installed so LOG_FORMAT can take effect.
    let config = MonitorConfig::from_env();
    let log_format = config
        .as_ref()
        .map(|c| c.log_format)
        .unwrap_or_default();
    init_tracing(log_format);

    let config = config.unwrap_or_else(|e| {
        tracing::error!(error = %e, "Invalid configuration");
        std::process::exit(1);
    });

    tracing::info!(
        source = ?config.source,
        evaluation_interval_secs = config.evaluation_interval.as_secs(),
        evaluation_window_secs = config.evaluation_window.as_secs(),
        "Starting vitals-monitor",
    );

    // --- Store and event buses ---
    let store = DataStore::shared();
    let record_bus = Arc::new(EventBus::default());
    let alert_bus = Arc::new(EventBus::default());
    store.add_listener(Arc::new(BusListener::new(Arc::clone(&record_bus))));

    // --- Evaluation loop ---
    let evaluation = EvaluationLoop::new(
        Arc::clone(&store),
        &record_bus,
        Arc::clone(&alert_bus),
        config.evaluation_interval,
        config.evaluation_window,
    );
    let evaluation_cancel = CancellationToken::new();
    let evaluation_handle = tokio::spawn(evaluation.run(evaluation_cancel.clone()));

    // --- Ingestion ---
    match &config.source {
        Source::Stream { url } => {
            let reader = StreamReader::new(ReaderConfig {
                connect_timeout: config.connect_timeout,
                ..ReaderConfig::new(url.clone())
            });
            start(&reader, Arc::clone(&store)).await;
            shutdown_signal().await;
            reader.stop_reading().await;
            tracing::info!(statistics = %reader.statistics(), "Stream reader final statistics");
        }
        Source::File { path } => {
            let reader = FileReader::new(path.clone());
            if !start(&reader, Arc::clone(&store)).await {
                std::process::exit(1);
            }
        }
    }

    // --- Shutdown ---
    evaluation_cancel.cancel();
    let _ = tokio::time::timeout(SHUTDOWN_TIMEOUT, evaluation_handle).await;

    tracing::info!(statistics = %store.statistics(), "Shutdown complete");
}

/// Start `reader`, logging a failure. Returns whether it started cleanly.
async fn start(reader: &dyn DataReader, store: Arc<DataStore>) -> bool {
    match reader.start_reading(store).await {
        Ok(()) => true,
        Err(e) => {
            tracing::error!(error = %e, "Failed to start reading");
            false
        }
    }
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "vitals_monitor=info,vitals_ingest=info,vitals_alerts=info,vitals_store=info".into()
    });

    let (pretty, json) = match format {
        LogFormat::Pretty => (Some(tracing_subscriber::fmt::layer()), None),
        LogFormat::Json => (None, Some(tracing_subscriber::fmt::layer().json())),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(pretty)
        .with(json)
        .init();
}

/// Wait for SIGINT or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received SIGINT (Ctrl-C), shutting down"),
        () = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
