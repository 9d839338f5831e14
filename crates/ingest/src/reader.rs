//! Persistent WebSocket reader with bounded reconnection.
//!
//! [`StreamReader`] connects to a measurement source, parses every text
//! frame with [`parse_line`](crate::wire::parse_line) and forwards valid
//! measurements into the [`DataStore`]. When the connection closes it
//! schedules a single delayed reconnection using the configured
//! [`BackoffPolicy`]; after the last allowed attempt it gives up.
//!
//! All background work (the session task and the reconnection timer) is
//! tied to one [`CancellationToken`], so [`StreamReader::stop_reading`]
//! can shut everything down promptly.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;

use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use vitals_core::types::now_ms;
use vitals_store::DataStore;

use crate::client::{self, ErrorClass, WsStream, CLOSE_ABNORMAL, CLOSE_NORMAL, CLOSE_NO_STATUS};
use crate::error::IngestError;
use crate::reconnect::BackoffPolicy;
use crate::state::ConnectionState;
use crate::wire::{self, WireError};

/// Tunable parameters for a [`StreamReader`].
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    /// WebSocket URL of the measurement source, e.g. `ws://host:8080`.
    pub url: String,
    /// Upper bound on a single connection attempt.
    pub connect_timeout: Duration,
    pub backoff: BackoffPolicy,
    /// How long `stop_reading` waits for background tasks before aborting them.
    pub shutdown_timeout: Duration,
    /// Log a progress line every this many processed messages.
    pub progress_every: u64,
}

impl ReaderConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            connect_timeout: Duration::from_secs(10),
            backoff: BackoffPolicy::default(),
            shutdown_timeout: Duration::from_secs(5),
            progress_every: 100,
        }
    }
}

/// Snapshot of a reader's counters.
#[derive(Debug, Clone, PartialEq)]
pub struct ReaderStatistics {
    pub received: u64,
    pub processed: u64,
    pub malformed: u64,
    pub reconnect_attempts: u32,
    pub state: ConnectionState,
}

impl ReaderStatistics {
    /// Processed messages as a percentage of received ones.
    pub fn success_rate(&self) -> f64 {
        if self.received == 0 {
            0.0
        } else {
            self.processed as f64 / self.received as f64 * 100.0
        }
    }
}

impl fmt::Display for ReaderStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Messages - Received: {}, Processed: {}, Corrupted: {}, Success Rate: {:.2}%",
            self.received,
            self.processed,
            self.malformed,
            self.success_rate(),
        )
    }
}

/// WebSocket measurement reader.
///
/// Cheap to clone; clones share the same connection and counters.
#[derive(Clone)]
pub struct StreamReader {
    shared: Arc<Shared>,
}

struct Shared {
    config: ReaderConfig,
    store: RwLock<Option<Arc<DataStore>>>,
    state: Mutex<ConnectionState>,
    should_reconnect: AtomicBool,
    stopped: AtomicBool,
    attempts: AtomicU32,
    received: AtomicU64,
    processed: AtomicU64,
    malformed: AtomicU64,
    /// Master token; cancelled once by `stop_reading`.
    cancel: CancellationToken,
    /// The single pending reconnection timer, if any.
    pending_reconnect: Mutex<Option<JoinHandle<()>>>,
    /// The task reading frames from the live connection.
    session: Mutex<Option<JoinHandle<()>>>,
}

impl StreamReader {
    pub fn new(config: ReaderConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                store: RwLock::new(None),
                state: Mutex::new(ConnectionState::Disconnected),
                should_reconnect: AtomicBool::new(true),
                stopped: AtomicBool::new(false),
                attempts: AtomicU32::new(0),
                received: AtomicU64::new(0),
                processed: AtomicU64::new(0),
                malformed: AtomicU64::new(0),
                cancel: CancellationToken::new(),
                pending_reconnect: Mutex::new(None),
                session: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.shared.config
    }

    pub fn state(&self) -> ConnectionState {
        *lock(&self.shared.state)
    }

    /// Reconnection attempts since the last successful connection.
    pub fn reconnect_attempts(&self) -> u32 {
        self.shared.attempts.load(Ordering::SeqCst)
    }

    pub fn statistics(&self) -> ReaderStatistics {
        ReaderStatistics {
            received: self.shared.received.load(Ordering::SeqCst),
            processed: self.shared.processed.load(Ordering::SeqCst),
            malformed: self.shared.malformed.load(Ordering::SeqCst),
            reconnect_attempts: self.reconnect_attempts(),
            state: self.state(),
        }
    }

    /// Start forwarding measurements into `store`.
    ///
    /// Blocks for at most the configured connect timeout. A failed attempt
    /// is logged, schedules a reconnection and is returned to the caller;
    /// later failures are only visible through [`state`](Self::state) and
    /// [`statistics`](Self::statistics).
    pub async fn start_reading(&self, store: Arc<DataStore>) -> Result<(), IngestError> {
        if self.shared.stopped.load(Ordering::SeqCst) {
            return Err(IngestError::Stopped);
        }

        *self
            .shared
            .store
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(store);
        self.shared.should_reconnect.store(true, Ordering::SeqCst);

        self.connect().await
    }

    /// Handle one raw text frame.
    ///
    /// Returns `true` if the message was valid and handed to the store.
    /// Malformed messages are counted and logged, never propagated.
    pub fn on_message(&self, raw: &str) -> bool {
        self.shared.received.fetch_add(1, Ordering::SeqCst);

        let measurement = match wire::parse_line(raw) {
            Ok(m) => m,
            Err(e) => {
                self.record_malformed(&e, raw);
                return false;
            }
        };
        wire::warn_if_suspicious(&measurement, now_ms());

        let store = self
            .shared
            .store
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let Some(store) = store else {
            tracing::warn!(raw, "Message received before start_reading, dropping");
            return false;
        };

        store.add_record(
            measurement.patient_id,
            measurement.value,
            &measurement.metric,
            measurement.timestamp,
        );

        let processed = self.shared.processed.fetch_add(1, Ordering::SeqCst) + 1;
        let every = self.shared.config.progress_every;
        if every > 0 && processed % every == 0 {
            tracing::info!(statistics = %self.statistics(), "Processed {processed} messages");
        }
        true
    }

    /// Handle a closed connection.
    ///
    /// Schedules at most one reconnection while attempts remain and
    /// returns its delay. Once the policy is exhausted the reader moves to
    /// [`ConnectionState::GaveUp`] and returns `None`.
    pub fn on_close(&self, code: u16, reason: &str, remote: bool) -> Option<Duration> {
        tracing::info!(code, reason, remote, "Stream connection closed");

        let closed = if code == CLOSE_NORMAL {
            ConnectionState::ClosedNormal
        } else {
            ConnectionState::ClosedAbnormal
        };
        self.transition(closed);

        if !self.shared.should_reconnect.load(Ordering::SeqCst) {
            return None;
        }

        let policy = &self.shared.config.backoff;
        let reserved = self
            .shared
            .attempts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                policy.allows(n).then_some(n + 1)
            });

        match reserved {
            Ok(previous) => {
                let attempt = previous + 1;
                let delay = policy.delay_for_attempt(attempt);
                tracing::info!(
                    attempt,
                    max_attempts = policy.max_attempts,
                    delay_secs = delay.as_secs_f64(),
                    "Scheduling reconnection",
                );
                if self.schedule_reconnect(delay) {
                    self.transition(ConnectionState::Reconnecting);
                    Some(delay)
                } else {
                    // Nothing was armed; give the attempt back.
                    self.shared.attempts.fetch_sub(1, Ordering::SeqCst);
                    None
                }
            }
            Err(_) => {
                self.transition(ConnectionState::GaveUp);
                tracing::error!(
                    max_attempts = policy.max_attempts,
                    statistics = %self.statistics(),
                    "Maximum reconnection attempts reached, giving up",
                );
                None
            }
        }
    }

    /// Log a connection error with a coarse diagnosis.
    ///
    /// Classification is diagnostic only; recovery is driven by
    /// [`on_close`](Self::on_close).
    pub fn on_error(&self, error: &dyn std::error::Error) -> ErrorClass {
        let message = error.to_string();
        let class = ErrorClass::from_message(&message);
        tracing::error!(
            error = %message,
            class = ?class,
            hint = class.hint(),
            url = %self.shared.config.url,
            "Stream error",
        );
        class
    }

    /// Stop reading and release background tasks.
    ///
    /// Disables reconnection, closes the connection and cancels any pending
    /// reconnection, then waits up to the configured shutdown timeout for
    /// each task before aborting it. Calling it again is a no-op.
    pub async fn stop_reading(&self) {
        if self.shared.stopped.swap(true, Ordering::SeqCst) {
            return;
        }

        self.shared.should_reconnect.store(false, Ordering::SeqCst);
        self.transition(ConnectionState::Stopped);
        self.shared.cancel.cancel();

        let session = lock(&self.shared.session).take();
        let pending = lock(&self.shared.pending_reconnect).take();

        for handle in [session, pending].into_iter().flatten() {
            let abort = handle.abort_handle();
            if tokio::time::timeout(self.shared.config.shutdown_timeout, handle)
                .await
                .is_err()
            {
                tracing::warn!("Background task did not stop in time, aborting");
                abort.abort();
            }
        }

        tracing::info!(statistics = %self.statistics(), "Stream reader stopped");
    }

    // ---- private helpers ----

    /// One connection attempt. Failures run the error and close paths.
    async fn connect(&self) -> Result<(), IngestError> {
        self.transition(ConnectionState::Connecting);
        let url = self.shared.config.url.clone();
        tracing::info!(url = %url, "Connecting to stream source");

        let result = tokio::select! {
            _ = self.shared.cancel.cancelled() => Err(IngestError::Stopped),
            result = client::connect(&url, self.shared.config.connect_timeout) => result,
        };

        match result {
            Ok(ws_stream) => {
                self.on_open();
                self.spawn_session(ws_stream);
                Ok(())
            }
            Err(IngestError::Stopped) => Err(IngestError::Stopped),
            Err(e) => {
                self.on_error(&e);
                self.on_close(CLOSE_ABNORMAL, &e.to_string(), false);
                Err(e)
            }
        }
    }

    fn on_open(&self) {
        self.shared.attempts.store(0, Ordering::SeqCst);
        self.transition(ConnectionState::Connected);
        tracing::info!(url = %self.shared.config.url, "Stream connection open");
    }

    fn spawn_session(&self, ws_stream: WsStream) {
        let reader = self.clone();
        let cancel = self.shared.cancel.child_token();
        let handle = tokio::spawn(async move {
            reader.run_session(ws_stream, cancel).await;
        });
        *lock(&self.shared.session) = Some(handle);
    }

    /// Read frames until the connection closes or the reader is stopped.
    async fn run_session(&self, mut ws_stream: WsStream, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    if let Err(e) = ws_stream.close(None).await {
                        tracing::debug!(error = %e, "Close handshake failed");
                    }
                    self.on_close(CLOSE_NORMAL, "client stopped", false);
                    return;
                }
                frame = ws_stream.next() => match frame {
                    Some(Ok(Message::Text(text))) => {
                        self.on_message(&text);
                    }
                    Some(Ok(Message::Binary(_))) => {
                        tracing::trace!("Ignoring binary frame");
                    }
                    Some(Ok(Message::Ping(_) | Message::Pong(_))) => {
                        // Handled automatically by tungstenite.
                    }
                    Some(Ok(Message::Close(frame))) => {
                        let (code, reason) = frame
                            .map(|f| (u16::from(f.code), f.reason.to_string()))
                            .unwrap_or((CLOSE_NO_STATUS, String::new()));
                        self.on_close(code, &reason, true);
                        return;
                    }
                    Some(Ok(Message::Frame(_))) => {}
                    Some(Err(e)) => {
                        self.on_error(&e);
                        self.on_close(CLOSE_ABNORMAL, &e.to_string(), true);
                        return;
                    }
                    None => {
                        self.on_close(CLOSE_ABNORMAL, "stream ended", true);
                        return;
                    }
                },
            }
        }
    }

    /// Arm the reconnection timer, replacing any timer still pending.
    ///
    /// Returns `false` when called outside a Tokio runtime.
    fn schedule_reconnect(&self, delay: Duration) -> bool {
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                tracing::error!(error = %e, "No async runtime, reconnection not scheduled");
                return false;
            }
        };

        let reader = self.clone();
        let cancel = self.shared.cancel.clone();

        let mut slot = lock(&self.shared.pending_reconnect);
        if let Some(previous) = slot.take() {
            previous.abort();
        }
        *slot = Some(runtime.spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }

            // The timer has fired; it is no longer the pending one.
            lock(&reader.shared.pending_reconnect).take();

            if !reader.shared.should_reconnect.load(Ordering::SeqCst) {
                return;
            }
            tracing::info!("Attempting to reconnect to stream source");
            if let Err(e) = reader.connect().await {
                tracing::debug!(error = %e, "Reconnection attempt failed");
            }
        }));
        true
    }

    /// Move to `next` unless the reader was stopped.
    fn transition(&self, next: ConnectionState) {
        let mut state = lock(&self.shared.state);
        if *state == ConnectionState::Stopped {
            return;
        }
        let previous = *state;
        if previous != next {
            tracing::debug!(from = %previous, to = %next, "Connection state change");
            *state = next;
        }
    }

    fn record_malformed(&self, error: &WireError, raw: &str) {
        let total = self.shared.malformed.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::warn!(error = %error, raw, total, "Malformed message dropped");
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
