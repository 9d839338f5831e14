use std::time::Duration;

/// Errors surfaced by the readers.
///
/// Malformed input is never reported here; see [`WireError`](crate::WireError).
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// Failed to establish the WebSocket connection.
    #[error("Connection error: {0}")]
    Connect(String),

    /// The connection attempt did not finish within the configured timeout.
    #[error("Connection to {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    /// The reader was stopped and cannot be restarted.
    #[error("Reader has been stopped")]
    Stopped,

    /// Reading a replay file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
