//! WebSocket connection establishment and error classification.

use std::time::Duration;

use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::error::IngestError;

/// The raw WebSocket stream for a connected source.
pub type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Close code for an orderly shutdown.
pub const CLOSE_NORMAL: u16 = 1000;

/// Close code reported when the peer sent a Close frame without a status.
pub const CLOSE_NO_STATUS: u16 = 1005;

/// Close code reported when the connection dropped without a Close frame.
pub const CLOSE_ABNORMAL: u16 = 1006;

/// Connect to `url`, failing if the handshake takes longer than `timeout`.
pub async fn connect(url: &str, timeout: Duration) -> Result<WsStream, IngestError> {
    match tokio::time::timeout(timeout, connect_async(url)).await {
        Ok(Ok((ws_stream, _response))) => {
            tracing::info!(url, "Connected to stream source");
            Ok(ws_stream)
        }
        Ok(Err(e)) => Err(IngestError::Connect(format!(
            "Failed to connect to {url}: {e}"
        ))),
        Err(_) => Err(IngestError::Timeout {
            url: url.to_string(),
            timeout,
        }),
    }
}

/// Coarse diagnosis of a connection failure, derived from its message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The server is down or unreachable.
    Refused,
    /// The network is slow or the server is not answering.
    Timeout,
    /// The server dropped the connection, often a restart.
    Reset,
    Other,
}

impl ErrorClass {
    pub fn from_message(message: &str) -> Self {
        let message = message.to_ascii_lowercase();
        if message.contains("refused") {
            Self::Refused
        } else if message.contains("timed out") || message.contains("timeout") {
            Self::Timeout
        } else if message.contains("reset") {
            Self::Reset
        } else {
            Self::Other
        }
    }

    /// Operator-facing hint for the log line.
    pub fn hint(&self) -> &'static str {
        match self {
            Self::Refused => "server appears to be down or unreachable",
            Self::Timeout => "connection timed out, check network connectivity",
            Self::Reset => "connection was reset, possible server restart",
            Self::Other => "unclassified stream error",
        }
    }
}
