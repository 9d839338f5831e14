use std::fmt;

/// Lifecycle of a [`StreamReader`](crate::StreamReader) connection.
///
/// ```text
/// Disconnected -> Connecting -> Connected -> {ClosedNormal | ClosedAbnormal}
///     -> [Reconnecting -> Connecting]* -> {GaveUp | Stopped}
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    ClosedNormal,
    ClosedAbnormal,
    Reconnecting,
    /// Reconnection attempts exhausted.
    GaveUp,
    /// Stopped explicitly; no further transitions.
    Stopped,
}

impl ConnectionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::GaveUp | Self::Stopped)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::ClosedNormal => "closed_normal",
            Self::ClosedAbnormal => "closed_abnormal",
            Self::Reconnecting => "reconnecting",
            Self::GaveUp => "gave_up",
            Self::Stopped => "stopped",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
