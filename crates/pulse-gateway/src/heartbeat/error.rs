//! Heartbeat error types

use crate::connection::TransportError;
use thiserror::Error;

/// Heartbeat error type
#[derive(Debug, Error)]
pub enum HeartbeatError {
    /// The gateway broke the handshake contract (e.g. hello without an interval)
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    /// The socket failed to send a frame
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// An envelope could not be serialized
    #[error("Failed to encode envelope: {0}")]
    Encode(#[from] serde_json::Error),

    /// The previous heartbeat was never acknowledged
    #[error("Heartbeat not acknowledged within {interval_ms}ms")]
    Zombied { interval_ms: u64 },

    /// A heartbeat timer was started before any hello set the interval
    #[error("Heartbeat interval not initialized")]
    NotStarted,
}

impl HeartbeatError {
    /// Whether the session itself is unusable (as opposed to the connection)
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ProtocolViolation(_))
    }

    /// Whether reconnecting with a Resume is still worth trying
    #[must_use]
    pub fn allows_resume(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Zombied { .. })
    }
}

/// Heartbeat result type
pub type HeartbeatResult<T> = Result<T, HeartbeatError>;
