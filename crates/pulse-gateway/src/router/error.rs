//! Router error types

use crate::connection::TransportError;
use crate::heartbeat::HeartbeatError;
use thiserror::Error;

/// Router error type
#[derive(Debug, Error)]
pub enum RouterError {
    /// An inbound frame was not a valid envelope
    #[error("Failed to decode frame: {0}")]
    Decode(#[source] serde_json::Error),

    /// An outbound envelope could not be serialized
    #[error("Failed to encode envelope: {0}")]
    Encode(#[source] serde_json::Error),

    #[error(transparent)]
    Heartbeat(#[from] HeartbeatError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl RouterError {
    /// Whether the session itself is unusable, as opposed to the connection
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Heartbeat(e) => e.is_fatal(),
            Self::Decode(_) | Self::Encode(_) | Self::Transport(_) => false,
        }
    }
}

/// Router result type
pub type RouterResult<T> = Result<T, RouterError>;
