//! Liveness state of a single gateway connection

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

/// Mutable liveness state, owned by one `HeartbeatManager`
#[derive(Debug, Default)]
pub(crate) struct LivenessState {
    /// Heartbeat interval in seconds; 0 until the first hello
    pub interval_seconds: f64,

    /// Last dispatch sequence number reported by the router
    pub last_sequence: Option<u64>,

    /// Session id from READY, sent along with Resume
    pub session_id: Option<String>,

    /// Token sent along with Resume
    pub resume_token: Option<String>,

    /// A heartbeat was sent and no ACK has arrived since
    pub awaiting_ack: bool,

    pub last_sent_at: Option<Instant>,
    pub last_ack_at: Option<DateTime<Utc>>,
    pub latency: Option<Duration>,
}

impl LivenessState {
    pub fn interval(&self) -> Option<Duration> {
        if self.interval_seconds > 0.0 {
            Duration::try_from_secs_f64(self.interval_seconds).ok()
        } else {
            None
        }
    }
}

/// Point-in-time view of a connection's liveness, for health and diagnostics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LivenessSnapshot {
    pub connection_id: Uuid,
    /// Heartbeat interval in milliseconds; 0 until the first hello
    pub interval_ms: u64,
    pub last_sequence: Option<u64>,
    pub awaiting_ack: bool,
    pub latency_ms: Option<u64>,
    pub last_ack_at: Option<DateTime<Utc>>,
}

impl LivenessSnapshot {
    pub(crate) fn capture(connection_id: Uuid, state: &LivenessState) -> Self {
        Self {
            connection_id,
            interval_ms: (state.interval_seconds * 1000.0).round() as u64,
            last_sequence: state.last_sequence,
            awaiting_ack: state.awaiting_ack,
            latency_ms: state.latency.map(|d| d.as_millis() as u64),
            last_ack_at: state.last_ack_at,
        }
    }

    /// Check if the connection has received a hello yet
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.interval_ms > 0
    }
}
