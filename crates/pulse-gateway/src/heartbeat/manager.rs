//! Heartbeat manager
//!
//! Owns the liveness state of one gateway connection and every operation
//! that mutates it.

use super::state::{LivenessSnapshot, LivenessState};
use super::timer::{self, HeartbeatTimer, TimerMode};
use super::{HeartbeatError, HeartbeatResult};
use crate::connection::OutboundSocket;
use crate::protocol::{Envelope, ResumePayload};
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// What a hello was answered with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HelloOutcome {
    /// No previous sequence; a first heartbeat was sent
    Fresh,
    /// A Resume for the given sequence was sent
    Resumed { seq: u64 },
}

/// How a heartbeat cycle ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The interval elapsed and a heartbeat was sent
    Sent,
    /// The wait was cancelled; nothing was sent
    Cancelled,
}

/// Liveness state and heartbeat operations for one gateway connection
///
/// Created when the connection is opened and kept across reconnects of the
/// same logical session, so the last sequence survives for a Resume.
pub struct HeartbeatManager {
    connection_id: Uuid,
    state: RwLock<LivenessState>,
    timer: Mutex<Option<CancellationToken>>,
}

impl HeartbeatManager {
    #[must_use]
    pub fn new() -> Self {
        Self {
            connection_id: Uuid::new_v4(),
            state: RwLock::new(LivenessState::default()),
            timer: Mutex::new(None),
        }
    }

    /// Id used to key this connection in logs and the session registry
    pub fn connection_id(&self) -> Uuid {
        self.connection_id
    }

    /// Heartbeat interval in seconds, or `0.0` before the first hello
    pub fn current_interval(&self) -> f64 {
        self.state.read().interval_seconds
    }

    /// Heartbeat interval, or `None` before the first hello
    pub fn interval(&self) -> Option<Duration> {
        self.state.read().interval()
    }

    pub fn last_sequence(&self) -> Option<u64> {
        self.state.read().last_sequence
    }

    /// Overwrite the last known sequence number
    ///
    /// No monotonicity check; the gateway's ordering is trusted.
    pub fn update_sequence(&self, seq: u64) {
        let previous = self.state.write().last_sequence.replace(seq);

        tracing::trace!(
            connection_id = %self.connection_id,
            seq,
            previous = ?previous,
            "Updated heartbeat sequence"
        );
    }

    pub fn session_id(&self) -> Option<String> {
        self.state.read().session_id.clone()
    }

    /// Remember the session id from READY for a later Resume
    pub fn set_session_id(&self, session_id: Option<String>) {
        self.state.write().session_id = session_id;
    }

    /// Token sent along with a Resume
    pub fn set_resume_token(&self, token: impl Into<String>) {
        self.state.write().resume_token = Some(token.into());
    }

    /// Forget the previous session so the next hello starts a fresh one
    pub fn invalidate_session(&self) {
        let mut state = self.state.write();
        state.last_sequence = None;
        state.session_id = None;
        drop(state);

        tracing::debug!(connection_id = %self.connection_id, "Session invalidated");
    }

    /// Check if a heartbeat is still waiting for its ACK
    pub fn is_awaiting_ack(&self) -> bool {
        self.state.read().awaiting_ack
    }

    /// Round trip of the last acknowledged heartbeat
    pub fn latency(&self) -> Option<Duration> {
        self.state.read().latency
    }

    pub fn snapshot(&self) -> LivenessSnapshot {
        LivenessSnapshot::capture(self.connection_id, &self.state.read())
    }

    /// Handle the gateway's hello
    ///
    /// Stores the announced interval, then sends exactly one frame: a Resume
    /// if a sequence survived from a previous connection, otherwise a first
    /// heartbeat. A hello without a usable `heartbeat_interval` fails with
    /// [`HeartbeatError::ProtocolViolation`] and leaves the state untouched.
    pub async fn observe_hello(
        &self,
        socket: &dyn OutboundSocket,
        envelope: &Envelope,
    ) -> HeartbeatResult<HelloOutcome> {
        tracing::debug!(connection_id = %self.connection_id, "Handling gateway hello");

        // Anything that is not a positive interval representable as a Duration
        let interval_seconds = envelope
            .heartbeat_interval_ms()
            .map(|ms| ms / 1000.0)
            .filter(|secs| *secs > 0.0 && Duration::try_from_secs_f64(*secs).is_ok())
            .ok_or_else(|| {
                tracing::error!(
                    connection_id = %self.connection_id,
                    envelope = %envelope,
                    "Hello has no usable `heartbeat_interval`; has the gateway changed its handshake?"
                );
                HeartbeatError::ProtocolViolation(format!(
                    "hello has no usable `heartbeat_interval` (payload: {})",
                    envelope.d.as_ref().map_or_else(|| "null".to_string(), ToString::to_string)
                ))
            })?;

        let resume = {
            let mut state = self.state.write();
            state.interval_seconds = interval_seconds;
            // A new connection has no heartbeat in flight
            state.awaiting_ack = false;
            state.last_sequence.map(|seq| {
                let payload = ResumePayload::new(seq).with_session_id(state.session_id.clone());
                match &state.resume_token {
                    Some(token) => payload.with_token(token.clone()),
                    None => payload,
                }
            })
        };

        tracing::debug!(
            connection_id = %self.connection_id,
            interval_ms = interval_seconds * 1000.0,
            "Maintaining connection with heartbeat interval"
        );

        match resume {
            Some(payload) => {
                let seq = payload.seq;
                tracing::debug!(connection_id = %self.connection_id, seq, "Resuming session");

                socket.send(Envelope::resume(&payload).to_json()?).await?;
                Ok(HelloOutcome::Resumed { seq })
            }
            None => {
                self.send_heartbeat(socket).await?;
                Ok(HelloOutcome::Fresh)
            }
        }
    }

    /// Send one heartbeat carrying the last known sequence
    ///
    /// The sequence is read when the frame is built, not when it was scheduled.
    pub async fn send_heartbeat(&self, socket: &dyn OutboundSocket) -> HeartbeatResult<()> {
        let seq = {
            let mut state = self.state.write();
            state.awaiting_ack = true;
            state.last_sent_at = Some(Instant::now());
            state.last_sequence
        };

        tracing::debug!(connection_id = %self.connection_id, seq = ?seq, "Sending heartbeat");

        socket.send(Envelope::heartbeat(seq).to_json()?).await?;
        Ok(())
    }

    /// Rest for one interval, then send a heartbeat
    ///
    /// The wait is anchored to the call, not to a wall-clock schedule, so send
    /// latency accumulates across cycles. Cancelling `cancel` during the wait
    /// returns [`CycleOutcome::Cancelled`] without sending. Before any hello
    /// this fails with [`HeartbeatError::NotStarted`].
    pub async fn run_heartbeat_cycle(
        &self,
        socket: &dyn OutboundSocket,
        cancel: &CancellationToken,
    ) -> HeartbeatResult<CycleOutcome> {
        let rest = self.interval().ok_or(HeartbeatError::NotStarted)?;

        tracing::debug!(
            connection_id = %self.connection_id,
            rest_ms = rest.as_millis() as u64,
            "Resting heart"
        );

        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                tracing::debug!(connection_id = %self.connection_id, "Heartbeat cycle cancelled");
                return Ok(CycleOutcome::Cancelled);
            }
            () = tokio::time::sleep(rest) => {}
        }

        self.send_heartbeat(socket).await?;
        Ok(CycleOutcome::Sent)
    }

    /// Record the gateway's ACK of the last heartbeat
    pub fn record_ack(&self) {
        let mut state = self.state.write();
        state.awaiting_ack = false;
        state.last_ack_at = Some(Utc::now());
        if let Some(sent_at) = state.last_sent_at {
            state.latency = Some(sent_at.elapsed());
        }
        let latency = state.latency;
        drop(state);

        tracing::trace!(
            connection_id = %self.connection_id,
            latency_ms = latency.map(|d| d.as_millis() as u64),
            "Heartbeat acknowledged"
        );
    }

    /// Spawn a task that heartbeats on the current interval until cancelled
    ///
    /// Any timer previously started by this manager is cancelled first.
    pub fn start_timer(
        self: &Arc<Self>,
        socket: Arc<dyn OutboundSocket>,
        mode: TimerMode,
    ) -> HeartbeatTimer {
        let cancel = CancellationToken::new();
        if let Some(previous) = self.timer.lock().replace(cancel.clone()) {
            previous.cancel();
        }

        tracing::debug!(connection_id = %self.connection_id, mode = ?mode, "Starting heartbeat timer");

        let handle = tokio::spawn(timer::run(self.clone(), socket, mode, cancel.clone()));
        HeartbeatTimer::new(cancel, handle)
    }

    /// Cancel the running heartbeat timer, if any
    pub fn stop_timer(&self) {
        if let Some(cancel) = self.timer.lock().take() {
            cancel.cancel();
            tracing::debug!(connection_id = %self.connection_id, "Heartbeat timer stopped");
        }
    }
}

impl Default for HeartbeatManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for HeartbeatManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("HeartbeatManager")
            .field("connection_id", &self.connection_id)
            .field("interval_seconds", &state.interval_seconds)
            .field("last_sequence", &state.last_sequence)
            .finish()
    }
}
