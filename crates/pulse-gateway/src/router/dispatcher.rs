//! Frame dispatcher
//!
//! Handles incoming gateway frames based on their operation code.

use super::{RouterError, RouterResult};
use crate::connection::OutboundSocket;
use crate::heartbeat::{HeartbeatError, HeartbeatManager, HelloOutcome, TimerExit, TimerMode};
use crate::protocol::{CloseCode, ConnectionProperties, Envelope, IdentifyPayload, Intents, OpCode};
use parking_lot::Mutex;
use pulse_common::{GatewayConfig, HeartbeatMode, IdentifySettings};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// What the connection owner should do after a frame was routed
#[derive(Debug, Clone, PartialEq)]
pub enum RouteOutcome {
    /// Hello was answered with an Identify, or with a Resume when `resumed`
    Handshake { resumed: bool },
    /// A dispatch event for the higher layer
    Event(Envelope),
    HeartbeatAcked,
    /// The gateway asked for a heartbeat and one was sent
    HeartbeatRequested,
    /// The connection should be dropped and reopened
    Reconnect { resume: bool },
    /// An op code with no liveness meaning
    Ignored(OpCode),
}

/// Routes the frames of one gateway connection into its heartbeat manager
///
/// The same manager can be handed to a new router after a reconnect so that
/// the stored sequence is used to resume.
pub struct GatewayRouter {
    manager: Arc<HeartbeatManager>,
    socket: Arc<dyn OutboundSocket>,
    identify: IdentifyPayload,
    mode: HeartbeatMode,
    shutdown: CancellationToken,
    cycle: Mutex<Option<CancellationToken>>,
    failures_tx: mpsc::Sender<HeartbeatError>,
    failures_rx: tokio::sync::Mutex<mpsc::Receiver<HeartbeatError>>,
}

impl GatewayRouter {
    pub fn new(
        manager: Arc<HeartbeatManager>,
        socket: Arc<dyn OutboundSocket>,
        settings: &IdentifySettings,
        mode: HeartbeatMode,
    ) -> Self {
        manager.set_resume_token(settings.token.clone());

        // Only the first background failure matters; it ends the connection
        let (failures_tx, failures_rx) = mpsc::channel(1);
        Self {
            manager,
            socket,
            identify: IdentifyPayload {
                token: settings.token.clone(),
                intents: Intents::from_bits_retain(settings.intents),
                properties: ConnectionProperties::new(settings.client_name.clone()),
            },
            mode,
            shutdown: CancellationToken::new(),
            cycle: Mutex::new(None),
            failures_tx,
            failures_rx: tokio::sync::Mutex::new(failures_rx),
        }
    }

    /// Create a router from loaded configuration
    pub fn from_config(
        manager: Arc<HeartbeatManager>,
        socket: Arc<dyn OutboundSocket>,
        config: &GatewayConfig,
    ) -> Self {
        Self::new(manager, socket, &config.identify, config.heartbeat_mode)
    }

    pub fn manager(&self) -> &Arc<HeartbeatManager> {
        &self.manager
    }

    /// Decode and route one inbound text frame
    pub async fn handle_frame(&self, frame: &str) -> RouterResult<RouteOutcome> {
        let envelope = Envelope::from_json(frame).map_err(|e| {
            tracing::warn!(
                connection_id = %self.manager.connection_id(),
                error = %e,
                "Failed to decode gateway frame"
            );
            RouterError::Decode(e)
        })?;

        self.handle_envelope(envelope).await
    }

    /// Route one decoded envelope
    pub async fn handle_envelope(&self, envelope: Envelope) -> RouterResult<RouteOutcome> {
        tracing::trace!(
            connection_id = %self.manager.connection_id(),
            op = %envelope.op,
            seq = ?envelope.s,
            "Routing gateway frame"
        );

        match envelope.op.normalized() {
            OpCode::Hello => self.handle_hello(&envelope).await,
            OpCode::Dispatch => {
                if let Some(seq) = envelope.s {
                    self.manager.update_sequence(seq);
                }
                if let Some(ready) = envelope.as_ready() {
                    tracing::debug!(
                        connection_id = %self.manager.connection_id(),
                        session_id = %ready.session_id,
                        "Session ready"
                    );
                    self.manager.set_session_id(Some(ready.session_id));
                }
                Ok(RouteOutcome::Event(envelope))
            }
            OpCode::HeartbeatAck => {
                self.manager.record_ack();
                if !self.mode.uses_timer() {
                    self.schedule_cycle();
                }
                Ok(RouteOutcome::HeartbeatAcked)
            }
            OpCode::Heartbeat => {
                self.manager.send_heartbeat(&*self.socket).await?;
                Ok(RouteOutcome::HeartbeatRequested)
            }
            OpCode::Reconnect => {
                tracing::info!(
                    connection_id = %self.manager.connection_id(),
                    "Gateway requested reconnect"
                );
                self.halt();
                Ok(RouteOutcome::Reconnect { resume: true })
            }
            OpCode::InvalidSession => {
                let resume = envelope.as_invalid_session().unwrap_or(false);
                tracing::info!(
                    connection_id = %self.manager.connection_id(),
                    resumable = resume,
                    "Gateway invalidated session"
                );
                if !resume {
                    self.manager.invalidate_session();
                }
                self.halt();
                Ok(RouteOutcome::Reconnect { resume })
            }
            op => {
                if !op.is_receive_op() {
                    tracing::warn!(
                        connection_id = %self.manager.connection_id(),
                        op = %op,
                        "Received op code the gateway does not send"
                    );
                }
                Ok(RouteOutcome::Ignored(op))
            }
        }
    }

    async fn handle_hello(&self, envelope: &Envelope) -> RouterResult<RouteOutcome> {
        // A stale timer must not race the new handshake
        self.halt();

        let outcome = self.manager.observe_hello(&*self.socket, envelope).await?;
        let resumed = matches!(outcome, HelloOutcome::Resumed { .. });

        if !resumed {
            tracing::debug!(connection_id = %self.manager.connection_id(), "Identifying");
            let frame = Envelope::identify(&self.identify)
                .to_json()
                .map_err(RouterError::Encode)?;
            self.socket.send(frame).await?;
        }

        match TimerMode::from_mode(self.mode) {
            Some(mode) => self.spawn_timer(mode),
            // No ACK follows a resume, so the first cycle is scheduled here
            None if resumed => self.schedule_cycle(),
            None => {}
        }

        Ok(RouteOutcome::Handshake { resumed })
    }

    fn spawn_timer(&self, mode: TimerMode) {
        let timer = self.manager.start_timer(self.socket.clone(), mode);
        let failures = self.failures_tx.clone();
        let shutdown = self.shutdown.clone();

        tokio::spawn(async move {
            tokio::select! {
                exit = timer.join() => {
                    if let TimerExit::Failed(e) = exit {
                        let _ = failures.try_send(e);
                    }
                }
                // Dropping the pending join cancels the timer
                () = shutdown.cancelled() => {}
            }
        });
    }

    /// Schedule one heartbeat an interval from now, replacing any pending one
    fn schedule_cycle(&self) {
        let cancel = self.shutdown.child_token();
        if let Some(previous) = self.cycle.lock().replace(cancel.clone()) {
            previous.cancel();
        }

        let manager = self.manager.clone();
        let socket = self.socket.clone();
        let failures = self.failures_tx.clone();

        tokio::spawn(async move {
            if let Err(e) = manager.run_heartbeat_cycle(&*socket, &cancel).await {
                tracing::warn!(
                    connection_id = %manager.connection_id(),
                    error = %e,
                    "Heartbeat cycle failed"
                );
                let _ = failures.try_send(e);
            }
        });
    }

    /// Wait for the next background heartbeat failure
    ///
    /// A zombied connection or a failed timer send surfaces here; the owner
    /// should drop the connection and reconnect. Only the first failure is
    /// kept until it is taken.
    pub async fn next_failure(&self) -> Option<HeartbeatError> {
        self.failures_rx.lock().await.recv().await
    }

    /// Handle the connection closing with an optional close code
    ///
    /// Returns whether a reconnect should be attempted. The session is
    /// invalidated when the code does not allow a resume. Unknown codes are
    /// treated as transport drops.
    pub fn on_close(&self, code: Option<u16>) -> bool {
        self.halt();

        let Some(close_code) = code.and_then(CloseCode::from_u16) else {
            tracing::info!(
                connection_id = %self.manager.connection_id(),
                code = ?code,
                "Gateway connection closed"
            );
            return true;
        };

        if !close_code.allows_resume() {
            self.manager.invalidate_session();
        }

        let reconnect = close_code.should_reconnect();
        if reconnect {
            tracing::info!(
                connection_id = %self.manager.connection_id(),
                code = %close_code,
                resume = close_code.allows_resume(),
                "Gateway connection closed"
            );
        } else {
            tracing::error!(
                connection_id = %self.manager.connection_id(),
                code = %close_code,
                "Gateway connection closed; not reconnecting"
            );
        }
        reconnect
    }

    /// Cancel every pending heartbeat; no further cycles run after this
    pub fn shutdown(&self) {
        self.shutdown.cancel();
        self.halt();
    }

    fn halt(&self) {
        self.manager.stop_timer();
        if let Some(cycle) = self.cycle.lock().take() {
            cycle.cancel();
        }
    }
}

impl Drop for GatewayRouter {
    fn drop(&mut self) {
        // Only this router's own tasks; the manager may already serve a newer one
        self.shutdown.cancel();
    }
}

impl std::fmt::Debug for GatewayRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayRouter")
            .field("connection_id", &self.manager.connection_id())
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}
