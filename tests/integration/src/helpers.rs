//! Test helpers for integration tests
//!
//! Wires a router to a `ChannelSocket` and reads back what it sends.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use pulse_common::{GatewayConfig, HeartbeatMode};
use pulse_gateway::{ChannelSocket, Envelope, GatewayRouter, HeartbeatManager, OpCode};
use tokio::sync::mpsc;

/// How long `recv` waits for a frame; virtual time under a paused clock
const RECV_TIMEOUT: Duration = Duration::from_secs(300);

/// Configuration as loaded from a test environment
pub fn test_config(mode: HeartbeatMode) -> Result<GatewayConfig> {
    let vars = HashMap::from([
        ("GATEWAY_TOKEN", "test-token".to_string()),
        ("GATEWAY_INTENTS", "513".to_string()),
        ("GATEWAY_CLIENT_NAME", "pulse-tests".to_string()),
        ("GATEWAY_OUTBOUND_BUFFER", "16".to_string()),
    ]);

    let mut config = GatewayConfig::from_lookup(|key| vars.get(key).cloned())?;
    config.heartbeat_mode = mode;
    Ok(config)
}

/// One gateway connection as seen from the remote end
pub struct TestConnection {
    pub router: GatewayRouter,
    outbound: mpsc::Receiver<String>,
}

impl TestConnection {
    /// Open a connection with a fresh session
    pub fn open(config: &GatewayConfig) -> Self {
        Self::reopen(Arc::new(HeartbeatManager::new()), config)
    }

    /// Open a new connection that carries over an existing session
    pub fn reopen(manager: Arc<HeartbeatManager>, config: &GatewayConfig) -> Self {
        let (socket, outbound) = ChannelSocket::new(config.outbound_buffer);
        let router = GatewayRouter::from_config(manager, Arc::new(socket), config);
        Self { router, outbound }
    }

    pub fn manager(&self) -> Arc<HeartbeatManager> {
        self.router.manager().clone()
    }

    /// Wait for the next frame the client sends
    pub async fn recv(&mut self) -> Result<Envelope> {
        let frame = tokio::time::timeout(RECV_TIMEOUT, self.outbound.recv())
            .await
            .context("Timed out waiting for an outbound frame")?
            .ok_or_else(|| anyhow!("Outbound channel closed"))?;

        Ok(Envelope::from_json(&frame)?)
    }

    /// Wait for the next frame and check its op code
    pub async fn expect(&mut self, op: OpCode) -> Result<Envelope> {
        let envelope = self.recv().await?;
        if envelope.op != op {
            return Err(anyhow!("Expected {op}, got {envelope}"));
        }
        Ok(envelope)
    }

    /// Frames already sent but not yet read
    pub fn pending(&mut self) -> Vec<Envelope> {
        let mut frames = Vec::new();
        while let Ok(frame) = self.outbound.try_recv() {
            if let Ok(envelope) = Envelope::from_json(&frame) {
                frames.push(envelope);
            }
        }
        frames
    }

    /// Drop the receiving half, as if the connection's writer went away
    pub fn close_outbound(&mut self) {
        self.outbound.close();
    }
}
