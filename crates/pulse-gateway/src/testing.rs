//! Test doubles shared by the unit tests

use crate::connection::{OutboundSocket, TransportError};
use crate::protocol::{Envelope, OpCode};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

type SendHook = Arc<dyn Fn(&str) + Send + Sync>;

/// Socket that records every frame it is asked to send
#[derive(Default)]
pub(crate) struct RecordingSocket {
    frames: Mutex<Vec<(Instant, String)>>,
    latency: Mutex<Option<Duration>>,
    failing: AtomicBool,
    on_send: Mutex<Option<SendHook>>,
}

impl RecordingSocket {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Make every send take this long before it completes
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = Some(latency);
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Run `hook` after each successful send
    pub fn on_send(&self, hook: impl Fn(&str) + Send + Sync + 'static) {
        *self.on_send.lock() = Some(Arc::new(hook));
    }

    pub fn frames(&self) -> Vec<String> {
        self.frames.lock().iter().map(|(_, f)| f.clone()).collect()
    }

    /// When each send completed
    pub fn sent_at(&self) -> Vec<Instant> {
        self.frames.lock().iter().map(|(at, _)| *at).collect()
    }

    pub fn envelopes(&self) -> Vec<Envelope> {
        self.frames()
            .iter()
            .map(|f| Envelope::from_json(f).unwrap())
            .collect()
    }

    pub fn clear(&self) {
        self.frames.lock().clear();
    }
}

#[async_trait]
impl OutboundSocket for RecordingSocket {
    async fn send(&self, frame: String) -> Result<(), TransportError> {
        let latency = *self.latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        if self.failing.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }

        self.frames.lock().push((Instant::now(), frame.clone()));

        let hook = self.on_send.lock().clone();
        if let Some(hook) = hook {
            hook(&frame);
        }
        Ok(())
    }
}

/// Hello envelope exactly as the gateway sends it
pub(crate) fn hello(interval_ms: u64) -> Envelope {
    Envelope {
        d: Some(json!({ "heartbeat_interval": interval_ms })),
        ..Envelope::new(OpCode::Hello)
    }
}
