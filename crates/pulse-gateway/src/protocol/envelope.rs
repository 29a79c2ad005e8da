//! Gateway envelope format
//!
//! Every frame exchanged with the gateway is one of these.

use super::{HelloPayload, IdentifyPayload, OpCode, ReadyPayload, ResumePayload};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Dispatch envelope
///
/// `s` and `t` are only set on op=0 Dispatch frames coming from the gateway,
/// with the exception of Resume, which echoes the resumed sequence in `s`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Operation code
    pub op: OpCode,

    /// Event data payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub d: Option<Value>,

    /// Sequence number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s: Option<u64>,

    /// Event name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,
}

impl Envelope {
    /// Create a bare envelope for any op code
    #[must_use]
    pub fn new(op: OpCode) -> Self {
        Self {
            op,
            d: None,
            s: None,
            t: None,
        }
    }

    // === Client Frames ===

    /// Create a Heartbeat envelope (op=1)
    ///
    /// The gateway requires `d` to be present, so an unknown sequence is sent
    /// as an explicit `null`.
    #[must_use]
    pub fn heartbeat(last_sequence: Option<u64>) -> Self {
        Self {
            d: Some(last_sequence.map_or(Value::Null, Value::from)),
            ..Self::new(OpCode::Heartbeat)
        }
    }

    /// Create an Identify envelope (op=2)
    #[must_use]
    pub fn identify(payload: &IdentifyPayload) -> Self {
        Self {
            d: serde_json::to_value(payload).ok(),
            ..Self::new(OpCode::Identify)
        }
    }

    /// Create a Resume envelope (op=6)
    #[must_use]
    pub fn resume(payload: &ResumePayload) -> Self {
        Self {
            s: Some(payload.seq),
            d: serde_json::to_value(payload).ok(),
            ..Self::new(OpCode::Resume)
        }
    }

    // === Gateway Frames ===

    /// Create a Dispatch envelope (op=0)
    #[must_use]
    pub fn dispatch(event_name: impl Into<String>, sequence: u64, data: Value) -> Self {
        Self {
            d: Some(data),
            s: Some(sequence),
            t: Some(event_name.into()),
            ..Self::new(OpCode::Dispatch)
        }
    }

    /// Create a Hello envelope (op=10)
    #[must_use]
    pub fn hello(payload: &HelloPayload) -> Self {
        Self {
            d: serde_json::to_value(payload).ok(),
            ..Self::new(OpCode::Hello)
        }
    }

    /// Create a Heartbeat ACK envelope (op=11)
    #[must_use]
    pub fn heartbeat_ack() -> Self {
        Self::new(OpCode::HeartbeatAck)
    }

    /// Create an Invalid Session envelope (op=9)
    #[must_use]
    pub fn invalid_session(resumable: bool) -> Self {
        Self {
            d: Some(Value::Bool(resumable)),
            ..Self::new(OpCode::InvalidSession)
        }
    }

    // === Parsing ===

    /// Raw `heartbeat_interval` of a Hello payload, in milliseconds
    ///
    /// No range check happens here; a zero or negative value is returned as-is.
    pub fn heartbeat_interval_ms(&self) -> Option<f64> {
        if self.op != OpCode::Hello {
            return None;
        }
        self.d
            .as_ref()
            .and_then(|d| d.get("heartbeat_interval"))
            .and_then(Value::as_f64)
    }

    /// Try to parse as a Hello payload (op=10)
    pub fn as_hello(&self) -> Option<HelloPayload> {
        if self.op != OpCode::Hello {
            return None;
        }
        self.d.as_ref().and_then(|d| serde_json::from_value(d.clone()).ok())
    }

    /// Try to parse the heartbeat sequence number (op=1)
    pub fn as_heartbeat_seq(&self) -> Option<Option<u64>> {
        if self.op != OpCode::Heartbeat {
            return None;
        }
        Some(self.d.as_ref().and_then(Value::as_u64))
    }

    /// Try to parse as a Resume payload (op=6)
    pub fn as_resume(&self) -> Option<ResumePayload> {
        if self.op != OpCode::Resume {
            return None;
        }
        self.d.as_ref().and_then(|d| serde_json::from_value(d.clone()).ok())
    }

    /// Try to parse as a READY dispatch
    pub fn as_ready(&self) -> Option<ReadyPayload> {
        if !self.is_event("READY") {
            return None;
        }
        self.d.as_ref().and_then(|d| serde_json::from_value(d.clone()).ok())
    }

    /// Whether an Invalid Session (op=9) frame allows resuming
    pub fn as_invalid_session(&self) -> Option<bool> {
        if self.op != OpCode::InvalidSession {
            return None;
        }
        Some(self.d.as_ref().and_then(Value::as_bool).unwrap_or(false))
    }

    /// Check if this is a dispatch of the named event
    #[must_use]
    pub fn is_event(&self, name: &str) -> bool {
        self.op == OpCode::Dispatch && self.t.as_deref() == Some(name)
    }

    // === Utilities ===

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl std::fmt::Display for Envelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Envelope(op={}", self.op)?;
        if let Some(t) = &self.t {
            write!(f, ", t={t}")?;
        }
        if let Some(s) = self.s {
            write!(f, ", s={s}")?;
        }
        write!(f, ")")
    }
}
