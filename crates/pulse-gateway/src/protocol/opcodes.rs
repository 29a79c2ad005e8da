//! Gateway operation codes
//!
//! Op codes as numbered by the remote gateway. Values this client has no
//! handling for are carried through as [`OpCode::Other`].

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Gateway operation codes
/// Op codes compare by their wire value, so `Other(1)` equals `Heartbeat`.
#[derive(Debug, Clone, Copy)]
pub enum OpCode {
    /// An event was dispatched (receive only)
    Dispatch,
    /// Keep the connection alive (send/receive)
    Heartbeat,
    /// Start a new session (send only)
    Identify,
    /// Update the client's presence (send only)
    PresenceUpdate,
    /// Join/leave/move between voice channels (send only)
    VoiceStateUpdate,
    /// Resume a previous session (send only)
    Resume,
    /// The client should reconnect and resume (receive only)
    Reconnect,
    /// Request guild member information (send only)
    RequestGuildMembers,
    /// The session has been invalidated (receive only)
    InvalidSession,
    /// Sent immediately after connecting (receive only)
    Hello,
    /// A heartbeat was received (receive only)
    HeartbeatAck,
    /// Any op code without dedicated handling
    Other(u16),
}

impl OpCode {
    /// Create an `OpCode` from a raw integer value
    #[must_use]
    pub const fn from_u16(value: u16) -> Self {
        match value {
            0 => Self::Dispatch,
            1 => Self::Heartbeat,
            2 => Self::Identify,
            3 => Self::PresenceUpdate,
            4 => Self::VoiceStateUpdate,
            6 => Self::Resume,
            7 => Self::Reconnect,
            8 => Self::RequestGuildMembers,
            9 => Self::InvalidSession,
            10 => Self::Hello,
            11 => Self::HeartbeatAck,
            other => Self::Other(other),
        }
    }

    /// Get the raw integer value
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        match self {
            Self::Dispatch => 0,
            Self::Heartbeat => 1,
            Self::Identify => 2,
            Self::PresenceUpdate => 3,
            Self::VoiceStateUpdate => 4,
            Self::Resume => 6,
            Self::Reconnect => 7,
            Self::RequestGuildMembers => 8,
            Self::InvalidSession => 9,
            Self::Hello => 10,
            Self::HeartbeatAck => 11,
            Self::Other(value) => value,
        }
    }

    /// Map an `Other` carrying a known value onto its named variant
    #[must_use]
    pub const fn normalized(self) -> Self {
        Self::from_u16(self.as_u16())
    }

    /// Check if this op code may be received from the gateway
    #[must_use]
    pub const fn is_receive_op(self) -> bool {
        matches!(
            self.normalized(),
            Self::Dispatch
                | Self::Heartbeat
                | Self::Reconnect
                | Self::InvalidSession
                | Self::Hello
                | Self::HeartbeatAck
        )
    }

    /// Get the name of this op code
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self.normalized() {
            Self::Dispatch => "Dispatch",
            Self::Heartbeat => "Heartbeat",
            Self::Identify => "Identify",
            Self::PresenceUpdate => "PresenceUpdate",
            Self::VoiceStateUpdate => "VoiceStateUpdate",
            Self::Resume => "Resume",
            Self::Reconnect => "Reconnect",
            Self::RequestGuildMembers => "RequestGuildMembers",
            Self::InvalidSession => "InvalidSession",
            Self::Hello => "Hello",
            Self::HeartbeatAck => "HeartbeatAck",
            Self::Other(_) => "Other",
        }
    }
}

impl PartialEq for OpCode {
    fn eq(&self, other: &Self) -> bool {
        self.as_u16() == other.as_u16()
    }
}

impl Eq for OpCode {}

impl std::hash::Hash for OpCode {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.as_u16().hash(state);
    }
}

impl From<u16> for OpCode {
    fn from(value: u16) -> Self {
        Self::from_u16(value)
    }
}

impl Serialize for OpCode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u16(self.as_u16())
    }
}

impl<'de> Deserialize<'de> for OpCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        u16::deserialize(deserializer).map(Self::from_u16)
    }
}

impl std::fmt::Display for OpCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name(), self.as_u16())
    }
}
