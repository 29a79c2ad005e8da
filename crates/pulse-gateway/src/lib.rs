//! # pulse-gateway
//!
//! Keeps a gateway WebSocket session alive: heartbeats on the interval the
//! remote announces in its hello, tracks the dispatch sequence number, and
//! decides between a fresh identify and a resume after a reconnect.

pub mod connection;
pub mod heartbeat;
pub mod protocol;
pub mod router;

#[cfg(test)]
pub(crate) mod testing;

pub use connection::{ChannelSocket, OutboundSocket, SessionRegistry, TransportError, WebSocketSink};
pub use heartbeat::{
    CycleOutcome, HeartbeatError, HeartbeatManager, HeartbeatResult, HeartbeatTimer,
    HelloOutcome, LivenessSnapshot, TimerExit, TimerMode,
};
pub use protocol::{CloseCode, Envelope, OpCode};
pub use router::{GatewayRouter, RouteOutcome, RouterError, RouterResult};
