//! Connection plumbing
//!
//! The outbound socket capability handed to the heartbeat manager, and the
//! registry of per-connection liveness state.

mod registry;
mod socket;

pub use registry::SessionRegistry;
pub use socket::{ChannelSocket, OutboundSocket, TransportError, WebSocketSink};
