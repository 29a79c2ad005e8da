//! Reference gateway-event router
//!
//! Decodes inbound frames and drives the heartbeat manager from them.

mod dispatcher;
mod error;

pub use dispatcher::{GatewayRouter, RouteOutcome};
pub use error::{RouterError, RouterResult};
