//! Integration test utilities for the gateway client
//!
//! Drives a `GatewayRouter` over an in-memory socket, playing the part of
//! the remote gateway.

pub mod helpers;

pub use fixtures::*;
pub use helpers::*;
