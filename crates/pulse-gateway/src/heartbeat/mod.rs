//! Connection liveness
//!
//! Heartbeat scheduling, sequence tracking and the resume-or-identify
//! decision for a single gateway connection.

mod error;
mod manager;
mod state;
mod timer;

pub use error::{HeartbeatError, HeartbeatResult};
pub use manager::{CycleOutcome, HeartbeatManager, HelloOutcome};
pub use state::LivenessSnapshot;
pub use timer::{HeartbeatTimer, TimerExit, TimerMode};
