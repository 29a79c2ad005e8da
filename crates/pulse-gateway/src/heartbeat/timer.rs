//! Heartbeat timer
//!
//! One task per connection that heartbeats on the hello interval until it is
//! cancelled, the socket fails, or a heartbeat goes unacknowledged.

use super::{HeartbeatError, HeartbeatManager};
use crate::connection::OutboundSocket;
use pulse_common::HeartbeatMode;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// How the timer spaces its heartbeats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerMode {
    /// Sleep a full interval after each send completes
    Drift,
    /// Tick every interval measured from the timer start
    FixedRate,
}

impl TimerMode {
    /// Timer mode for a configured heartbeat mode; `None` when no timer runs
    #[must_use]
    pub fn from_mode(mode: HeartbeatMode) -> Option<Self> {
        match mode {
            HeartbeatMode::Drift => Some(Self::Drift),
            HeartbeatMode::FixedRate => Some(Self::FixedRate),
            HeartbeatMode::Triggered => None,
        }
    }
}

/// Why a heartbeat timer stopped
#[derive(Debug)]
pub enum TimerExit {
    Cancelled,
    Failed(HeartbeatError),
}

/// Handle to a running heartbeat timer
///
/// Dropping the handle, or a pending `join`, cancels the timer.
#[derive(Debug)]
pub struct HeartbeatTimer {
    cancel: CancellationToken,
    handle: Option<JoinHandle<TimerExit>>,
}

impl HeartbeatTimer {
    pub(crate) fn new(cancel: CancellationToken, handle: JoinHandle<TimerExit>) -> Self {
        Self {
            cancel,
            handle: Some(handle),
        }
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Check if the timer task has stopped
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Wait for the timer to stop and report why
    pub async fn join(mut self) -> TimerExit {
        let Some(handle) = self.handle.take() else {
            return TimerExit::Cancelled;
        };

        match handle.await {
            Ok(exit) => exit,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(_) => TimerExit::Cancelled,
        }
    }
}

impl Drop for HeartbeatTimer {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

pub(crate) async fn run(
    manager: Arc<HeartbeatManager>,
    socket: Arc<dyn OutboundSocket>,
    mode: TimerMode,
    cancel: CancellationToken,
) -> TimerExit {
    let Some(period) = manager.interval() else {
        tracing::warn!(
            connection_id = %manager.connection_id(),
            "Heartbeat timer started before hello"
        );
        return TimerExit::Failed(HeartbeatError::NotStarted);
    };

    let mut ticker = match mode {
        TimerMode::FixedRate => {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            Some(ticker)
        }
        TimerMode::Drift => None,
    };

    loop {
        let wait = async {
            match ticker.as_mut() {
                Some(ticker) => {
                    ticker.tick().await;
                }
                None => time::sleep(period).await,
            }
        };

        tokio::select! {
            biased;
            () = cancel.cancelled() => return TimerExit::Cancelled,
            () = wait => {}
        }

        if manager.is_awaiting_ack() {
            tracing::warn!(
                connection_id = %manager.connection_id(),
                "Connection zombied (heartbeat not ACKed)"
            );
            return TimerExit::Failed(HeartbeatError::Zombied {
                interval_ms: period.as_millis() as u64,
            });
        }

        if let Err(e) = manager.send_heartbeat(&*socket).await {
            tracing::warn!(
                connection_id = %manager.connection_id(),
                error = %e,
                "Failed to send heartbeat"
            );
            return TimerExit::Failed(e);
        }
    }
}
