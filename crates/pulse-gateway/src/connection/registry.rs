//! Session registry
//!
//! Tracks the liveness state of every gateway connection a process holds
//! open, using DashMap for thread-safe access.

use crate::heartbeat::{HeartbeatManager, LivenessSnapshot};
use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Registry of live gateway sessions, keyed by connection id
#[derive(Default)]
pub struct SessionRegistry {
    sessions: DashMap<Uuid, Arc<HeartbeatManager>>,
}

impl SessionRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty registry wrapped in Arc
    #[must_use]
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Create and register the liveness state for a new connection
    pub fn open(&self) -> Arc<HeartbeatManager> {
        let manager = Arc::new(HeartbeatManager::new());
        self.register(manager.clone());
        manager
    }

    /// Register an existing manager (e.g. one carried over a reconnect)
    pub fn register(&self, manager: Arc<HeartbeatManager>) {
        let connection_id = manager.connection_id();
        if let Some(previous) = self.sessions.insert(connection_id, manager) {
            previous.stop_timer();
        }

        tracing::debug!(connection_id = %connection_id, "Session registered");
    }

    /// Get the manager for a connection
    pub fn get(&self, connection_id: &Uuid) -> Option<Arc<HeartbeatManager>> {
        self.sessions.get(connection_id).map(|entry| entry.clone())
    }

    /// Remove a connection, cancelling any heartbeat still scheduled for it
    pub fn remove(&self, connection_id: &Uuid) -> Option<Arc<HeartbeatManager>> {
        let (_, manager) = self.sessions.remove(connection_id)?;
        manager.stop_timer();

        tracing::debug!(connection_id = %connection_id, "Session removed");

        Some(manager)
    }

    /// Number of registered sessions
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Check if no sessions are registered
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Point-in-time liveness of every session, for health surfaces
    pub fn snapshots(&self) -> Vec<LivenessSnapshot> {
        self.sessions
            .iter()
            .map(|entry| entry.value().snapshot())
            .collect()
    }

    /// Stop every heartbeat timer and forget all sessions
    pub fn clear(&self) {
        for entry in &self.sessions {
            entry.value().stop_timer();
        }
        self.sessions.clear();
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("sessions", &self.sessions.len())
            .finish()
    }
}
