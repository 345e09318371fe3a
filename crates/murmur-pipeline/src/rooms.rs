use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Per-room turn serialization.
///
/// Two messages for the same room processed concurrently would both load the
/// same thread snapshot and persist divergent histories. The gate closes
/// that race: one turn in flight per room, rooms fully independent of each
/// other. Disabling the gate restores the documented lost-update behavior
/// for callers that serialize externally.
pub struct RoomGate {
    enabled: bool,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl RoomGate {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            locks: DashMap::new(),
        }
    }

    /// Acquire the room's turn lock, waiting if a turn is already in flight.
    ///
    /// Returns `None` when serialization is disabled. Lock entries are kept
    /// for the life of the process — room cardinality is small and bounded
    /// by the deployment.
    pub async fn acquire(&self, room_id: &str) -> Option<OwnedMutexGuard<()>> {
        if !self.enabled {
            return None;
        }
        let lock = self
            .locks
            .entry(room_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        Some(lock.lock_owned().await)
    }
}
