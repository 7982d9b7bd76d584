//! Per-record async locks
//!
//! Operations on one `client_id` are serialized; different records run
//! freely. SQLite transactions still guard each individual write.

use std::sync::Arc;

use dashmap::DashMap;
use leadsync_core::domain::ClientId;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Registry of one async mutex per client ID
#[derive(Debug, Default)]
pub struct KeyedLocks {
    locks: DashMap<ClientId, Arc<Mutex<()>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to the given record
    ///
    /// The returned guard releases the record when dropped.
    pub async fn lock(&self, client_id: &ClientId) -> OwnedMutexGuard<()> {
        // Clone the Arc out so the map shard is not held across the await.
        let lock = self
            .locks
            .entry(client_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }

    /// Drops the lock entry of a record that no longer exists
    ///
    /// Waiters that already hold a clone of the mutex are unaffected.
    pub fn forget(&self, client_id: &ClientId) {
        self.locks.remove(client_id);
    }

    /// Number of tracked records
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
