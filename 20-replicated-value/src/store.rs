//! In-memory storage for the single replicated value.
//!
//! Every node owns one [`ValueStore`]. The leader writes to it before fanning
//! the value out, followers write to it when a replicated value arrives. Reads
//! always hit the local copy, so a follower may lag behind the leader.

use std::sync::{Mutex, PoisonError};

/// Value held by a node that has never seen a write.
pub const UNINITIALIZED: i64 = -1;

/// Thread-safe holder for the shared integer.
///
/// Writes are unconditional overwrites: the last writer wins, there is no
/// compare-and-swap and no history.
///
/// # Why Mutex instead of RwLock?
///
/// Reads and writes both hold the lock for a single one-word copy, so
/// readers never wait long enough for shared access to matter. The simpler
/// `Mutex` is sufficient.
///
/// An `AtomicI64` would also do for the bare value. The lock leaves room for
/// the store to grow a second field (a write version, say) that must change
/// together with the value.
pub struct ValueStore {
    value: Mutex<i64>,
}

impl Default for ValueStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ValueStore {
    /// Creates a store holding [`UNINITIALIZED`].
    pub fn new() -> Self {
        Self {
            value: Mutex::new(UNINITIALIZED),
        }
    }

    /// Returns the current local value.
    pub fn get(&self) -> i64 {
        *self.value.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Overwrites the local value.
    pub fn set(&self, value: i64) {
        *self.value.lock().unwrap_or_else(PoisonError::into_inner) = value;
    }
}
