//! Process-local switches read on the hot path.
//!
//! Both flags are written rarely (once per bootstrap) and read on every
//! request, so they are plain atomics rather than lock-guarded fields.

use std::sync::atomic::{AtomicBool, Ordering};

/// Answers "am I the leader" for the write path.
///
/// The flag only ever moves from `false` to `true`. A later membership push
/// that names another leader does not clear it.
///
/// # Why a separate atomic instead of a field in the membership registry?
///
/// Every write checks leadership, while membership changes once per
/// bootstrap. Keeping the flag outside the registry's lock lets the write path
/// answer without touching the lock at all. The registry still sets the flag
/// while holding its write lock, after storing the new peers, so a node that
/// reads `true` also sees the peer set that made it leader.
///
/// # Why Acquire/Release?
///
/// `Relaxed` would be enough for the flag itself, but the write path reads the
/// flag and then the peer set. Release on the swap and Acquire on the load
/// order those two reads after the push that produced them.
#[derive(Debug, Default)]
pub struct LeadershipFlag {
    leader: AtomicBool,
}

impl LeadershipFlag {
    pub fn new(initial: bool) -> Self {
        Self {
            leader: AtomicBool::new(initial),
        }
    }

    pub fn is_leader(&self) -> bool {
        self.leader.load(Ordering::Acquire)
    }

    /// Marks this node as leader. Returns `true` if the flag changed.
    pub fn mark_leader(&self) -> bool {
        !self.leader.swap(true, Ordering::AcqRel)
    }
}

/// Blocks client reads and writes until the orchestrator signals readiness.
///
/// Irreversible: once open, the gate stays open for the life of the process.
#[derive(Debug, Default)]
pub struct ReadinessGate {
    ready: AtomicBool,
}

impl ReadinessGate {
    pub fn new(initial: bool) -> Self {
        Self {
            ready: AtomicBool::new(initial),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Opens the gate. Returns `true` if this call opened it.
    pub fn mark_ready(&self) -> bool {
        !self.ready.swap(true, Ordering::AcqRel)
    }
}
