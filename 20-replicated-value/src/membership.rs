//! Cluster membership as pushed by the external orchestrator.
//!
//! A push replaces the whole peer list at once; there is no incremental
//! join/leave. The registry remembers which peer the push marked as leader so
//! followers can redirect clients, and it flips the node's
//! [`LeadershipFlag`] when that peer is this node.

use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::flags::LeadershipFlag;

/// One cluster member as named in a membership push.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Peer {
    pub host: String,
    #[serde(default)]
    pub is_leader: bool,
}

impl Peer {
    pub fn new(host: impl Into<String>, is_leader: bool) -> Self {
        Self {
            host: host.into(),
            is_leader,
        }
    }
}

/// What a membership push changed, reported back to the caller for logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipUpdate {
    pub peer_count: usize,
    pub leader: Option<String>,
    pub self_is_leader: bool,
}

#[derive(Debug, Default)]
struct Membership {
    peers: Vec<Peer>,
    leader: Option<String>,
    pushed: bool,
}

/// Current peer set and leader designation of one node.
pub struct MembershipRegistry {
    self_address: String,
    inner: RwLock<Membership>,
}

impl MembershipRegistry {
    pub fn new(self_address: impl Into<String>) -> Self {
        Self {
            self_address: self_address.into(),
            inner: RwLock::new(Membership::default()),
        }
    }

    pub fn self_address(&self) -> &str {
        &self.self_address
    }

    /// Replaces the peer set with `peers`.
    ///
    /// The first peer marked `IsLeader` wins; later marks in the same push are
    /// ignored with a warning. A push without a leader clears the recorded
    /// leader address but never clears `leadership`.
    pub fn set_membership(
        &self,
        peers: Vec<Peer>,
        leadership: &LeadershipFlag,
    ) -> MembershipUpdate {
        let mut marked = peers.iter().filter(|peer| peer.is_leader);
        let leader = marked.next().map(|peer| peer.host.clone());
        let extra = marked.count();
        if extra > 0 {
            warn!(
                leader = ?leader,
                ignored = extra,
                "membership push marked several leaders, keeping the first"
            );
        }
        if peers.is_empty() {
            warn!("membership push contained no peers");
        }

        let self_is_leader = leader.as_deref() == Some(self.self_address.as_str());
        let update = MembershipUpdate {
            peer_count: peers.len(),
            leader: leader.clone(),
            self_is_leader,
        };

        // The flag flips only after the new peer set is in place, so a write
        // accepted as leader never fans out to the previous membership.
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        *inner = Membership {
            peers,
            leader,
            pushed: true,
        };
        if self_is_leader && leadership.mark_leader() {
            info!(address = %self.self_address, "this node is now the leader");
        }
        drop(inner);

        debug!(?update, "membership replaced");
        update
    }

    /// Records this node as leader without a full push (`POST /leader`).
    pub fn designate_self(&self, leadership: &LeadershipFlag) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.leader = Some(self.self_address.clone());
        for peer in &mut inner.peers {
            peer.is_leader = peer.host == self.self_address;
        }
        leadership.mark_leader();
    }

    /// Leader address from the last push, if it named one.
    pub fn leader_address(&self) -> Option<String> {
        self.read().leader.clone()
    }

    /// Snapshot of the full peer list.
    pub fn peers(&self) -> Vec<Peer> {
        self.read().peers.clone()
    }

    /// Addresses the leader fans writes out to: every peer except this node.
    pub fn replication_targets(&self) -> Vec<String> {
        self.read()
            .peers
            .iter()
            .filter(|peer| peer.host != self.self_address)
            .map(|peer| peer.host.clone())
            .collect()
    }

    /// Whether any membership push has been received.
    pub fn has_membership(&self) -> bool {
        self.read().pushed
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Membership> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }
}
