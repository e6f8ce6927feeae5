//! Per-node state shared by every request handler.
//!
//! [`NodeContext`] is built once at startup and handed to the HTTP layer
//! behind an `Arc`. Nothing lives in process globals, so several nodes can run
//! side by side in one test process.

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::NodeConfig;
use crate::coordinator::{ReplicationReceiver, WriteCoordinator, WriteResult};
use crate::error::Result;
use crate::flags::{LeadershipFlag, ReadinessGate};
use crate::membership::{MembershipRegistry, MembershipUpdate, Peer};
use crate::metrics::{Metrics, NodeGauges};
use crate::replication::{HttpTransport, PeerTransport, Replicator};
use crate::store::ValueStore;

/// Where a node is in its bootstrap lifecycle.
///
/// Transitions only move forward:
/// `Uninitialized -> {Leader | Follower} -> Ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodePhase {
    Uninitialized,
    Follower,
    Leader,
    Ready { leader: bool },
}

pub struct NodeContext {
    config: NodeConfig,
    store: Arc<ValueStore>,
    leadership: Arc<LeadershipFlag>,
    readiness: ReadinessGate,
    membership: Arc<MembershipRegistry>,
    metrics: Arc<Metrics>,
    coordinator: WriteCoordinator,
    receiver: ReplicationReceiver,
}

impl NodeContext {
    /// Builds a node that replicates over HTTP.
    pub fn new(config: NodeConfig) -> Result<Self> {
        let transport = HttpTransport::new(config.replication_timeout)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Builds a node with a caller-supplied replication transport.
    ///
    /// Outside cluster mode the node starts ready and acting as leader with an
    /// empty peer set, so every write is accepted and nothing is replicated.
    pub fn with_transport(config: NodeConfig, transport: Arc<dyn PeerTransport>) -> Self {
        let standalone = !config.cluster_mode;
        let store = Arc::new(ValueStore::new());
        let leadership = Arc::new(LeadershipFlag::new(standalone));
        let membership = Arc::new(MembershipRegistry::new(config.self_address()));
        let metrics = Arc::new(Metrics::new());
        let replicator =
            Replicator::new(transport, config.replication_timeout, Arc::clone(&metrics));
        let coordinator = WriteCoordinator::new(
            Arc::clone(&store),
            Arc::clone(&leadership),
            Arc::clone(&membership),
            replicator,
        );
        let receiver = ReplicationReceiver::new(Arc::clone(&store));

        Self {
            config,
            store,
            leadership,
            readiness: ReadinessGate::new(standalone),
            membership,
            metrics,
            coordinator,
            receiver,
        }
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn self_address(&self) -> &str {
        self.membership.self_address()
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn is_leader(&self) -> bool {
        self.leadership.is_leader()
    }

    pub fn is_ready(&self) -> bool {
        self.readiness.is_ready()
    }

    pub fn leader_address(&self) -> Option<String> {
        self.membership.leader_address()
    }

    pub fn peers(&self) -> Vec<Peer> {
        self.membership.peers()
    }

    /// Local copy of the value; may trail the leader.
    pub fn read_value(&self) -> i64 {
        self.store.get()
    }

    pub fn write(&self, value: i64) -> WriteResult {
        self.coordinator.handle_write(value)
    }

    pub fn replicate(&self, value: i64) {
        self.receiver.handle_replicate(value);
    }

    /// Replaces cluster membership and derives leadership from it.
    pub fn set_membership(&self, peers: Vec<Peer>) -> MembershipUpdate {
        let update = self.membership.set_membership(peers, &self.leadership);
        info!(
            peers = update.peer_count,
            leader = ?update.leader,
            phase = ?self.phase(),
            "membership received"
        );
        update
    }

    /// Marks this node leader directly, outside a membership push.
    pub fn designate_leader(&self) {
        self.membership.designate_self(&self.leadership);
        info!(address = %self.self_address(), phase = ?self.phase(), "designated leader");
    }

    /// Opens the readiness gate. Returns `true` if this call opened it.
    pub fn mark_ready(&self) -> bool {
        if !self.membership.has_membership() && self.config.cluster_mode {
            warn!("ready signal received before any membership push");
        }
        let opened = self.readiness.mark_ready();
        if opened {
            info!(phase = ?self.phase(), "ready to serve requests");
        }
        opened
    }

    pub fn phase(&self) -> NodePhase {
        let leader = self.leadership.is_leader();
        if self.readiness.is_ready() {
            NodePhase::Ready { leader }
        } else if leader {
            NodePhase::Leader
        } else if self.membership.has_membership() {
            NodePhase::Follower
        } else {
            NodePhase::Uninitialized
        }
    }

    pub fn gauges(&self) -> NodeGauges {
        NodeGauges {
            is_leader: self.is_leader(),
            is_ready: self.is_ready(),
            value: self.read_value(),
        }
    }

    pub fn render_metrics(&self) -> String {
        self.metrics.export_prometheus(self.gauges())
    }
}
