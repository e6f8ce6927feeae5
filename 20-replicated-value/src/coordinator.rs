//! Leader-side write handling and follower-side replication intake.

use std::sync::Arc;

use tracing::{debug, info};

use crate::flags::LeadershipFlag;
use crate::membership::MembershipRegistry;
use crate::replication::{ReplicationBatch, Replicator};
use crate::store::ValueStore;

/// Outcome of a client write.
#[derive(Debug)]
pub enum WriteResult {
    /// Applied locally; `replication` tracks the fan-out to followers.
    Accepted { replication: ReplicationBatch },
    /// This node is not the leader and nothing was mutated.
    Rejected { leader: Option<String> },
}

/// Accepts client writes on the leader and broadcasts them.
pub struct WriteCoordinator {
    store: Arc<ValueStore>,
    leadership: Arc<LeadershipFlag>,
    membership: Arc<MembershipRegistry>,
    replicator: Replicator,
}

impl WriteCoordinator {
    pub fn new(
        store: Arc<ValueStore>,
        leadership: Arc<LeadershipFlag>,
        membership: Arc<MembershipRegistry>,
        replicator: Replicator,
    ) -> Self {
        Self {
            store,
            leadership,
            membership,
            replicator,
        }
    }

    /// Applies `value` locally and starts replicating it, or refuses with the
    /// known leader address when this node is a follower.
    ///
    /// The local write is visible before this returns; replication is not
    /// awaited.
    pub fn handle_write(&self, value: i64) -> WriteResult {
        if !self.leadership.is_leader() {
            let leader = self.membership.leader_address();
            info!(value, leader = ?leader, "write received but this node is not the leader");
            return WriteResult::Rejected { leader };
        }

        self.store.set(value);
        let targets = self.membership.replication_targets();
        debug!(value, peers = targets.len(), "write applied, replicating");
        WriteResult::Accepted {
            replication: self.replicator.fan_out(targets, value),
        }
    }
}

/// Applies values pushed by the leader.
///
/// There is no leadership check and no sender authentication: anything that
/// can reach `/replicate` can overwrite the local value. Received values are
/// never forwarded.
pub struct ReplicationReceiver {
    store: Arc<ValueStore>,
}

impl ReplicationReceiver {
    pub fn new(store: Arc<ValueStore>) -> Self {
        Self { store }
    }

    pub fn handle_replicate(&self, value: i64) {
        self.store.set(value);
        debug!(value, "replicated value applied");
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::membership::Peer;
    use crate::metrics::Metrics;
    use crate::replication::tests::RecordingTransport;
    use crate::store::UNINITIALIZED;

    const SELF: &str = "127.0.0.1:7001";

    struct Fixture {
        store: Arc<ValueStore>,
        leadership: Arc<LeadershipFlag>,
        membership: Arc<MembershipRegistry>,
        transport: Arc<RecordingTransport>,
        coordinator: WriteCoordinator,
    }

    fn fixture(leader: &str) -> Fixture {
        let store = Arc::new(ValueStore::new());
        let leadership = Arc::new(LeadershipFlag::default());
        let membership = Arc::new(MembershipRegistry::new(SELF));
        let peers = ["127.0.0.1:7001", "127.0.0.1:7002", "127.0.0.1:7003"]
            .into_iter()
            .map(|host| Peer::new(host, host == leader))
            .collect();
        membership.set_membership(peers, &leadership);

        let transport = Arc::new(RecordingTransport::default());
        let replicator = Replicator::new(
            transport.clone(),
            Duration::from_millis(100),
            Arc::new(Metrics::new()),
        );
        let coordinator = WriteCoordinator::new(
            Arc::clone(&store),
            Arc::clone(&leadership),
            Arc::clone(&membership),
            replicator,
        );
        Fixture {
            store,
            leadership,
            membership,
            transport,
            coordinator,
        }
    }

    #[tokio::test]
    async fn leader_applies_then_replicates_to_others() {
        let f = fixture(SELF);
        assert!(f.leadership.is_leader());

        let result = f.coordinator.handle_write(42);

        assert_eq!(f.store.get(), 42);
        let WriteResult::Accepted { replication } = result else {
            panic!("leader should accept writes");
        };
        assert_eq!(replication.len(), 2);
        replication.wait().await;

        let mut sent = f.transport.sent.lock().unwrap().clone();
        sent.sort();
        assert_eq!(
            sent,
            vec![
                ("127.0.0.1:7002".to_string(), 42),
                ("127.0.0.1:7003".to_string(), 42)
            ]
        );
    }

    #[tokio::test]
    async fn follower_rejects_without_mutating() {
        let f = fixture("127.0.0.1:7002");

        let result = f.coordinator.handle_write(7);

        assert!(matches!(
            result,
            WriteResult::Rejected { leader: Some(ref l) } if l == "127.0.0.1:7002"
        ));
        assert_eq!(f.store.get(), UNINITIALIZED);
        assert!(f.transport.sent.lock().unwrap().is_empty());
        assert_eq!(f.membership.leader_address().as_deref(), Some("127.0.0.1:7002"));
    }

    #[tokio::test]
    async fn follower_without_known_leader_rejects_with_none() {
        let f = fixture("nobody");

        assert!(matches!(
            f.coordinator.handle_write(1),
            WriteResult::Rejected { leader: None }
        ));
    }

    #[tokio::test]
    async fn replication_failure_keeps_local_write() {
        let mut f = fixture(SELF);
        let failing = Arc::new(RecordingTransport {
            failing: vec!["127.0.0.1:7002".into(), "127.0.0.1:7003".into()],
            ..Default::default()
        });
        f.coordinator.replicator = Replicator::new(
            failing,
            Duration::from_millis(100),
            Arc::new(Metrics::new()),
        );

        let WriteResult::Accepted { replication } = f.coordinator.handle_write(5) else {
            panic!("leader should accept writes");
        };
        let results = replication.wait().await;

        assert!(results.iter().all(|r| r.is_err()));
        assert_eq!(f.store.get(), 5);
    }

    #[test]
    fn receiver_applies_and_is_idempotent() {
        let store = Arc::new(ValueStore::new());
        let receiver = ReplicationReceiver::new(Arc::clone(&store));

        receiver.handle_replicate(9);
        receiver.handle_replicate(9);

        assert_eq!(store.get(), 9);
    }
}
