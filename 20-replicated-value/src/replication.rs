//! Best-effort fan-out of accepted writes to followers.
//!
//! Each target gets its own detached task. Delivery is at most once: a failed
//! or timed-out attempt is logged and counted, never retried, and never
//! reported to the client whose write triggered it.

use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use futures_util::future::join_all;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{NodeError, Result};
use crate::metrics::Metrics;
use crate::protocol::ValueRequest;

/// Sends one replicated value to one peer.
pub trait PeerTransport: Send + Sync + 'static {
    fn replicate(&self, peer: &str, value: i64) -> BoxFuture<'static, Result<()>>;
}

/// `POST http://{peer}/replicate` over reqwest.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

pub fn replicate_url(peer: &str) -> String {
    if peer.starts_with("http://") || peer.starts_with("https://") {
        format!("{}/replicate", peer.trim_end_matches('/'))
    } else {
        format!("http://{peer}/replicate")
    }
}

impl PeerTransport for HttpTransport {
    fn replicate(&self, peer: &str, value: i64) -> BoxFuture<'static, Result<()>> {
        let client = self.client.clone();
        let url = replicate_url(peer);
        let peer = peer.to_string();
        async move {
            let delivery_error = |reason: String| NodeError::ReplicationDelivery {
                peer: peer.clone(),
                reason,
            };
            let response = client
                .post(&url)
                .json(&ValueRequest { value })
                .send()
                .await
                .map_err(|err| delivery_error(err.to_string()))?;
            if !response.status().is_success() {
                return Err(delivery_error(format!("peer answered {}", response.status())));
            }
            Ok(())
        }
        .boxed()
    }
}

/// Spawns one bounded replication task per target.
#[derive(Clone)]
pub struct Replicator {
    transport: Arc<dyn PeerTransport>,
    timeout: Duration,
    metrics: Arc<Metrics>,
}

impl Replicator {
    pub fn new(
        transport: Arc<dyn PeerTransport>,
        timeout: Duration,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            transport,
            timeout,
            metrics,
        }
    }

    /// Starts delivering `value` to every target and returns without waiting.
    ///
    /// Must be called from within a tokio runtime.
    pub fn fan_out(&self, targets: Vec<String>, value: i64) -> ReplicationBatch {
        let handles = targets
            .into_iter()
            .map(|peer| {
                self.metrics.record_replication_attempt();
                let transport = Arc::clone(&self.transport);
                let metrics = Arc::clone(&self.metrics);
                let timeout = self.timeout;
                let handle =
                    tokio::spawn(deliver(transport, metrics, timeout, peer.clone(), value));
                (peer, handle)
            })
            .collect();
        ReplicationBatch { handles }
    }
}

async fn deliver(
    transport: Arc<dyn PeerTransport>,
    metrics: Arc<Metrics>,
    timeout: Duration,
    peer: String,
    value: i64,
) -> Result<()> {
    let result = match tokio::time::timeout(timeout, transport.replicate(&peer, value)).await {
        Ok(result) => result,
        Err(_) => Err(NodeError::ReplicationDelivery {
            peer: peer.clone(),
            reason: format!("timed out after {timeout:?}"),
        }),
    };

    match &result {
        Ok(()) => debug!(peer = %peer, value, "value replicated"),
        Err(err) => {
            metrics.record_replication_failure();
            warn!(peer = %peer, value, error = %err, "replication failed");
        }
    }
    result
}

/// Handles to the tasks started by one fan-out.
///
/// Dropping the batch detaches the tasks; they still run to completion.
#[derive(Debug)]
pub struct ReplicationBatch {
    handles: Vec<(String, JoinHandle<Result<()>>)>,
}

impl ReplicationBatch {
    /// Number of peers a delivery was attempted to.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Waits for every delivery to finish or time out.
    ///
    /// Results come back in target order. A task that panicked or was
    /// cancelled is reported as a delivery failure for its peer.
    pub async fn wait(self) -> Vec<Result<()>> {
        let (peers, handles): (Vec<_>, Vec<_>) = self.handles.into_iter().unzip();
        join_all(handles)
            .await
            .into_iter()
            .zip(peers)
            .map(|(joined, peer)| {
                joined.unwrap_or_else(|err| {
                    Err(NodeError::ReplicationDelivery {
                        peer,
                        reason: err.to_string(),
                    })
                })
            })
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use super::*;

    /// Records every delivery and optionally fails, stalls or panics for
    /// chosen peers.
    #[derive(Default)]
    pub(crate) struct RecordingTransport {
        pub(crate) sent: Mutex<Vec<(String, i64)>>,
        pub(crate) failing: Vec<String>,
        pub(crate) stalled: Vec<String>,
        pub(crate) panicking: Vec<String>,
    }

    impl PeerTransport for RecordingTransport {
        fn replicate(&self, peer: &str, value: i64) -> BoxFuture<'static, Result<()>> {
            self.sent.lock().unwrap().push((peer.to_string(), value));
            let fail = self.failing.iter().any(|p| p == peer);
            let stall = self.stalled.iter().any(|p| p == peer);
            let crash = self.panicking.iter().any(|p| p == peer);
            let peer = peer.to_string();
            async move {
                if crash {
                    panic!("transport crashed while sending to {peer}");
                }
                if stall {
                    futures::future::pending::<()>().await;
                }
                if fail {
                    return Err(NodeError::ReplicationDelivery {
                        peer,
                        reason: "connection refused".into(),
                    });
                }
                Ok(())
            }
            .boxed()
        }
    }

    fn replicator(transport: Arc<RecordingTransport>, metrics: Arc<Metrics>) -> Replicator {
        Replicator::new(transport, Duration::from_millis(50), metrics)
    }

    #[tokio::test]
    async fn fan_out_sends_to_every_target() {
        let transport = Arc::new(RecordingTransport::default());
        let metrics = Arc::new(Metrics::new());
        let replicator = replicator(Arc::clone(&transport), Arc::clone(&metrics));

        let batch = replicator.fan_out(vec!["b:1".into(), "c:1".into()], 9);
        assert_eq!(batch.len(), 2);
        let results = batch.wait().await;

        assert!(results.iter().all(Result::is_ok));
        let mut sent = transport.sent.lock().unwrap().clone();
        sent.sort();
        assert_eq!(sent, vec![("b:1".to_string(), 9), ("c:1".to_string(), 9)]);
        assert_eq!(metrics.replication_attempts(), 2);
        assert_eq!(metrics.replication_failures(), 0);
    }

    #[tokio::test]
    async fn failures_are_counted_not_retried() {
        let transport = Arc::new(RecordingTransport {
            failing: vec!["b:1".into()],
            ..Default::default()
        });
        let metrics = Arc::new(Metrics::new());
        let replicator = replicator(Arc::clone(&transport), Arc::clone(&metrics));

        let results = replicator
            .fan_out(vec!["b:1".into(), "c:1".into()], 3)
            .wait()
            .await;

        assert_eq!(results.iter().filter(|r| r.is_err()).count(), 1);
        assert_eq!(transport.sent.lock().unwrap().len(), 2);
        assert_eq!(metrics.replication_failures(), 1);
    }

    #[tokio::test]
    async fn stalled_peer_is_abandoned_after_timeout() {
        let transport = Arc::new(RecordingTransport {
            stalled: vec!["b:1".into()],
            ..Default::default()
        });
        let metrics = Arc::new(Metrics::new());
        let replicator = replicator(transport, Arc::clone(&metrics));

        let results = replicator.fan_out(vec!["b:1".into()], 1).wait().await;

        assert!(matches!(
            results.as_slice(),
            [Err(NodeError::ReplicationDelivery { reason, .. })] if reason.contains("timed out")
        ));
        assert_eq!(metrics.replication_failures(), 1);
    }

    #[tokio::test]
    async fn crashed_delivery_task_names_its_peer() {
        let transport = Arc::new(RecordingTransport {
            panicking: vec!["c:1".into()],
            ..Default::default()
        });
        let replicator = replicator(transport, Arc::new(Metrics::new()));

        let results = replicator
            .fan_out(vec!["b:1".into(), "c:1".into()], 5)
            .wait()
            .await;

        assert!(results[0].is_ok());
        assert!(matches!(
            &results[1],
            Err(NodeError::ReplicationDelivery { peer, .. }) if peer == "c:1"
        ));
    }

    #[tokio::test]
    async fn empty_fan_out_spawns_nothing() {
        let transport = Arc::new(RecordingTransport::default());
        let replicator = replicator(transport, Arc::new(Metrics::new()));

        let batch = replicator.fan_out(Vec::new(), 1);

        assert!(batch.is_empty());
        assert!(batch.wait().await.is_empty());
    }

    #[test]
    fn replicate_url_adds_scheme_when_missing() {
        assert_eq!(replicate_url("10.0.0.1:80"), "http://10.0.0.1:80/replicate");
        assert_eq!(
            replicate_url("https://node-b:443/"),
            "https://node-b:443/replicate"
        );
    }
}
