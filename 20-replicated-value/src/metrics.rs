//! Request and replication counters, exported in Prometheus text format.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct Metrics {
    total_requests: AtomicU64,
    failed_requests: AtomicU64,
    replication_attempts: AtomicU64,
    replication_failures: AtomicU64,
}

/// Point-in-time view of node state rendered next to the counters.
#[derive(Debug, Clone, Copy)]
pub struct NodeGauges {
    pub is_leader: bool,
    pub is_ready: bool,
    pub value: i64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failed_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_replication_attempt(&self) {
        self.replication_attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_replication_failure(&self) {
        self.replication_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn total_requests(&self) -> u64 {
        self.total_requests.load(Ordering::Relaxed)
    }

    pub fn failed_requests(&self) -> u64 {
        self.failed_requests.load(Ordering::Relaxed)
    }

    pub fn replication_attempts(&self) -> u64 {
        self.replication_attempts.load(Ordering::Relaxed)
    }

    pub fn replication_failures(&self) -> u64 {
        self.replication_failures.load(Ordering::Relaxed)
    }

    pub fn export_prometheus(&self, gauges: NodeGauges) -> String {
        format!(
            "# HELP total_requests Total number of requests\n\
            # TYPE total_requests counter\n\
            total_requests {}\n\
            # HELP failed_requests Total number of failed requests\n\
            # TYPE failed_requests counter\n\
            failed_requests {}\n\
            # HELP replication_attempts_total Replication requests sent to followers\n\
            # TYPE replication_attempts_total counter\n\
            replication_attempts_total {}\n\
            # HELP replication_failures_total Replication requests that failed or timed out\n\
            # TYPE replication_failures_total counter\n\
            replication_failures_total {}\n\
            # HELP node_is_leader Whether this node accepts writes\n\
            # TYPE node_is_leader gauge\n\
            node_is_leader {}\n\
            # HELP node_is_ready Whether this node serves reads and writes\n\
            # TYPE node_is_ready gauge\n\
            node_is_ready {}\n\
            # HELP shared_value Current local copy of the replicated value\n\
            # TYPE shared_value gauge\n\
            shared_value {}\n",
            self.total_requests(),
            self.failed_requests(),
            self.replication_attempts(),
            self.replication_failures(),
            u8::from(gauges.is_leader),
            u8::from(gauges.is_ready),
            gauges.value,
        )
    }
}
