//! Replicated single-value store with an externally assigned leader.
//!
//! A cluster of nodes holds one shared integer. An orchestrator pushes the
//! membership (who is in the cluster and who leads) to every node and then
//! signals readiness. Clients may read from any node; writes are accepted only
//! by the leader, applied locally, and fanned out to the followers without
//! waiting for acknowledgment.
//!
//! # Modules
//!
//! - [`config`]: `key=value` config file and node settings
//! - [`membership`]: peer set and leader designation
//! - [`flags`]: leadership and readiness switches
//! - [`store`]: the local copy of the shared value
//! - [`coordinator`]: leader write path and follower replication intake
//! - [`replication`]: best-effort fan-out to peers
//! - [`node`]: per-node context tying the pieces together
//! - [`server`]: axum routes and the readiness middleware
//! - [`protocol`]: JSON bodies on the wire
//! - [`metrics`]: counters rendered for Prometheus
//! - [`error`]: error taxonomy and HTTP mapping

pub mod cli;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod flags;
pub mod membership;
pub mod metrics;
pub mod node;
pub mod protocol;
pub mod replication;
pub mod server;
pub mod store;
