//! HTTP surface of a node.
//!
//! | Route        | Gated | Purpose                                  |
//! |--------------|-------|------------------------------------------|
//! | `/read`      | yes   | local value                              |
//! | `/write`     | yes   | leader write + fan-out                   |
//! | `/replicate` | no    | value pushed by the leader               |
//! | `/hosts`     | no    | membership push                          |
//! | `/ready`     | no    | opens the readiness gate                 |
//! | `/leader`    | no    | designates this node leader              |
//! | `/metrics`   | no    | Prometheus text exposition               |
//!
//! The administrative routes only exist in cluster mode.
//!
//! A `/hosts` body that does not decode is answered with 400 and the current
//! membership is kept. Storing an empty peer list instead would silently turn
//! a leader into a node that replicates to nobody.

use std::future::Future;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Request, State},
    http::header,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::debug;

use crate::coordinator::WriteResult;
use crate::error::{NodeError, Result};
use crate::node::NodeContext;
use crate::protocol::{
    decode, HostsRequest, ReadResponse, ValueRequest, HOSTS_RECEIVED, LEADER_RECEIVED, OK,
    READY_RECEIVED,
};

pub type SharedNode = Arc<NodeContext>;

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

pub fn router(node: SharedNode) -> Router {
    let gated = Router::new()
        .route("/read", get(read).fallback(only_get))
        .route("/write", post(write).fallback(only_post))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&node),
            require_ready,
        ));

    let mut app = Router::new()
        .merge(gated)
        .route("/metrics", get(metrics));

    if node.config().cluster_mode {
        app = app
            .route("/replicate", post(replicate).fallback(only_post))
            .route("/hosts", post(hosts).fallback(only_post))
            .route("/ready", post(ready).fallback(only_post))
            .route("/leader", post(leader).fallback(only_post));
    }

    app.layer(TraceLayer::new_for_http()).with_state(node)
}

/// Serves `node` on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, node: SharedNode, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router(node))
        .with_graceful_shutdown(shutdown)
        .await
}

/// Rejects client traffic until the node has been told it is ready.
///
/// Rejected requests never reach a handler and are not counted.
async fn require_ready(State(node): State<SharedNode>, request: Request, next: Next) -> Response {
    if !node.is_ready() {
        debug!(path = %request.uri().path(), "node not ready, rejecting request");
        return NodeError::NotReady.into_response();
    }
    next.run(request).await
}

async fn read(State(node): State<SharedNode>) -> Json<ReadResponse> {
    node.metrics().record_request();
    Json(ReadResponse {
        response: node.read_value(),
    })
}

async fn write(State(node): State<SharedNode>, body: Bytes) -> Result<&'static str> {
    node.metrics().record_request();
    let outcome = decode::<ValueRequest>(&body).and_then(|request| {
        match node.write(request.value) {
            // Dropping the batch leaves replication running in the background.
            WriteResult::Accepted { .. } => Ok(OK),
            WriteResult::Rejected { leader } => Err(NodeError::NotLeader { leader }),
        }
    });
    if outcome.is_err() {
        node.metrics().record_failure();
    }
    outcome
}

async fn replicate(State(node): State<SharedNode>, body: Bytes) -> Result<&'static str> {
    let request: ValueRequest = decode(&body)?;
    node.replicate(request.value);
    Ok(OK)
}

async fn hosts(State(node): State<SharedNode>, body: Bytes) -> Result<&'static str> {
    let request: HostsRequest = decode(&body)?;
    node.set_membership(request.hosts);
    Ok(HOSTS_RECEIVED)
}

async fn ready(State(node): State<SharedNode>) -> &'static str {
    node.mark_ready();
    READY_RECEIVED
}

async fn leader(State(node): State<SharedNode>) -> &'static str {
    node.designate_leader();
    LEADER_RECEIVED
}

async fn metrics(State(node): State<SharedNode>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)],
        node.render_metrics(),
    )
}

async fn only_get() -> NodeError {
    NodeError::MethodNotAllowed("GET")
}

async fn only_post() -> NodeError {
    NodeError::MethodNotAllowed("POST")
}
