//! Error taxonomy shared by the core and the HTTP surface.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::protocol::{NotLeaderResponse, NOT_LEADER};

#[derive(Error, Debug)]
pub enum NodeError {
    /// The readiness gate is still closed.
    #[error("Not ready yet")]
    NotReady,

    /// Writes are only accepted by the leader; `leader` is the best known
    /// leader address, if a membership push named one.
    #[error("Not the leader, current leader is {leader:?}")]
    NotLeader { leader: Option<String> },

    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    #[error("Only {0} is allowed")]
    MethodNotAllowed(&'static str),

    #[error("Replication to {peer} failed: {reason}")]
    ReplicationDelivery { peer: String, reason: String },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, NodeError>;

impl NodeError {
    pub fn status(&self) -> StatusCode {
        match self {
            NodeError::NotReady => StatusCode::SERVICE_UNAVAILABLE,
            NodeError::NotLeader { .. } | NodeError::MalformedRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            NodeError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            NodeError::ReplicationDelivery { .. } => StatusCode::BAD_GATEWAY,
            NodeError::Transport(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<serde_json::Error> for NodeError {
    fn from(err: serde_json::Error) -> Self {
        NodeError::MalformedRequest(err.to_string())
    }
}

impl IntoResponse for NodeError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            NodeError::NotLeader { leader } => (
                status,
                Json(NotLeaderResponse {
                    leader: leader.unwrap_or_default(),
                    response: NOT_LEADER.to_string(),
                }),
            )
                .into_response(),
            other => (status, other.to_string()).into_response(),
        }
    }
}
