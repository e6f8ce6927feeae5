//! JSON bodies exchanged with clients, peers, and the orchestrator.
//!
//! Field names are PascalCase on the wire (`{"Value": 42}`). Bodies are decoded
//! from raw bytes so callers that omit `Content-Type` are still understood.

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::Result;
use crate::membership::Peer;

pub const OK: &str = "ok";
pub const NOT_LEADER: &str = "I am not the leader";
pub const HOSTS_RECEIVED: &str = "Hosts received";
pub const READY_RECEIVED: &str = "Ready to serve requests";
pub const LEADER_RECEIVED: &str = "This is the leader";

/// Body of `POST /write` and `POST /replicate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ValueRequest {
    pub value: i64,
}

/// Body returned by `GET /read`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReadResponse {
    pub response: i64,
}

/// Body of `POST /hosts`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HostsRequest {
    #[serde(default)]
    pub hosts: Vec<Peer>,
}

/// Redirect hint returned when a follower refuses a write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NotLeaderResponse {
    pub leader: String,
    pub response: String,
}

pub fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    Ok(serde_json::from_slice(body)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NodeError;

    #[test]
    fn value_request_uses_pascal_case() {
        let parsed: ValueRequest = decode(br#"{"Value":42}"#).unwrap();
        assert_eq!(parsed, ValueRequest { value: 42 });
        assert_eq!(
            serde_json::to_string(&ReadResponse { response: 7 }).unwrap(),
            r#"{"Response":7}"#
        );
    }

    #[test]
    fn hosts_request_defaults_missing_leader_flag() {
        let parsed: HostsRequest =
            decode(br#"{"Hosts":[{"Host":"a:1","IsLeader":true},{"Host":"b:2"}]}"#).unwrap();
        assert_eq!(
            parsed.hosts,
            vec![Peer::new("a:1", true), Peer::new("b:2", false)]
        );
    }

    #[test]
    fn undecodable_bodies_are_malformed() {
        let bodies: [&[u8]; 4] = [b"", b"{", br#"{"Value":"x"}"#, br#"{"Other":1}"#];
        for body in bodies {
            let err = decode::<ValueRequest>(body).unwrap_err();
            assert!(matches!(err, NodeError::MalformedRequest(_)), "{body:?}");
        }
    }
}
