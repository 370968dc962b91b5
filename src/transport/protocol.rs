//! Wire Protocol
//!
//! Endpoint paths and Data Transfer Objects for the HTTP+JSON binding of the
//! inter-node protocol. Both sides use this module: `HttpTransport` builds
//! requests from it and the boundary adapter answers with the same shapes,
//! so the two can never drift apart.

use serde::{Deserialize, Serialize};

// --- Chord protocol endpoints ---

/// Routing step: ask a node for its best answer to "who owns this key".
pub const ENDPOINT_SUCCESSOR: &str = "/chord/successor";
/// Read a node's predecessor pointer (stabilization).
pub const ENDPOINT_PREDECESSOR: &str = "/chord/predecessor";
/// Join handshake entry point.
pub const ENDPOINT_JOIN: &str = "/chord/join";
/// Tell a node about a potential predecessor.
pub const ENDPOINT_NOTIFY: &str = "/chord/notify";
/// Liveness probe.
pub const ENDPOINT_KEEPALIVE: &str = "/chord/keepalive";
/// Full node state snapshot, for operators and tests.
pub const ENDPOINT_INFO: &str = "/chord/info";

// --- File endpoints ---

/// Client file surface (upload, list) and, with a trailing name, download
/// and delete.
pub const ENDPOINT_FILES: &str = "/files";
/// Peer-to-peer: store a file on the owner without re-routing.
pub const ENDPOINT_FORWARD: &str = "/files/forward";
/// Peer-to-peer: hand over every file in a key range (migration).
pub const ENDPOINT_TRANSFER: &str = "/files/transfer";
/// Peer-to-peer: read or delete strictly from the local store.
pub const ENDPOINT_LOCAL_FILES: &str = "/files/local";

// --- Chord DTOs ---

#[derive(Debug, Serialize, Deserialize)]
pub struct FindSuccessorRequest {
    /// The key being resolved.
    pub id: u64,
    /// Address of the node driving the lookup. Diagnostic only.
    pub requester: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FindSuccessorResponse {
    pub successor_id: u64,
    pub successor_addr: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PredecessorResponse {
    pub predecessor_id: Option<u64>,
    pub predecessor_addr: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NotifyRequest {
    pub predecessor_id: u64,
    pub predecessor_addr: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JoinRequest {
    pub id: u64,
    pub address: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JoinResponse {
    pub successor_id: u64,
    pub successor_addr: String,
}

/// Generic acknowledgement (`notify`, `keepalive`).
#[derive(Debug, Serialize, Deserialize)]
pub struct AckResponse {
    pub message: String,
}

/// Everything `/chord/info` reveals about a node.
#[derive(Debug, Serialize, Deserialize)]
pub struct NodeInfoResponse {
    pub id: u64,
    pub address: String,
    pub successor_id: u64,
    pub successor_addr: String,
    pub predecessor_id: Option<u64>,
    pub predecessor_addr: Option<String>,
    pub finger_table: Vec<u64>,
}

// --- File DTOs ---

#[derive(Debug, Serialize, Deserialize)]
pub struct TransferRequest {
    /// Exclusive lower bound of the key range.
    pub lo: u64,
    /// Inclusive upper bound of the key range.
    pub hi: u64,
}

/// One migrated file. `content` is standard base64 so the whole batch fits
/// in a JSON body.
#[derive(Debug, Serialize, Deserialize)]
pub struct TransferFile {
    pub filename: String,
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TransferResponse {
    pub files: Vec<TransferFile>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FileUploadResponse {
    pub message: String,
    pub filename: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FileDeleteResponse {
    pub message: String,
    pub filename: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FileListResponse {
    pub files: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predecessor_response_serializes_missing_peer_as_null() {
        let reply = PredecessorResponse {
            predecessor_id: None,
            predecessor_addr: None,
        };
        let json = serde_json::to_string(&reply).unwrap();
        assert_eq!(json, r#"{"predecessor_id":null,"predecessor_addr":null}"#);
    }

    #[test]
    fn test_find_successor_request_wire_shape() {
        let request: FindSuccessorRequest =
            serde_json::from_str(r#"{"id": 750, "requester": "node-a:5000"}"#).unwrap();
        assert_eq!(request.id, 750);
        assert_eq!(request.requester, "node-a:5000");
    }

    #[test]
    fn test_transfer_response_roundtrip() {
        let reply = TransferResponse {
            files: vec![TransferFile {
                filename: "x.txt".to_string(),
                content: "aGVsbG8=".to_string(),
            }],
        };
        let json = serde_json::to_string(&reply).unwrap();
        let parsed: TransferResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.files.len(), 1);
        assert_eq!(parsed.files[0].filename, "x.txt");
    }
}
