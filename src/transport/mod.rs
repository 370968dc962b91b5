//! Inter-Node Transport
//!
//! Request-response calls between ring members. The core depends only on
//! the [`Transport`] trait so tests can swap in an in-memory fake; the
//! production binding is [`http::HttpTransport`], which speaks the HTTP+JSON
//! protocol defined in [`protocol`].
//!
//! Transport is stateless per call: every operation names its target address
//! explicitly and concurrent calls are safe.

pub mod http;
pub mod protocol;

use async_trait::async_trait;
use thiserror::Error;

use crate::chord::node::NodeInfo;

/// Any RPC failure: connect refusal, deadline, or an error status from the
/// peer. Never fatal. Stabilization skips the peer and client lookups
/// surface the error.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request to {target} failed: {source}")]
    Request {
        target: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{target} answered {status}")]
    Status { target: String, status: u16 },
    #[error("{target} is unreachable")]
    Unreachable { target: String },
    #[error("malformed reply from {target}: {detail}")]
    Malformed { target: String, detail: String },
}

pub type TransportResult<T> = Result<T, TransportError>;

/// The calls one node can make against another.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Ask `target` for its best answer to "who owns `key`": itself, its
    /// successor, or the next hop to query.
    async fn find_successor(
        &self,
        target: &str,
        key: u64,
        requester: &str,
    ) -> TransportResult<NodeInfo>;

    /// Current predecessor of `target`, if it has one.
    async fn get_predecessor(&self, target: &str) -> TransportResult<Option<NodeInfo>>;

    /// Tell `target` that `candidate` believes it precedes it.
    async fn notify(&self, target: &str, candidate: &NodeInfo) -> TransportResult<()>;

    /// Join the ring through `target`; returns the joiner's successor.
    async fn join(&self, target: &str, joiner: &NodeInfo) -> TransportResult<NodeInfo>;

    /// Liveness probe.
    async fn ping(&self, target: &str) -> TransportResult<()>;

    /// Pull every file of `target` whose key falls in `(lo, hi]`. The
    /// target hands the files over and drops them; this is a move.
    async fn transfer_range(
        &self,
        target: &str,
        lo: u64,
        hi: u64,
    ) -> TransportResult<Vec<(String, Vec<u8>)>>;

    /// Hand a file to the node that owns its key. The receiver stores it
    /// without re-checking responsibility.
    async fn forward_file(
        &self,
        target: &str,
        filename: &str,
        content: Vec<u8>,
    ) -> TransportResult<()>;

    /// Fetch a file from `target`'s local store only.
    async fn get_file(&self, target: &str, filename: &str) -> TransportResult<Option<Vec<u8>>>;

    /// Delete a file from `target`'s local store only. True iff a file was
    /// removed.
    async fn delete_file(&self, target: &str, filename: &str) -> TransportResult<bool>;
}
