//! Node Orchestration
//!
//! [`node_service::NodeService`] ties the pure Chord state machine to the
//! transport and the storage backend: boot and join, iterative routing, the
//! periodic stabilization task, key migration, and the client-facing file
//! operations. [`handlers`] is the boundary adapter that exposes all of it
//! over HTTP.

pub mod handlers;
pub mod node_service;


use thiserror::Error;

use crate::transport::TransportError;

/// Everything that can go wrong above the pure core.
///
/// Transport failures are always recovered locally in stabilization and
/// surfaced with a gateway status on client routes; storage failures on the
/// responsible node surface directly. The boundary adapter is the only
/// layer that turns these into wire responses.
#[derive(Debug, Error)]
pub enum ChordError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Storage miss or routing-exhausted lookup.
    #[error("file not found")]
    NotFound,

    /// Bad filename, bad id, malformed request.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Join attempted by a node that is already part of a ring.
    #[error("node already joined a ring")]
    AlreadyBootstrapped,

    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// Invariant violation; the node should not keep running on this state.
    #[error("internal error: {0}")]
    Internal(String),
}
