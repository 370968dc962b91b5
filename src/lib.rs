//! Chord Distributed File Store Library
//!
//! This library crate defines the modules that make up one node of the
//! distributed file store. It is the foundation for the binary executable
//! (`main.rs`) and for the in-process multi-node tests.
//!
//! ## Architecture Modules
//! The system is composed of four loosely coupled subsystems plus
//! configuration:
//!
//! - **`chord`**: The pure overlay core. Identifier hashing, circular
//!   between-ness, the finger routing table, and the per-node state machine
//!   with the join/notify/stabilization decision rules. No I/O.
//! - **`transport`**: The inter-node call surface. An abstract trait so the
//!   core is testable with in-memory fakes, plus the HTTP+JSON binding and
//!   the shared wire protocol definitions.
//! - **`storage`**: Blob persistence keyed by filename, with a flat-directory
//!   backend for production and an in-memory backend for tests.
//! - **`service`**: Orchestration. `NodeService` drives the core with
//!   transport and storage side effects (boot/join, iterative routing, the
//!   stabilization task, key migration, client file operations), and the
//!   boundary adapter exposes it all over HTTP.
//! - **`config`**: Environment-variable settings (`CHORD_*`).

pub mod chord;
pub mod config;
pub mod service;
pub mod storage;
pub mod transport;
