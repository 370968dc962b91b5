//! Blob Storage
//!
//! Per-node persistence of file blobs keyed by filename. The core only
//! depends on the [`StorageBackend`] trait; [`local::LocalStorageBackend`]
//! persists to a flat directory and [`memory::MemoryStorageBackend`] keeps
//! everything in RAM for tests.
//!
//! Filenames reach the backend already sanitized. The boundary adapter is
//! responsible for rejecting path traversal before calling in here.

pub mod local;
pub mod memory;


use async_trait::async_trait;
use std::io;

/// Byte-blob store keyed by filename.
///
/// Implementations must tolerate concurrent operations on distinct names;
/// same-name races resolve last-writer-wins.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Store `content` under `filename`, atomically replacing any previous
    /// version.
    async fn save(&self, filename: &str, content: &[u8]) -> io::Result<()>;

    /// Read a file back, or `None` if it does not exist.
    async fn get(&self, filename: &str) -> io::Result<Option<Vec<u8>>>;

    /// Remove a file. True iff something was removed.
    async fn delete(&self, filename: &str) -> io::Result<bool>;

    /// All stored filenames, in no particular order.
    async fn list(&self) -> io::Result<Vec<String>>;

    /// Files whose key falls in the half-open circular range `(lo, hi]`.
    /// This is what an outbound migration hands over.
    async fn scan_range(&self, lo: u64, hi: u64) -> io::Result<Vec<(String, Vec<u8>)>>;
}
