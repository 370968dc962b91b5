use async_trait::async_trait;
use dashmap::DashMap;
use std::io;

use super::StorageBackend;
use crate::chord::hashing::{dht_hash, in_half_open};

/// In-memory store used by tests and single-process experiments. Never
/// fails.
pub struct MemoryStorageBackend {
    files: DashMap<String, Vec<u8>>,
    m_bits: u8,
}

impl MemoryStorageBackend {
    pub fn new(m_bits: u8) -> Self {
        Self {
            files: DashMap::new(),
            m_bits,
        }
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[async_trait]
impl StorageBackend for MemoryStorageBackend {
    async fn save(&self, filename: &str, content: &[u8]) -> io::Result<()> {
        self.files.insert(filename.to_string(), content.to_vec());
        Ok(())
    }

    async fn get(&self, filename: &str) -> io::Result<Option<Vec<u8>>> {
        Ok(self.files.get(filename).map(|entry| entry.value().clone()))
    }

    async fn delete(&self, filename: &str) -> io::Result<bool> {
        Ok(self.files.remove(filename).is_some())
    }

    async fn list(&self) -> io::Result<Vec<String>> {
        Ok(self.files.iter().map(|entry| entry.key().clone()).collect())
    }

    async fn scan_range(&self, lo: u64, hi: u64) -> io::Result<Vec<(String, Vec<u8>)>> {
        Ok(self
            .files
            .iter()
            .filter(|entry| in_half_open(lo, dht_hash(entry.key().as_bytes(), self.m_bits), hi))
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect())
    }
}
