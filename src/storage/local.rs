use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::fs;

use super::StorageBackend;
use crate::chord::hashing::{dht_hash, in_half_open};

/// Flat-directory file store: one file per blob, named after the blob.
///
/// Writes go through a hidden temp file and a rename, so readers never see
/// a half-written blob and same-name races resolve to the last writer.
pub struct LocalStorageBackend {
    base_path: PathBuf,
    m_bits: u8,
}

impl LocalStorageBackend {
    pub fn new(base_path: impl Into<PathBuf>, m_bits: u8) -> Self {
        Self {
            base_path: base_path.into(),
            m_bits,
        }
    }

    /// Create the storage directory if it doesn't exist.
    pub async fn initialize(&self) -> io::Result<()> {
        fs::create_dir_all(&self.base_path).await?;
        tracing::info!("Storage directory ready: {}", self.base_path.display());
        Ok(())
    }

    fn file_path(&self, filename: &str) -> PathBuf {
        // The adapter already validated the name; keeping only the final
        // component makes a stray separator harmless anyway.
        let safe_name = Path::new(filename)
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        self.base_path.join(safe_name)
    }
}

#[async_trait]
impl StorageBackend for LocalStorageBackend {
    async fn save(&self, filename: &str, content: &[u8]) -> io::Result<()> {
        let dest = self.file_path(filename);
        let safe_name = dest
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        // Hidden temp name: blob names never start with a dot, so temp
        // files can't collide with blobs and `list` skips them.
        let tmp = self.base_path.join(format!(".{}.tmp.{}", safe_name, ts));

        fs::write(&tmp, content).await?;
        fs::rename(&tmp, &dest).await?;

        tracing::debug!("Saved file {} ({} bytes)", filename, content.len());
        Ok(())
    }

    async fn get(&self, filename: &str) -> io::Result<Option<Vec<u8>>> {
        match fs::read(self.file_path(filename)).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn delete(&self, filename: &str) -> io::Result<bool> {
        match fs::remove_file(self.file_path(filename)).await {
            Ok(()) => {
                tracing::debug!("Deleted file {}", filename);
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn list(&self) -> io::Result<Vec<String>> {
        let mut names = Vec::new();
        let mut entries = fs::read_dir(&self.base_path).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            if let Ok(name) = entry.file_name().into_string() {
                if !name.starts_with('.') {
                    names.push(name);
                }
            }
        }
        Ok(names)
    }

    async fn scan_range(&self, lo: u64, hi: u64) -> io::Result<Vec<(String, Vec<u8>)>> {
        let mut files = Vec::new();
        for name in self.list().await? {
            if !in_half_open(lo, dht_hash(name.as_bytes(), self.m_bits), hi) {
                continue;
            }
            if let Some(content) = self.get(&name).await? {
                files.push((name, content));
            }
        }
        Ok(files)
    }
}
