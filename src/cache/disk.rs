//! Sled-backed cache storage, shared across process invocations.
//!
//! Entries are stored as JSON because cached values are arbitrary JSON documents.

use crate::cache::{CacheBackend, CacheEntry};
use crate::error::ApiError;
use std::path::Path;

pub struct SledCacheBackend {
    db: sled::Db,
}

impl SledCacheBackend {
    /// Open (or create) a cache database at the given directory.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ApiError> {
        let path = path.as_ref();
        std::fs::create_dir_all(path).map_err(|e| {
            ApiError::Storage(format!(
                "Failed to create cache directory {}: {}",
                path.display(),
                e
            ))
        })?;
        let db = sled::open(path)
            .map_err(|e| ApiError::Storage(format!("Failed to open cache database: {}", e)))?;
        Ok(Self { db })
    }

    pub fn len(&self) -> usize {
        self.db.len()
    }

    pub fn is_empty(&self) -> bool {
        self.db.is_empty()
    }
}

impl CacheBackend for SledCacheBackend {
    fn get(&self, key: &str) -> Result<Option<CacheEntry>, ApiError> {
        let Some(bytes) = self
            .db
            .get(key.as_bytes())
            .map_err(|e| ApiError::Storage(format!("Failed to read cache entry: {}", e)))?
        else {
            return Ok(None);
        };
        let entry: CacheEntry = serde_json::from_slice(&bytes)
            .map_err(|e| ApiError::Storage(format!("Corrupt cache entry {}: {}", key, e)))?;
        Ok(Some(entry))
    }

    fn put(&self, entry: CacheEntry) -> Result<(), ApiError> {
        let bytes = serde_json::to_vec(&entry)
            .map_err(|e| ApiError::Storage(format!("Failed to encode cache entry: {}", e)))?;
        self.db
            .insert(entry.key.as_bytes(), bytes)
            .map_err(|e| ApiError::Storage(format!("Failed to write cache entry: {}", e)))?;
        self.db
            .flush()
            .map_err(|e| ApiError::Storage(format!("Failed to flush cache: {}", e)))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), ApiError> {
        self.db
            .remove(key.as_bytes())
            .map_err(|e| ApiError::Storage(format!("Failed to remove cache entry: {}", e)))?;
        Ok(())
    }

    fn clear(&self) -> Result<usize, ApiError> {
        let removed = self.db.len();
        self.db
            .clear()
            .map_err(|e| ApiError::Storage(format!("Failed to clear cache: {}", e)))?;
        self.db
            .flush()
            .map_err(|e| ApiError::Storage(format!("Failed to flush cache: {}", e)))?;
        Ok(removed)
    }
}
