//! Cache storage port and the in-memory backend.

use crate::cache::CacheEntry;
use crate::error::ApiError;
use parking_lot::Mutex;
use std::collections::HashMap;

/// Storage for cache entries. TTL policy lives in `ResultCache`, not here.
pub trait CacheBackend: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<CacheEntry>, ApiError>;

    fn put(&self, entry: CacheEntry) -> Result<(), ApiError>;

    fn remove(&self, key: &str) -> Result<(), ApiError>;

    /// Remove all entries, returning how many were removed.
    fn clear(&self) -> Result<usize, ApiError>;
}

/// Process-local backend
#[derive(Debug, Default)]
pub struct MemoryCacheBackend {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl MemoryCacheBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl CacheBackend for MemoryCacheBackend {
    fn get(&self, key: &str) -> Result<Option<CacheEntry>, ApiError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn put(&self, entry: CacheEntry) -> Result<(), ApiError> {
        self.entries.lock().insert(entry.key.clone(), entry);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), ApiError> {
        self.entries.lock().remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<usize, ApiError> {
        let mut entries = self.entries.lock();
        let removed = entries.len();
        entries.clear();
        Ok(removed)
    }
}
