//! Result Cache
//!
//! Memoizes cacheable read-only calls. Keys are blake3 digests over the canonical
//! JSON of the call (endpoint, database, model, method, arguments, effective
//! context). `serde_json::Map` is ordered by key, so the canonical form is
//! deterministic regardless of insertion order.
//!
//! Backend failures never fail a call: a failed lookup is a miss and a failed
//! store is logged and dropped.

use crate::context::Context;
use crate::error::ApiError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Duration;

pub mod backend;
pub mod disk;

pub use backend::{CacheBackend, MemoryCacheBackend};
pub use disk::SledCacheBackend;

/// Default time-to-live for cached results (24 hours)
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// A cached call result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub value: Value,
    pub created_at: DateTime<Utc>,
    pub ttl_secs: u64,
}

impl CacheEntry {
    pub fn new(key: String, value: Value, ttl: Duration) -> Self {
        Self {
            key,
            value,
            created_at: Utc::now(),
            ttl_secs: ttl.as_secs(),
        }
    }

    /// A TTL too large for `chrono` never expires.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        let Some(ttl) = i64::try_from(self.ttl_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
        else {
            return false;
        };
        now.signed_duration_since(self.created_at) >= ttl
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

/// Inputs that identify a cacheable call.
#[derive(Debug, Clone, Copy)]
pub struct CacheKeyInput<'a> {
    pub endpoint: &'a str,
    pub db: &'a str,
    pub model: &'a str,
    pub method: &'a str,
    pub args: &'a [Value],
    pub kwargs: &'a Map<String, Value>,
    pub context: &'a Context,
}

/// Deterministic digest of a call. `kwargs["context"]` is ignored; the effective
/// context is hashed instead.
pub fn compute_cache_key(input: &CacheKeyInput<'_>) -> String {
    let mut kwargs = input.kwargs.clone();
    kwargs.remove("context");

    let canonical = json!({
        "endpoint": input.endpoint,
        "db": input.db,
        "model": input.model,
        "method": input.method,
        "args": input.args,
        "kwargs": kwargs,
        "context": input.context,
    });

    let bytes = canonical.to_string();
    hex::encode(blake3::hash(bytes.as_bytes()).as_bytes())
}

/// TTL cache over a pluggable backend
#[derive(Clone)]
pub struct ResultCache {
    backend: Arc<dyn CacheBackend>,
    ttl: Duration,
}

impl ResultCache {
    pub fn new(backend: Arc<dyn CacheBackend>, ttl: Duration) -> Self {
        Self { backend, ttl }
    }

    /// Process-local cache with the default TTL.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryCacheBackend::new()), DEFAULT_TTL)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return a live entry's value. Expired entries are evicted.
    pub fn get(&self, key: &str) -> Option<Value> {
        let entry = match self.backend.get(key) {
            Ok(Some(entry)) => entry,
            Ok(None) => {
                tracing::debug!(key = %key, "Cache miss");
                return None;
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cache lookup failed; treating as miss");
                return None;
            }
        };

        if entry.is_expired() {
            tracing::debug!(key = %key, created_at = %entry.created_at, "Cache entry expired");
            if let Err(e) = self.backend.remove(key) {
                tracing::warn!(key = %key, error = %e, "Failed to evict expired cache entry");
            }
            return None;
        }

        tracing::debug!(key = %key, "Cache hit");
        Some(entry.value)
    }

    /// Store a value under the cache TTL.
    pub fn put(&self, key: &str, value: Value) {
        let entry = CacheEntry::new(key.to_string(), value, self.ttl);
        if let Err(e) = self.backend.put(entry) {
            tracing::warn!(key = %key, error = %e, "Failed to store cache entry");
        }
    }

    /// Drop one entry.
    pub fn invalidate(&self, key: &str) -> Result<(), ApiError> {
        self.backend.remove(key)
    }

    /// Drop every entry. Returns the number of entries removed.
    pub fn clear(&self) -> Result<usize, ApiError> {
        let removed = self.backend.clear()?;
        tracing::info!(removed, "Cache cleared");
        Ok(removed)
    }
}

impl std::fmt::Debug for ResultCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultCache").field("ttl", &self.ttl).finish()
    }
}
