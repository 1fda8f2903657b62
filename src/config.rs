//! Configuration System
//!
//! Profiles, the global context, cache and logging settings, layered from built-in
//! defaults, the global config file and the workspace config file. An explicit file
//! given on the command line replaces both files.

use crate::cache::{MemoryCacheBackend, ResultCache, SledCacheBackend, DEFAULT_TTL};
use crate::context::Context;
use crate::error::ApiError;
use crate::logging::LoggingConfig;
use crate::profile::registry::ProfileRegistry;
use crate::profile::Profile;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;
pub use sources::global_file::global_config_path;
pub use sources::workspace_file::WORKSPACE_FILE;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Connection profiles, in declaration order
    #[serde(default)]
    pub profiles: Vec<Profile>,

    /// Global context applied to every call
    #[serde(default)]
    pub context: Option<Context>,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheBackendKind {
    /// Sled database shared across invocations
    Disk,
    /// Process-local map
    Memory,
}

/// Result cache settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    #[serde(default = "default_backend")]
    pub backend: CacheBackendKind,

    /// Cache directory; defaults to the platform cache dir
    #[serde(default)]
    pub path: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}

fn default_ttl_secs() -> u64 {
    DEFAULT_TTL.as_secs()
}

fn default_backend() -> CacheBackendKind {
    CacheBackendKind::Disk
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            ttl_secs: default_ttl_secs(),
            backend: default_backend(),
            path: None,
        }
    }
}

impl CacheConfig {
    /// Directory of the disk cache.
    pub fn resolved_path(&self) -> Result<PathBuf, ApiError> {
        if let Some(path) = &self.path {
            return Ok(path.clone());
        }
        ProjectDirs::from("", "", "odoo-agent")
            .map(|dirs| dirs.cache_dir().join("results"))
            .ok_or_else(|| {
                ApiError::ConfigError(
                    "Cannot determine a cache directory; set cache.path".to_string(),
                )
            })
    }

    /// Build the configured cache, or `None` when caching is disabled.
    pub fn build(&self) -> Result<Option<ResultCache>, ApiError> {
        if !self.enabled {
            return Ok(None);
        }
        let ttl = Duration::from_secs(self.ttl_secs);
        let cache = match self.backend {
            CacheBackendKind::Memory => ResultCache::new(Arc::new(MemoryCacheBackend::new()), ttl),
            CacheBackendKind::Disk => {
                let backend = SledCacheBackend::open(self.resolved_path()?)?;
                ResultCache::new(Arc::new(backend), ttl)
            }
        };
        Ok(Some(cache))
    }
}

impl AppConfig {
    /// Validated profile registry.
    pub fn registry(&self) -> Result<ProfileRegistry, ApiError> {
        ProfileRegistry::from_profiles(self.profiles.clone())
    }

    pub fn global_context(&self) -> Option<&Context> {
        self.context.as_ref().filter(|c| !c.is_empty())
    }
}
