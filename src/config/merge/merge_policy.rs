//! Merge rules: defaults, override order, conflict handling.
//!
//! Later sources replace earlier values key by key. Arrays are replaced whole, so a
//! workspace file that declares `[[profiles]]` supersedes the global profile list.

use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default("cache.enabled", true)?
        .set_default("cache.ttl_secs", crate::cache::DEFAULT_TTL.as_secs() as i64)?
        .set_default("cache.backend", "disk")?
        .set_default("logging.level", "warn")?
        .set_default("logging.format", "text")?
        .set_default("logging.output", "stderr")
}
