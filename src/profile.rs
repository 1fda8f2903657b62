//! Connection profiles
//!
//! A profile is a named connection identity (endpoint, database, credentials) with
//! safety flags. Profiles are loaded once per process and never mutated during a run.

use crate::context::Context;
use serde::{Deserialize, Serialize};

pub mod registry;

pub use registry::ProfileRegistry;

/// Named remote-endpoint connection identity with safety flags
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// Unique profile name
    pub name: String,

    /// Server URL; `https://` is assumed when no scheme is given
    pub url: String,

    /// Database (tenant) name
    pub db: String,

    /// Login name
    pub username: String,

    /// Password or API key
    #[serde(default)]
    pub password: String,

    /// Per-call timeout in seconds
    #[serde(default = "default_timeout", rename = "timeout")]
    pub timeout_secs: u64,

    /// Verify TLS certificates
    #[serde(default = "default_true")]
    pub verify_ssl: bool,

    /// Block mutations unless explicitly overridden
    #[serde(default)]
    pub readonly: bool,

    /// Block mutations unconditionally
    #[serde(default)]
    pub protected: bool,

    /// Candidate for default selection
    #[serde(default)]
    pub default: bool,

    /// Default context sent with every call on this profile
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Context>,
}

fn default_timeout() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

impl Profile {
    /// Create a profile with default flags.
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        db: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            db: db.into(),
            username: username.into(),
            password: password.into(),
            timeout_secs: default_timeout(),
            verify_ssl: true,
            readonly: false,
            protected: false,
            default: false,
            context: None,
        }
    }

    /// URL with a scheme and without trailing slashes.
    pub fn endpoint(&self) -> String {
        let trimmed = self.url.trim().trim_end_matches('/');
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            trimmed.to_string()
        } else {
            format!("https://{}", trimmed)
        }
    }

    /// Validate profile fields
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Profile name cannot be empty".to_string());
        }
        if self.url.trim().is_empty() {
            return Err("URL cannot be empty".to_string());
        }
        if self.db.trim().is_empty() {
            return Err("Database cannot be empty".to_string());
        }
        if self.username.trim().is_empty() {
            return Err("Username cannot be empty".to_string());
        }
        if self.timeout_secs == 0 {
            return Err("Timeout must be greater than zero".to_string());
        }
        Ok(())
    }

    /// Display form with the secret masked.
    pub fn masked(&self) -> Profile {
        let mut masked = self.clone();
        masked.password = "***".to_string();
        masked
    }
}
