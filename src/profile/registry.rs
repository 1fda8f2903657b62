//! Profile registry: ordered, in-memory set of loaded profiles.

use crate::error::ApiError;
use crate::profile::Profile;

/// Profiles in declaration order.
///
/// Order matters: when several profiles are marked default, the first one declared wins.
#[derive(Debug, Clone, Default)]
pub struct ProfileRegistry {
    profiles: Vec<Profile>,
}

impl ProfileRegistry {
    pub fn new() -> Self {
        Self {
            profiles: Vec::new(),
        }
    }

    /// Build a registry from configured profiles, rejecting duplicates and invalid entries.
    pub fn from_profiles(profiles: Vec<Profile>) -> Result<Self, ApiError> {
        let mut registry = Self::new();
        for profile in profiles {
            registry.register(profile)?;
        }
        Ok(registry)
    }

    /// Register a profile; names must be unique.
    pub fn register(&mut self, profile: Profile) -> Result<(), ApiError> {
        profile
            .validate()
            .map_err(|e| ApiError::ConfigError(format!("Profile '{}': {}", profile.name, e)))?;
        if self.get(&profile.name).is_some() {
            return Err(ApiError::ConfigError(format!(
                "Duplicate profile name '{}'",
                profile.name
            )));
        }
        self.profiles.push(profile);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Profile> {
        self.profiles.iter().find(|p| p.name == name)
    }

    pub fn list(&self) -> &[Profile] {
        &self.profiles
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// The default profile: first marked `default`, else the first declared.
    pub fn default_profile(&self) -> Option<&Profile> {
        let mut defaults = self.profiles.iter().filter(|p| p.default);
        if let Some(first) = defaults.next() {
            let others: Vec<&str> = defaults.map(|p| p.name.as_str()).collect();
            if !others.is_empty() {
                tracing::warn!(
                    selected = %first.name,
                    ignored = ?others,
                    "Several profiles are marked default; using the first one"
                );
            }
            return Some(first);
        }
        self.profiles.first()
    }

    /// Resolve the active profile: explicit name, else the default profile.
    pub fn resolve(&self, name: Option<&str>) -> Result<&Profile, ApiError> {
        match name {
            Some(name) => self
                .get(name)
                .ok_or_else(|| ApiError::ProfileNotFound(name.to_string())),
            None => self.default_profile().ok_or_else(|| {
                ApiError::ConfigError(
                    "No profiles configured. Add a [[profiles]] entry to the config file"
                        .to_string(),
                )
            }),
        }
    }
}
