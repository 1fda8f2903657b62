//! Config loader: assembles sources in precedence order and deserializes the result.

use crate::config::merge::merge_policy::builder_with_defaults;
use crate::config::sources::{global_file, workspace_file};
use crate::config::AppConfig;
use crate::error::ApiError;
use config::{File, FileFormat};
use std::path::Path;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for a workspace.
    ///
    /// Precedence (lowest to highest): defaults, global file, workspace file.
    pub fn load(workspace_root: &Path) -> Result<AppConfig, ApiError> {
        let builder = builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = workspace_file::add_to_builder(builder, workspace_root)?;
        let config: AppConfig = builder.build()?.try_deserialize()?;
        tracing::debug!(
            workspace = %workspace_root.display(),
            profiles = config.profiles.len(),
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Load configuration from one explicit file on top of the defaults.
    pub fn load_from_file(path: &Path) -> Result<AppConfig, ApiError> {
        if !path.exists() {
            return Err(ApiError::ConfigError(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        let config: AppConfig = builder_with_defaults()?
            .add_source(File::from(path).format(FileFormat::Toml).required(true))
            .build()?
            .try_deserialize()?;
        tracing::debug!(path = %path.display(), profiles = config.profiles.len(), "Configuration loaded");
        Ok(config)
    }
}
