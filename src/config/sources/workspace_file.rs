//! Workspace config file source: <workspace>/.odoo-agent.toml

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::ConfigError;
use config::{File, FileFormat};
use std::path::Path;

pub const WORKSPACE_FILE: &str = ".odoo-agent.toml";

/// Add the workspace config file to builder. It overrides the global file.
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
    workspace_root: &Path,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let path = workspace_root.join(WORKSPACE_FILE);
    if !path.exists() {
        return Ok(builder);
    }
    Ok(builder.add_source(
        File::from(path.as_path())
            .format(FileFormat::Toml)
            .required(false),
    ))
}
