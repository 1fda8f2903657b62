//! CLI output: result envelope, text rendering and exit codes.

use crate::cli::parse::OutputFormat;
use crate::error::{ApiError, ErrorKind, ErrorReport};
use crate::profile::Profile;
use crate::script::{AggregateResult, RollbackAction};
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use owo_colors::OwoColorize;
use serde_json::{json, Value};

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_CONNECTION: i32 = 1;
pub const EXIT_AUTH: i32 = 2;
pub const EXIT_FAILURE: i32 = 3;

/// What a command produced
#[derive(Debug, Clone)]
pub enum CommandOutput {
    /// Raw server payload
    Value(Value),
    /// Masked profiles
    Profiles(Vec<Profile>),
    Script(AggregateResult),
    CacheCleared(usize),
}

impl CommandOutput {
    /// Whether the command as a whole succeeded.
    pub fn success(&self) -> bool {
        match self {
            CommandOutput::Script(result) => result.success,
            _ => true,
        }
    }

    pub fn data(&self) -> Value {
        match self {
            CommandOutput::Value(value) => value.clone(),
            CommandOutput::Profiles(profiles) => json!(profiles),
            CommandOutput::Script(result) => json!(result),
            CommandOutput::CacheCleared(removed) => json!({ "removed": removed }),
        }
    }

    pub fn exit_code(&self) -> i32 {
        if self.success() {
            EXIT_SUCCESS
        } else {
            EXIT_FAILURE
        }
    }
}

/// `{"success": true, "data": ...}`
pub fn success_envelope(output: &CommandOutput) -> Value {
    json!({ "success": output.success(), "data": output.data() })
}

/// `{"success": false, "error": {kind, message, profile_name, retryable}}`
pub fn error_envelope(error: &ApiError, profile_name: Option<&str>) -> Value {
    json!({ "success": false, "error": ErrorReport::new(error, profile_name) })
}

/// Process exit code for an error.
pub fn exit_code_for(error: &ApiError) -> i32 {
    match error.kind() {
        ErrorKind::Connection => EXIT_CONNECTION,
        ErrorKind::Auth => EXIT_AUTH,
        _ => EXIT_FAILURE,
    }
}

/// Map domain/service errors to a string for CLI output.
pub fn map_error(error: &ApiError) -> String {
    error.to_string()
}

pub fn render_output(output: &CommandOutput, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => pretty(&success_envelope(output)),
        OutputFormat::Text => match output {
            CommandOutput::Value(value) => match value {
                Value::String(s) => s.clone(),
                other => pretty(other),
            },
            CommandOutput::Profiles(profiles) => format_profiles_text(profiles),
            CommandOutput::Script(result) => format_script_text(result),
            CommandOutput::CacheCleared(removed) => {
                format!("Removed {} cached result(s)", removed)
            }
        },
    }
}

pub fn render_error(error: &ApiError, profile_name: Option<&str>, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => pretty(&error_envelope(error, profile_name)),
        OutputFormat::Text => {
            let mut out = format!("{} {}", "error:".red().bold(), map_error(error));
            if let Some(profile) = profile_name {
                out.push_str(&format!("\n  profile: {}", profile));
            }
            if error.is_retryable() {
                out.push_str(&format!("\n  {}", "retryable".yellow()));
            }
            out
        }
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Profile table for text output; secrets are expected to be masked already.
pub fn format_profiles_text(profiles: &[Profile]) -> String {
    if profiles.is_empty() {
        return "No profiles configured.".to_string();
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Name", "URL", "Database", "User", "Flags"]);
    for profile in profiles {
        let mut flags = Vec::new();
        if profile.default {
            flags.push("default");
        }
        if profile.readonly {
            flags.push("readonly");
        }
        if profile.protected {
            flags.push("protected");
        }
        table.add_row(vec![
            profile.name.clone(),
            profile.endpoint(),
            profile.db.clone(),
            profile.username.clone(),
            flags.join(", "),
        ]);
    }
    table.to_string()
}

/// Per-step summary of a script run.
pub fn format_script_text(result: &AggregateResult) -> String {
    let mut out = String::new();
    for step_id in &result.order {
        let Some(step) = result.get(step_id) else {
            continue;
        };
        if step.success {
            out.push_str(&format!(
                "{} {} ({} ms)\n",
                "ok".green(),
                step_id,
                step.duration_ms
            ));
        } else {
            let message = step
                .error
                .as_ref()
                .map(|e| e.message.as_str())
                .unwrap_or_default();
            out.push_str(&format!("{} {}: {}\n", "failed".red(), step_id, message));
        }
    }
    for entry in &result.rollback {
        let action = match entry.action {
            RollbackAction::Deleted => "deleted",
            RollbackAction::Skipped => "skipped",
            RollbackAction::Failed => "rollback failed",
        };
        out.push_str(&format!("  {} {} {:?}\n", action.yellow(), entry.step, entry.ids));
    }
    out.push_str(&format!(
        "{:?} in {} ms",
        result.state, result.duration_ms
    ));
    out
}
