//! Script documents: a versioned, ordered list of steps.
//!
//! Documents are read from JSON or TOML and validated as a whole before any step
//! runs. Every problem found here is a definition error.

use crate::context::Context;
use crate::error::ApiError;
use crate::script::reference::{collect_references, is_valid_step_id, Reference};
use crate::script::OnError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::path::Path;

/// The only document version understood.
pub const SUPPORTED_VERSION: u64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptAction {
    Search,
    SearchRead,
    SearchCount,
    Read,
    Create,
    Write,
    Unlink,
    FieldsGet,
    NameSearch,
    Execute,
}

impl ScriptAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScriptAction::Search => "search",
            ScriptAction::SearchRead => "search_read",
            ScriptAction::SearchCount => "search_count",
            ScriptAction::Read => "read",
            ScriptAction::Create => "create",
            ScriptAction::Write => "write",
            ScriptAction::Unlink => "unlink",
            ScriptAction::FieldsGet => "fields_get",
            ScriptAction::NameSearch => "name_search",
            ScriptAction::Execute => "execute",
        }
    }

    fn requires_ids(&self) -> bool {
        matches!(
            self,
            ScriptAction::Read | ScriptAction::Write | ScriptAction::Unlink
        )
    }

    fn requires_values(&self) -> bool {
        matches!(self, ScriptAction::Create | ScriptAction::Write)
    }
}

impl std::fmt::Display for ScriptAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One step of a script
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScriptStep {
    pub id: String,
    pub action: ScriptAction,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ids: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<String>,
    /// Search term for `name_search`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Method for `execute`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kwargs: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Context>,
}

impl ScriptStep {
    /// Argument trees that may carry references, in a fixed order.
    fn argument_trees(&self) -> impl Iterator<Item = &Value> {
        self.domain
            .iter()
            .chain(self.ids.iter())
            .chain(self.values.iter())
            .chain(self.fields.iter())
            .chain(self.args.iter().flatten())
            .chain(self.kwargs.iter().flat_map(|kwargs| kwargs.values()))
    }

    /// Every reference used by this step.
    pub fn references(&self) -> Vec<Reference> {
        let mut references = Vec::new();
        for tree in self.argument_trees() {
            collect_references(tree, &mut references);
        }
        references
    }
}

/// A versioned script
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScriptDocument {
    pub version: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Context>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_error: Option<OnError>,
    #[serde(default)]
    pub operations: Vec<ScriptStep>,
}

impl ScriptDocument {
    pub fn new(operations: Vec<ScriptStep>) -> Self {
        Self {
            version: Value::from(SUPPORTED_VERSION),
            context: None,
            on_error: None,
            operations,
        }
    }

    pub fn from_json_str(source: &str) -> Result<Self, ApiError> {
        serde_json::from_str(source)
            .map_err(|e| ApiError::ScriptDefinition(format!("Invalid JSON document: {}", e)))
    }

    pub fn from_toml_str(source: &str) -> Result<Self, ApiError> {
        toml::from_str(source)
            .map_err(|e| ApiError::ScriptDefinition(format!("Invalid TOML document: {}", e)))
    }

    /// Load a document, choosing TOML for `.toml` files and JSON otherwise.
    pub fn from_path(path: &Path) -> Result<Self, ApiError> {
        let source = std::fs::read_to_string(path).map_err(|e| {
            ApiError::InvalidInput(format!("Cannot read script {}: {}", path.display(), e))
        })?;
        let is_toml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("toml"))
            .unwrap_or(false);
        if is_toml {
            Self::from_toml_str(&source)
        } else {
            Self::from_json_str(&source)
        }
    }

    fn version_is_supported(&self) -> bool {
        match &self.version {
            Value::Number(n) => {
                n.as_u64() == Some(SUPPORTED_VERSION)
                    || n.as_f64() == Some(SUPPORTED_VERSION as f64)
            }
            Value::String(s) => matches!(s.trim(), "1" | "1.0"),
            _ => false,
        }
    }

    /// Check the whole document. Nothing runs unless this passes.
    pub fn validate(&self) -> Result<(), ApiError> {
        if !self.version_is_supported() {
            return Err(ApiError::ScriptDefinition(format!(
                "Unsupported document version {}; expected {}",
                self.version, SUPPORTED_VERSION
            )));
        }
        if self.operations.is_empty() {
            return Err(ApiError::ScriptDefinition(
                "Document has no operations".to_string(),
            ));
        }

        let all_ids: HashSet<&str> = self.operations.iter().map(|s| s.id.as_str()).collect();
        let mut defined: HashSet<&str> = HashSet::new();

        for (index, step) in self.operations.iter().enumerate() {
            let label = if step.id.is_empty() {
                format!("#{}", index + 1)
            } else {
                format!("'{}'", step.id)
            };

            if step.id.trim().is_empty() {
                return Err(ApiError::ScriptDefinition(format!(
                    "Step {} has no id",
                    label
                )));
            }
            if !is_valid_step_id(&step.id) {
                return Err(ApiError::ScriptDefinition(format!(
                    "Step id {} must start with a letter or '_' and contain only letters, digits, '_' or '-'",
                    label
                )));
            }
            if defined.contains(step.id.as_str()) {
                return Err(ApiError::ScriptDefinition(format!(
                    "Duplicate step id {}",
                    label
                )));
            }
            if step.model.trim().is_empty() {
                return Err(ApiError::ScriptDefinition(format!(
                    "Step {} has no model",
                    label
                )));
            }
            if step.action.requires_ids() && step.ids.is_none() {
                return Err(ApiError::ScriptDefinition(format!(
                    "Step {}: '{}' requires 'ids'",
                    label, step.action
                )));
            }
            if step.action.requires_values() && step.values.is_none() {
                return Err(ApiError::ScriptDefinition(format!(
                    "Step {}: '{}' requires 'values'",
                    label, step.action
                )));
            }
            if step.action == ScriptAction::Execute
                && step.method.as_deref().map_or(true, |m| m.trim().is_empty())
            {
                return Err(ApiError::ScriptDefinition(format!(
                    "Step {}: 'execute' requires 'method'",
                    label
                )));
            }

            for reference in step.references() {
                if reference.has_empty_segment() {
                    return Err(ApiError::ScriptDefinition(format!(
                        "Step {}: malformed reference '{}'",
                        label, reference.raw
                    )));
                }
                if reference.step == step.id {
                    return Err(ApiError::ScriptDefinition(format!(
                        "Step {} references itself via '{}'",
                        label, reference.raw
                    )));
                }
                if !defined.contains(reference.step.as_str()) {
                    let reason = if all_ids.contains(reference.step.as_str()) {
                        "a later step"
                    } else {
                        "an unknown step"
                    };
                    return Err(ApiError::ScriptDefinition(format!(
                        "Step {}: '{}' references {}",
                        label, reference.raw, reason
                    )));
                }
            }

            defined.insert(step.id.as_str());
        }

        Ok(())
    }
}
