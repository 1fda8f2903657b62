//! Per-step and aggregate outcomes of a script run.

use crate::error::ErrorReport;
use crate::script::OnError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Lifecycle of one script run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Pending,
    Running,
    Completed,
    Failed,
    RolledBack,
}

/// Outcome of one executed step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    /// Record ids produced or touched by the step (`$step.ids`)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ids: Vec<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorReport>,
    pub duration_ms: u64,
}

impl ScriptResult {
    pub fn succeeded(value: Value, ids: Vec<i64>, duration_ms: u64) -> Self {
        Self {
            success: true,
            value: Some(value),
            ids,
            error: None,
            duration_ms,
        }
    }

    pub fn failed(error: ErrorReport, duration_ms: u64) -> Self {
        Self {
            success: false,
            value: None,
            ids: Vec::new(),
            error: Some(error),
            duration_ms,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RollbackAction {
    /// Created records were deleted
    Deleted,
    /// The step's effects cannot be inverted
    Skipped,
    /// Deleting the created records failed
    Failed,
}

/// What rollback did for one completed mutating step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollbackEntry {
    pub step: String,
    pub action: RollbackAction,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ids: Vec<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Final output of a script run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateResult {
    pub state: RunState,
    pub success: bool,
    pub on_error: OnError,
    /// Step id to outcome, for every step that was attempted
    pub results: BTreeMap<String, ScriptResult>,
    /// Attempted step ids in execution order
    pub order: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_steps: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rollback: Vec<RollbackEntry>,
    pub duration_ms: u64,
}

impl AggregateResult {
    pub fn get(&self, step_id: &str) -> Option<&ScriptResult> {
        self.results.get(step_id)
    }
}
