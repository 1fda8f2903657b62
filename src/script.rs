//! Script Engine
//!
//! Runs a document of operations against one profile, strictly in order. Steps can
//! feed later steps through `$<step_id>` references, and a failure policy decides
//! what happens when a step fails.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub mod document;
pub mod engine;
pub mod reference;
pub mod result;

pub use document::{ScriptAction, ScriptDocument, ScriptStep};
pub use engine::ScriptEngine;
pub use reference::Reference;
pub use result::{AggregateResult, RollbackAction, RollbackEntry, RunState, ScriptResult};

/// Failure policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnError {
    /// Abort at the first failing step
    #[default]
    Stop,
    /// Record the failure and keep going
    Continue,
    /// Abort and undo what can be undone
    Rollback,
}

impl FromStr for OnError {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "stop" => Ok(OnError::Stop),
            "continue" => Ok(OnError::Continue),
            "rollback" => Ok(OnError::Rollback),
            other => Err(format!(
                "Unknown failure policy '{}'; expected stop, continue or rollback",
                other
            )),
        }
    }
}

impl std::fmt::Display for OnError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OnError::Stop => write!(f, "stop"),
            OnError::Continue => write!(f, "continue"),
            OnError::Rollback => write!(f, "rollback"),
        }
    }
}
