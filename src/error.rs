//! Error types for the odoo-agent execution core and its outer layers.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which guardrail rejected a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardrailKind {
    /// Profile is read-only and no explicit override was given
    Readonly,
    /// Profile is protected; mutations are never allowed
    Protected,
}

impl std::fmt::Display for GuardrailKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GuardrailKind::Readonly => write!(f, "readonly"),
            GuardrailKind::Protected => write!(f, "protected"),
        }
    }
}

/// Errors surfaced by the RPC core, the script engine, and the CLI layers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Mutation '{method}' on '{model}' blocked: profile '{profile}' is {kind}")]
    Guardrail {
        kind: GuardrailKind,
        profile: String,
        model: String,
        method: String,
    },

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Connection error: {message}")]
    Connection { message: String, timeout: bool },

    #[error("Server error: {0}")]
    Remote(String),

    #[error("Invalid script: {0}")]
    ScriptDefinition(String),

    #[error("Step '{step}': cannot resolve '{reference}': {reason}")]
    VariableResolution {
        step: String,
        reference: String,
        reason: String,
    },

    #[error("Step '{step}' depends on failed step '{dependency}'")]
    DependencyFailed { step: String, dependency: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Profile not found: {0}")]
    ProfileNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

/// Stable, serialisable error classification for callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    GuardrailReadonly,
    GuardrailProtected,
    Auth,
    Connection,
    Remote,
    ScriptDefinition,
    VariableResolution,
    DependencyFailed,
    Config,
    ProfileNotFound,
    InvalidInput,
    Storage,
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Guardrail {
                kind: GuardrailKind::Readonly,
                ..
            } => ErrorKind::GuardrailReadonly,
            ApiError::Guardrail {
                kind: GuardrailKind::Protected,
                ..
            } => ErrorKind::GuardrailProtected,
            ApiError::Auth(_) => ErrorKind::Auth,
            ApiError::Connection { .. } => ErrorKind::Connection,
            ApiError::Remote(_) => ErrorKind::Remote,
            ApiError::ScriptDefinition(_) => ErrorKind::ScriptDefinition,
            ApiError::VariableResolution { .. } => ErrorKind::VariableResolution,
            ApiError::DependencyFailed { .. } => ErrorKind::DependencyFailed,
            ApiError::ConfigError(_) => ErrorKind::Config,
            ApiError::ProfileNotFound(_) => ErrorKind::ProfileNotFound,
            ApiError::InvalidInput(_) => ErrorKind::InvalidInput,
            ApiError::Storage(_) => ErrorKind::Storage,
        }
    }

    /// Only transport-level failures are worth retrying; the core never retries itself.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ApiError::Connection { .. })
    }
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}

/// Caller-facing error object: `{kind, message, profile_name, retryable}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_name: Option<String>,
    pub retryable: bool,
}

impl ErrorReport {
    pub fn new(error: &ApiError, profile_name: Option<&str>) -> Self {
        Self {
            kind: error.kind(),
            message: error.to_string(),
            profile_name: profile_name.map(str::to_string),
            retryable: error.is_retryable(),
        }
    }
}
