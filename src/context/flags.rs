//! Command-line context flags (`key=value`) with value type inference.
//!
//! Inference order: boolean (`true`/`false`, case-insensitive), JSON list or
//! mapping (`[...]` / `{...}`), integer, float, then the raw string.

use crate::context::Context;
use crate::error::ApiError;
use serde_json::{Number, Value};

/// Parse repeated `--context key=value` flags into a context mapping.
pub fn parse_context_flags<S: AsRef<str>>(flags: &[S]) -> Result<Context, ApiError> {
    let mut context = Context::new();

    for flag in flags {
        let flag = flag.as_ref();
        let (key, value) = flag.split_once('=').ok_or_else(|| {
            ApiError::InvalidInput(format!(
                "Invalid context format: '{}'. Expected key=value (e.g. active_test=false)",
                flag
            ))
        })?;
        let key = key.trim();
        if key.is_empty() {
            return Err(ApiError::InvalidInput(format!(
                "Empty context key in: '{}'",
                flag
            )));
        }
        context.insert(key.to_string(), parse_context_value(value.trim())?);
    }

    if !context.is_empty() {
        tracing::debug!(keys = ?context.keys().collect::<Vec<_>>(), "Parsed context flags");
    }

    Ok(context)
}

/// Infer the JSON type of a single flag value.
pub fn parse_context_value(raw: &str) -> Result<Value, ApiError> {
    let lowered = raw.to_ascii_lowercase();
    if lowered == "true" || lowered == "false" {
        return Ok(Value::Bool(lowered == "true"));
    }

    let looks_structured = (raw.starts_with('[') && raw.ends_with(']'))
        || (raw.starts_with('{') && raw.ends_with('}'));
    if looks_structured {
        return serde_json::from_str(raw).map_err(|e| {
            ApiError::InvalidInput(format!("Invalid JSON in context value {}: {}", raw, e))
        });
    }

    if let Ok(int) = raw.parse::<i64>() {
        return Ok(Value::Number(int.into()));
    }

    if let Ok(float) = raw.parse::<f64>() {
        if let Some(number) = Number::from_f64(float) {
            return Ok(Value::Number(number));
        }
    }

    Ok(Value::String(raw.to_string()))
}
