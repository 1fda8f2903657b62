//! Inter-step references: `$<step_id>` or `$<step_id>.<path>`.
//!
//! Only a string that is exactly one token is a reference. Path segments are
//! separated by dots: `ids` as the first segment selects the record ids of the
//! referenced step, a number indexes into a list, anything else selects a field.

use serde_json::Value;

/// A parsed reference token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub step: String,
    pub path: Vec<String>,
    pub raw: String,
}

/// Step ids usable in references: a letter or underscore, then letters, digits, `_` or `-`.
pub fn is_valid_step_id(id: &str) -> bool {
    let mut chars = id.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

impl Reference {
    /// Parse a string as a reference token. Returns `None` for ordinary strings.
    pub fn parse(raw: &str) -> Option<Self> {
        let body = raw.strip_prefix('$')?;
        let (step, path) = match body.split_once('.') {
            Some((step, path)) => (step, path.split('.').map(str::to_string).collect()),
            None => (body, Vec::new()),
        };
        if !is_valid_step_id(step) {
            return None;
        }
        Some(Self {
            step: step.to_string(),
            path,
            raw: raw.to_string(),
        })
    }

    pub fn has_empty_segment(&self) -> bool {
        self.path.iter().any(String::is_empty)
    }
}

/// Collect every reference in a JSON tree, in document order.
pub fn collect_references(value: &Value, out: &mut Vec<Reference>) {
    match value {
        Value::String(s) => {
            if let Some(reference) = Reference::parse(s) {
                out.push(reference);
            }
        }
        Value::Array(items) => items.iter().for_each(|item| collect_references(item, out)),
        Value::Object(map) => map.values().for_each(|item| collect_references(item, out)),
        _ => {}
    }
}

/// Replace every reference in a JSON tree with its resolved value.
pub fn substitute<F, E>(value: &Value, resolve: &mut F) -> Result<Value, E>
where
    F: FnMut(&Reference) -> Result<Value, E>,
{
    match value {
        Value::String(s) => match Reference::parse(s) {
            Some(reference) => resolve(&reference),
            None => Ok(value.clone()),
        },
        Value::Array(items) => items
            .iter()
            .map(|item| substitute(item, resolve))
            .collect::<Result<Vec<_>, E>>()
            .map(Value::Array),
        Value::Object(map) => {
            let mut out = serde_json::Map::new();
            for (key, item) in map {
                out.insert(key.clone(), substitute(item, resolve)?);
            }
            Ok(Value::Object(out))
        }
        _ => Ok(value.clone()),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "mapping",
    }
}

/// Walk a reference path over a step's stored value and ids.
pub fn walk_path(value: &Value, ids: &[i64], path: &[String]) -> Result<Value, String> {
    let mut segments = path.iter();
    let mut current = match path.first().map(String::as_str) {
        Some("ids") => {
            segments.next();
            Value::Array(ids.iter().map(|id| Value::from(*id)).collect())
        }
        _ => value.clone(),
    };

    for segment in segments {
        if segment.is_empty() {
            return Err("empty path segment".to_string());
        }
        current = match &current {
            Value::Array(items) => {
                let index: usize = segment.parse().map_err(|_| {
                    format!("cannot select '{}' from a list; expected an index", segment)
                })?;
                items.get(index).cloned().ok_or_else(|| {
                    format!("index {} out of range (length {})", index, items.len())
                })?
            }
            Value::Object(map) => map
                .get(segment)
                .cloned()
                .ok_or_else(|| format!("no field '{}'", segment))?,
            other => {
                return Err(format!(
                    "cannot select '{}' from a {}",
                    segment,
                    type_name(other)
                ))
            }
        };
    }

    Ok(current)
}

/// Record ids carried by a step result: a list of ints, a single int, or records with `id`.
pub fn extract_ids(value: &Value) -> Vec<i64> {
    match value {
        Value::Number(n) => n.as_i64().into_iter().collect(),
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::Number(n) => n.as_i64(),
                Value::Object(record) => record.get("id").and_then(Value::as_i64),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}
