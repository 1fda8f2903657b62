//! Context Merger
//!
//! Combines layered context mappings (profile defaults, global context, script and
//! step contexts, per-call overrides) into one effective context. Merging is a
//! right-biased union: later layers win on key collisions. Source mappings are
//! never mutated and values are never coerced; type inference for command-line
//! flags lives in [`flags`].

use serde_json::{Map, Value};

pub mod flags;

pub use flags::parse_context_flags;

/// Per-call metadata sent to the server as `kwargs["context"]`.
pub type Context = Map<String, Value>;

/// Merge context layers, broadest first. Missing layers are skipped.
pub fn merge_contexts<'a, I>(layers: I) -> Context
where
    I: IntoIterator<Item = Option<&'a Context>>,
{
    let mut merged = Context::new();
    for layer in layers.into_iter().flatten() {
        for (key, value) in layer {
            merged.insert(key.clone(), value.clone());
        }
    }
    merged
}

/// Ordered set of context layers, from the broadest to the most local.
///
/// ```
/// use odoo_agent::context::{Context, ContextStack};
/// use serde_json::json;
///
/// let profile: Context = serde_json::from_value(json!({"lang": "en_US"})).unwrap();
/// let call: Context = serde_json::from_value(json!({"lang": "de_DE", "tz": "CET"})).unwrap();
/// let effective = ContextStack::new().push(Some(&profile)).push(Some(&call)).resolve();
/// assert_eq!(effective["lang"], "de_DE");
/// assert_eq!(profile["lang"], "en_US");
/// ```
#[derive(Debug, Default, Clone)]
pub struct ContextStack<'a> {
    layers: Vec<&'a Context>,
}

impl<'a> ContextStack<'a> {
    pub fn new() -> Self {
        Self { layers: Vec::new() }
    }

    /// Add a layer that overrides every layer pushed before it.
    pub fn push(mut self, layer: Option<&'a Context>) -> Self {
        if let Some(layer) = layer {
            self.layers.push(layer);
        }
        self
    }

    pub fn resolve(&self) -> Context {
        merge_contexts(self.layers.iter().map(|layer| Some(*layer)))
    }
}

/// Extract a context mapping from a JSON value, if it is an object.
pub fn context_from_value(value: &Value) -> Option<&Context> {
    value.as_object()
}
