//! Operations: a single RPC intent against a model.
//!
//! Every operation is classified as a read or a mutation when it is built. Only
//! methods on the known-safe read list are reads; any other method, including
//! custom ones the client knows nothing about, is treated as a mutation.

use crate::context::Context;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Methods known to be free of side effects.
pub const KNOWN_READ_METHODS: &[&str] = &[
    "search",
    "read",
    "search_read",
    "search_count",
    "fields_get",
    "name_get",
    "name_search",
    "read_group",
];

/// Read methods whose results are cached without being asked to.
pub const DEFAULT_CACHEABLE_METHODS: &[&str] = &["fields_get"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Read,
    Mutation,
}

impl OperationKind {
    /// Classify a method name. Unknown methods are mutations.
    pub fn classify(method: &str) -> Self {
        if KNOWN_READ_METHODS.contains(&method) {
            OperationKind::Read
        } else {
            OperationKind::Mutation
        }
    }
}

/// One RPC call: `model.method(*args, **kwargs)` with an optional context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub model: String,
    pub method: String,
    pub args: Vec<Value>,
    pub kwargs: Map<String, Value>,
    pub context: Option<Context>,
    pub kind: OperationKind,
    pub cacheable: bool,
}

impl Operation {
    pub fn new(model: impl Into<String>, method: impl Into<String>) -> Self {
        let method = method.into();
        let kind = OperationKind::classify(&method);
        let cacheable =
            kind == OperationKind::Read && DEFAULT_CACHEABLE_METHODS.contains(&method.as_str());
        Self {
            model: model.into(),
            method,
            args: Vec::new(),
            kwargs: Map::new(),
            context: None,
            kind,
            cacheable,
        }
    }

    pub fn arg(mut self, value: Value) -> Self {
        self.args.push(value);
        self
    }

    pub fn args(mut self, values: Vec<Value>) -> Self {
        self.args.extend(values);
        self
    }

    pub fn kwarg(mut self, key: impl Into<String>, value: Value) -> Self {
        self.kwargs.insert(key.into(), value);
        self
    }

    pub fn kwargs(mut self, kwargs: Map<String, Value>) -> Self {
        self.kwargs.extend(kwargs);
        self
    }

    /// Set a keyword argument only when a value is present.
    pub fn kwarg_opt(self, key: &str, value: Option<Value>) -> Self {
        match value {
            Some(value) => self.kwarg(key, value),
            None => self,
        }
    }

    pub fn with_context(mut self, context: Option<Context>) -> Self {
        self.context = context;
        self
    }

    /// Request caching. Has no effect on mutations.
    pub fn cacheable(mut self, cacheable: bool) -> Self {
        self.cacheable = cacheable && self.kind == OperationKind::Read;
        self
    }

    pub fn is_mutation(&self) -> bool {
        self.kind == OperationKind::Mutation
    }

    pub fn search(model: &str, domain: Value) -> Self {
        Self::new(model, "search").arg(domain)
    }

    pub fn search_read(model: &str, domain: Value) -> Self {
        Self::new(model, "search_read").arg(domain)
    }

    pub fn search_count(model: &str, domain: Value) -> Self {
        Self::new(model, "search_count").arg(domain)
    }

    pub fn read(model: &str, ids: &[i64]) -> Self {
        Self::new(model, "read").arg(json!(ids))
    }

    pub fn fields_get(model: &str) -> Self {
        Self::new(model, "fields_get")
    }

    pub fn name_get(model: &str, ids: &[i64]) -> Self {
        Self::new(model, "name_get").arg(json!(ids))
    }

    pub fn create(model: &str, values: Value) -> Self {
        Self::new(model, "create").arg(values)
    }

    pub fn write(model: &str, ids: &[i64], values: Value) -> Self {
        Self::new(model, "write").arg(json!(ids)).arg(values)
    }

    pub fn unlink(model: &str, ids: &[i64]) -> Self {
        Self::new(model, "unlink").arg(json!(ids))
    }
}
