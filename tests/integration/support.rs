//! Mock transport and fixtures shared by the integration tests

use async_trait::async_trait;
use odoo_agent::cache::ResultCache;
use odoo_agent::error::ApiError;
use odoo_agent::transport::Transport;
use odoo_agent::{Profile, RpcClient};
use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// One `execute_kw` call as the transport saw it
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub model: String,
    pub method: String,
    pub args: Vec<Value>,
    pub kwargs: Map<String, Value>,
}

type Handler = Box<dyn Fn(&RecordedCall) -> Result<Value, ApiError> + Send + Sync>;

/// Transport that records calls and answers through a handler
pub struct MockTransport {
    calls: Mutex<Vec<RecordedCall>>,
    handler: Handler,
}

impl MockTransport {
    pub fn new<F>(handler: F) -> Arc<Self>
    where
        F: Fn(&RecordedCall) -> Result<Value, ApiError> + Send + Sync + 'static,
    {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            handler: Box::new(handler),
        })
    }

    /// A small in-memory Odoo: `create` hands out ids from 100 upwards, `search`
    /// returns `[1, 2, 3]`, `read` echoes records, writes and unlinks succeed.
    /// Any call on the `fail.model` model fails with a server error.
    pub fn odoo() -> Arc<Self> {
        let next_id = AtomicI64::new(100);
        Self::new(move |call| {
            if call.model == "fail.model" {
                return Err(ApiError::Remote(format!(
                    "{}.{} rejected by server",
                    call.model, call.method
                )));
            }
            match call.method.as_str() {
                "search" => Ok(json!([1, 2, 3])),
                "search_count" => Ok(json!(3)),
                "search_read" => Ok(json!([
                    {"id": 1, "name": "Azure Interior"},
                    {"id": 2, "name": "Deco Addict"}
                ])),
                "read" => {
                    let ids = call.args.first().cloned().unwrap_or_else(|| json!([]));
                    let records: Vec<Value> = ids
                        .as_array()
                        .map(|ids| {
                            ids.iter()
                                .map(|id| json!({"id": id, "name": format!("Record {}", id)}))
                                .collect()
                        })
                        .unwrap_or_default();
                    Ok(Value::Array(records))
                }
                "create" => Ok(json!(next_id.fetch_add(1, Ordering::SeqCst))),
                "write" | "unlink" => Ok(json!(true)),
                "fields_get" => Ok(json!({"name": {"type": "char", "string": "Name"}})),
                other => Ok(json!({"called": other})),
            }
        })
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn calls_to(&self, method: &str) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .iter()
            .filter(|call| call.method == method)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn execute_kw(
        &self,
        model: &str,
        method: &str,
        args: Vec<Value>,
        kwargs: Map<String, Value>,
    ) -> Result<Value, ApiError> {
        let call = RecordedCall {
            model: model.to_string(),
            method: method.to_string(),
            args,
            kwargs,
        };
        self.calls.lock().push(call.clone());
        (self.handler)(&call)
    }
}

pub fn profile(name: &str) -> Profile {
    Profile::new(name, "http://localhost:8069", "test", "admin", "admin")
}

pub fn readonly_profile(name: &str) -> Profile {
    let mut profile = profile(name);
    profile.readonly = true;
    profile
}

pub fn protected_profile(name: &str) -> Profile {
    let mut profile = profile(name);
    profile.protected = true;
    profile
}

pub fn client(profile: Profile, transport: Arc<MockTransport>) -> RpcClient {
    RpcClient::new(profile, transport)
}

pub fn cached_client(profile: Profile, transport: Arc<MockTransport>) -> RpcClient {
    RpcClient::new(profile, transport).with_cache(ResultCache::in_memory())
}

pub fn ctx(value: Value) -> odoo_agent::context::Context {
    serde_json::from_value(value).unwrap()
}
