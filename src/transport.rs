//! Session/Transport
//!
//! A transport executes one `execute_kw` call and returns the decoded result
//! unchanged. The production implementation speaks Odoo's JSON-RPC dialect over
//! HTTP and authenticates lazily on first use; tests substitute their own
//! implementation of [`Transport`].

use crate::error::ApiError;
use async_trait::async_trait;
use serde_json::{json, Map, Value};

pub mod jsonrpc;

pub use jsonrpc::JsonRpcTransport;

/// Generic RPC primitive: `model.method(*args, **kwargs)` on the remote server
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute_kw(
        &self,
        model: &str,
        method: &str,
        args: Vec<Value>,
        kwargs: Map<String, Value>,
    ) -> Result<Value, ApiError>;
}

/// Build a JSON-RPC 2.0 `call` envelope for an Odoo service.
pub fn call_payload(service: &str, method: &str, args: Vec<Value>, id: u64) -> Value {
    json!({
        "jsonrpc": "2.0",
        "method": "call",
        "params": {
            "service": service,
            "method": method,
            "args": args,
        },
        "id": id,
    })
}

/// Extract `result` from a JSON-RPC response, mapping `error` to a typed error.
///
/// The server's message is kept verbatim; `error.data.message` is appended when present.
pub fn parse_response(response: Value) -> Result<Value, ApiError> {
    let Value::Object(mut body) = response else {
        return Err(ApiError::Remote(
            "Malformed JSON-RPC response: expected an object".to_string(),
        ));
    };

    if let Some(error) = body.remove("error") {
        let mut message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("Unknown error")
            .to_string();
        let data = error.get("data");
        if let Some(detail) = data
            .and_then(|d| d.get("message"))
            .and_then(Value::as_str)
            .filter(|d| !d.is_empty())
        {
            message = format!("{}: {}", message, detail);
        }
        let exception = data
            .and_then(|d| d.get("name"))
            .and_then(Value::as_str)
            .unwrap_or_default();
        if exception.ends_with("AccessDenied") {
            return Err(ApiError::Auth(message));
        }
        return Err(ApiError::Remote(message));
    }

    Ok(body.remove("result").unwrap_or(Value::Null))
}
