//! RPC execution core
//!
//! `RpcClient` is bound to one profile and one transport for the life of a process.
//! Every call runs the same pipeline:
//!
//! 1. guardrail check (mutations only)
//! 2. context merge: profile < global < `kwargs["context"]` < operation < call override
//! 3. cache lookup (cacheable reads only)
//! 4. transport execution with the effective context folded into `kwargs["context"]`
//!
//! The core never retries and never interprets the shape of a successful payload.

use crate::cache::{compute_cache_key, CacheKeyInput, ResultCache};
use crate::context::{context_from_value, Context, ContextStack};
use crate::error::ApiError;
use crate::guardrail::{self, GuardrailDecision};
use crate::operation::Operation;
use crate::profile::Profile;
use crate::transport::{JsonRpcTransport, Transport};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;

/// Profile-bound client over a transport, with optional result cache
pub struct RpcClient {
    profile: Profile,
    transport: Arc<dyn Transport>,
    cache: Option<ResultCache>,
    global_context: Option<Context>,
}

impl RpcClient {
    pub fn new(profile: Profile, transport: Arc<dyn Transport>) -> Self {
        Self {
            profile,
            transport,
            cache: None,
            global_context: None,
        }
    }

    /// Client over the JSON-RPC transport for the profile.
    pub fn connect(profile: Profile) -> Result<Self, ApiError> {
        let transport = Arc::new(JsonRpcTransport::new(&profile)?);
        Ok(Self::new(profile, transport))
    }

    pub fn with_cache(mut self, cache: ResultCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_global_context(mut self, context: Option<Context>) -> Self {
        self.global_context = context.filter(|c| !c.is_empty());
        self
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn cache(&self) -> Option<&ResultCache> {
        self.cache.as_ref()
    }

    pub fn global_context(&self) -> Option<&Context> {
        self.global_context.as_ref()
    }

    /// Effective context for an operation.
    pub fn effective_context(
        &self,
        operation: &Operation,
        context_override: Option<&Context>,
    ) -> Context {
        let kwargs_context = operation.kwargs.get("context").and_then(context_from_value);
        ContextStack::new()
            .push(self.profile.context.as_ref())
            .push(self.global_context.as_ref())
            .push(kwargs_context)
            .push(operation.context.as_ref())
            .push(context_override)
            .resolve()
    }

    /// Run one operation through guardrails, context merge, cache and transport.
    pub async fn invoke(
        &self,
        operation: &Operation,
        context_override: Option<&Context>,
        allow_mutation_override: bool,
    ) -> Result<Value, ApiError> {
        let decision = guardrail::check(&self.profile, operation, allow_mutation_override)?;

        let context = self.effective_context(operation, context_override);

        let endpoint = self.profile.endpoint();
        let cache_key = match (&self.cache, operation.cacheable) {
            (Some(_), true) if decision == GuardrailDecision::Read => {
                Some(compute_cache_key(&CacheKeyInput {
                    endpoint: &endpoint,
                    db: &self.profile.db,
                    model: &operation.model,
                    method: &operation.method,
                    args: &operation.args,
                    kwargs: &operation.kwargs,
                    context: &context,
                }))
            }
            _ => None,
        };

        if let (Some(cache), Some(key)) = (&self.cache, &cache_key) {
            if let Some(value) = cache.get(key) {
                tracing::debug!(
                    profile = %self.profile.name,
                    model = %operation.model,
                    method = %operation.method,
                    "Served from cache"
                );
                return Ok(value);
            }
        }

        let mut kwargs = operation.kwargs.clone();
        if context.is_empty() {
            kwargs.remove("context");
        } else {
            kwargs.insert("context".to_string(), Value::Object(context));
        }

        let started = Instant::now();
        let result = self
            .transport
            .execute_kw(
                &operation.model,
                &operation.method,
                operation.args.clone(),
                kwargs,
            )
            .await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match &result {
            Ok(_) => tracing::info!(
                profile = %self.profile.name,
                model = %operation.model,
                method = %operation.method,
                elapsed_ms,
                "RPC call completed"
            ),
            Err(e) => tracing::warn!(
                profile = %self.profile.name,
                model = %operation.model,
                method = %operation.method,
                elapsed_ms,
                error = %e,
                "RPC call failed"
            ),
        }

        let value = result?;
        if let (Some(cache), Some(key)) = (&self.cache, &cache_key) {
            cache.put(key, value.clone());
        }
        Ok(value)
    }

    /// Invoke without a call override or mutation override.
    pub async fn call(&self, operation: &Operation) -> Result<Value, ApiError> {
        self.invoke(operation, None, false).await
    }

    pub async fn search(
        &self,
        model: &str,
        domain: Value,
        limit: Option<u64>,
        offset: Option<u64>,
        order: Option<&str>,
    ) -> Result<Value, ApiError> {
        let op = Operation::search(model, domain)
            .kwarg_opt("limit", limit.map(|l| json!(l)))
            .kwarg_opt("offset", offset.map(|o| json!(o)))
            .kwarg_opt("order", order.map(|o| json!(o)));
        self.call(&op).await
    }

    pub async fn search_read(
        &self,
        model: &str,
        domain: Value,
        fields: Option<&[String]>,
        limit: Option<u64>,
        offset: Option<u64>,
        order: Option<&str>,
    ) -> Result<Value, ApiError> {
        let op = Operation::search_read(model, domain)
            .kwarg_opt("fields", fields.map(|f| json!(f)))
            .kwarg_opt("limit", limit.map(|l| json!(l)))
            .kwarg_opt("offset", offset.map(|o| json!(o)))
            .kwarg_opt("order", order.map(|o| json!(o)));
        self.call(&op).await
    }

    pub async fn search_count(&self, model: &str, domain: Value) -> Result<u64, ApiError> {
        let value = self.call(&Operation::search_count(model, domain)).await?;
        value.as_u64().ok_or_else(|| {
            ApiError::Remote(format!("search_count returned a non-integer: {}", value))
        })
    }

    pub async fn read(
        &self,
        model: &str,
        ids: &[i64],
        fields: Option<&[String]>,
    ) -> Result<Value, ApiError> {
        let op = Operation::read(model, ids).kwarg_opt("fields", fields.map(|f| json!(f)));
        self.call(&op).await
    }

    /// Field definitions; cached.
    pub async fn fields_get(
        &self,
        model: &str,
        attributes: Option<&[String]>,
    ) -> Result<Value, ApiError> {
        let op = Operation::fields_get(model).kwarg_opt("attributes", attributes.map(|a| json!(a)));
        self.call(&op).await
    }

    pub async fn name_get(&self, model: &str, ids: &[i64]) -> Result<Value, ApiError> {
        self.call(&Operation::name_get(model, ids)).await
    }

    pub async fn name_search(&self, model: &str, name: &str, limit: u64) -> Result<Value, ApiError> {
        let op = Operation::new(model, "name_search")
            .kwarg("name", json!(name))
            .kwarg("limit", json!(limit));
        self.call(&op).await
    }

    pub async fn create(
        &self,
        model: &str,
        values: Value,
        allow_mutation_override: bool,
    ) -> Result<Value, ApiError> {
        self.invoke(&Operation::create(model, values), None, allow_mutation_override)
            .await
    }

    pub async fn write(
        &self,
        model: &str,
        ids: &[i64],
        values: Value,
        allow_mutation_override: bool,
    ) -> Result<Value, ApiError> {
        self.invoke(&Operation::write(model, ids, values), None, allow_mutation_override)
            .await
    }

    pub async fn unlink(
        &self,
        model: &str,
        ids: &[i64],
        allow_mutation_override: bool,
    ) -> Result<Value, ApiError> {
        self.invoke(&Operation::unlink(model, ids), None, allow_mutation_override)
            .await
    }

    /// Arbitrary method call. Guarded unless the method is a known read.
    pub async fn execute(
        &self,
        model: &str,
        method: &str,
        args: Vec<Value>,
        kwargs: serde_json::Map<String, Value>,
        allow_mutation_override: bool,
    ) -> Result<Value, ApiError> {
        let op = Operation::new(model, method).args(args).kwargs(kwargs);
        self.invoke(&op, None, allow_mutation_override).await
    }

    /// Sorted technical names of all installed models; cached.
    pub async fn list_models(&self) -> Result<Vec<String>, ApiError> {
        let op = Operation::search_read("ir.model", json!([]))
            .kwarg("fields", json!(["model"]))
            .cacheable(true);
        let records = self.call(&op).await?;
        let mut models: Vec<String> = records
            .as_array()
            .map(|records| {
                records
                    .iter()
                    .filter_map(|r| r.get("model").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        models.sort();
        Ok(models)
    }
}

impl std::fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcClient")
            .field("profile", &self.profile.name)
            .field("cache", &self.cache)
            .finish()
    }
}
