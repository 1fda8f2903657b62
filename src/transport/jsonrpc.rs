//! JSON-RPC over HTTP transport bound to one profile.

use crate::error::ApiError;
use crate::profile::Profile;
use crate::transport::{call_payload, parse_response, Transport};
use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Client;
use serde_json::{json, Map, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::OnceCell;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Authenticated session against `{url}/jsonrpc`
pub struct JsonRpcTransport {
    client: Client,
    endpoint: String,
    db: String,
    username: String,
    password: String,
    uid: OnceCell<i64>,
    /// Rejected login, replayed instead of logging in again
    auth_failure: Mutex<Option<String>>,
    request_id: AtomicU64,
}

fn map_http_error(error: reqwest::Error) -> ApiError {
    if error.is_timeout() {
        ApiError::Connection {
            message: format!("Request timeout: {}", error),
            timeout: true,
        }
    } else if error.is_connect() {
        ApiError::Connection {
            message: format!("Failed to connect: {}", error),
            timeout: false,
        }
    } else if error.is_decode() {
        ApiError::Remote(format!("Invalid JSON-RPC response: {}", error))
    } else {
        ApiError::Connection {
            message: format!("HTTP error: {}", error),
            timeout: false,
        }
    }
}

impl JsonRpcTransport {
    pub fn new(profile: &Profile) -> Result<Self, ApiError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(Duration::from_secs(profile.timeout_secs))
            .danger_accept_invalid_certs(!profile.verify_ssl)
            .build()
            .map_err(|e| ApiError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: format!("{}/jsonrpc", profile.endpoint()),
            db: profile.db.clone(),
            username: profile.username.clone(),
            password: profile.password.clone(),
            uid: OnceCell::new(),
            auth_failure: Mutex::new(None),
            request_id: AtomicU64::new(1),
        })
    }

    /// Authenticated user id, if a login already happened.
    pub fn uid(&self) -> Option<i64> {
        self.uid.get().copied()
    }

    async fn post(&self, payload: Value) -> Result<Value, ApiError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(map_http_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(match status.as_u16() {
                502..=504 => ApiError::Connection {
                    message: format!("Server unavailable ({}): {}", status, body),
                    timeout: status.as_u16() == 504,
                },
                _ => ApiError::Remote(format!("Request failed with status {}: {}", status, body)),
            });
        }

        let body: Value = response.json().await.map_err(map_http_error)?;
        parse_response(body)
    }

    fn next_id(&self) -> u64 {
        self.request_id.fetch_add(1, Ordering::Relaxed)
    }

    async fn login(&self) -> Result<i64, ApiError> {
        let payload = call_payload(
            "common",
            "login",
            vec![json!(self.db), json!(self.username), json!(self.password)],
            self.next_id(),
        );
        let result = match self.post(payload).await {
            Ok(result) => result,
            Err(ApiError::Remote(message)) => return Err(ApiError::Auth(message)),
            Err(e) => return Err(e),
        };

        match result.as_i64() {
            Some(uid) if uid > 0 => {
                tracing::info!(endpoint = %self.endpoint, db = %self.db, uid, "Authenticated");
                Ok(uid)
            }
            _ => Err(ApiError::Auth(
                "Invalid username or password".to_string(),
            )),
        }
    }

    async fn ensure_session(&self) -> Result<i64, ApiError> {
        if let Some(message) = self.auth_failure.lock().clone() {
            return Err(ApiError::Auth(message));
        }
        match self.uid.get_or_try_init(|| self.login()).await {
            Ok(uid) => Ok(*uid),
            Err(ApiError::Auth(message)) => {
                *self.auth_failure.lock() = Some(message.clone());
                Err(ApiError::Auth(message))
            }
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl Transport for JsonRpcTransport {
    async fn execute_kw(
        &self,
        model: &str,
        method: &str,
        args: Vec<Value>,
        kwargs: Map<String, Value>,
    ) -> Result<Value, ApiError> {
        let uid = self.ensure_session().await?;
        let payload = call_payload(
            "object",
            "execute_kw",
            vec![
                json!(self.db),
                json!(uid),
                json!(self.password),
                json!(model),
                json!(method),
                Value::Array(args),
                Value::Object(kwargs),
            ],
            self.next_id(),
        );
        tracing::debug!(model = %model, method = %method, "Sending execute_kw");
        self.post(payload).await
    }
}
