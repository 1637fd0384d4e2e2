//! JSON-RPC module - rate-limited, retrying client for a single gateway
//!
//! This module provides:
//! - JSON-RPC 2.0 request/response envelopes
//! - An explicit rate limiter shared by every request to the gateway
//! - Exponential backoff with jitter for rate-limited calls
//! - A transport seam with a `reqwest` implementation

pub mod client;
pub mod rate_limit;
pub mod retry;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use client::RpcClient;
pub use rate_limit::{RateLimitPermit, RateLimiter};
pub use retry::RetryPolicy;
pub use transport::{HttpReply, HttpTransport, Transport};

use crate::error::{DeployerError, DeployerResult};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// The gateway every request goes to
#[derive(Clone)]
pub struct RpcEndpoint {
    url: String,
    api_key: Option<String>,
}

impl RpcEndpoint {
    pub fn new(url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            url: url.into(),
            api_key,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }
}

impl fmt::Debug for RpcEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcEndpoint")
            .field("url", &self.url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl fmt::Display for RpcEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

/// JSON-RPC 2.0 request envelope
#[derive(Debug, Clone, Serialize)]
pub struct RpcRequest<'a> {
    pub jsonrpc: &'static str,
    pub method: &'a str,
    pub params: &'a [Value],
    pub id: u64,
}

impl<'a> RpcRequest<'a> {
    pub fn new(id: u64, method: &'a str, params: &'a [Value]) -> Self {
        Self {
            jsonrpc: "2.0",
            method,
            params,
            id,
        }
    }
}

/// JSON-RPC error code nodes use for a reverted call
pub const EXECUTION_REVERTED_CODE: i64 = 3;

/// Error object carried by a failed JSON-RPC response
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

impl RpcErrorObject {
    /// Gateways report throttling in the message rather than a dedicated code.
    /// Reverts are never throttling, whatever their reason string says.
    pub fn is_rate_limit(&self) -> bool {
        let message = self.message.to_ascii_lowercase();
        if self.code == EXECUTION_REVERTED_CODE || message.starts_with("execution reverted") {
            return false;
        }
        message.contains("rate limit")
            || message.contains("rate-limit")
            || message.contains("too many requests")
            || (message.contains("exceeded") && message.contains("request limit"))
    }
}

/// JSON-RPC 2.0 response envelope
#[derive(Debug, Clone, Deserialize)]
pub struct RpcResponse {
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RpcErrorObject>,
}

impl RpcResponse {
    /// Split into the success payload or a typed error. A missing or `null`
    /// result is a valid success payload (e.g. a receipt not yet mined).
    pub fn into_result(self) -> DeployerResult<Value> {
        match self.error {
            Some(error) if error.is_rate_limit() => Err(DeployerError::RateLimited(error.message)),
            Some(error) => Err(DeployerError::Rpc {
                code: error.code,
                message: error.message,
                data: error.data,
            }),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}
