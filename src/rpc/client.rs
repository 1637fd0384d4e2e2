//! JSON-RPC client with gateway rate limiting and bounded retry

use super::{HttpReply, HttpTransport, RateLimiter, RetryPolicy, RpcEndpoint, RpcRequest, RpcResponse, Transport};
use crate::error::{DeployerError, DeployerResult};
use crate::metrics;

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Client for one JSON-RPC endpoint
pub struct RpcClient {
    transport: Arc<dyn Transport>,
    limiter: Arc<RateLimiter>,
    retry: RetryPolicy,
    /// Shared by every client derived with `with_retry_policy`
    next_id: Arc<AtomicU64>,
}

impl RpcClient {
    /// Create a client over HTTP with its own rate limiter
    pub fn connect(
        endpoint: RpcEndpoint,
        request_timeout: Duration,
        rate_limit_interval: Duration,
        retry: RetryPolicy,
    ) -> DeployerResult<Self> {
        debug!("Connecting RPC client to {:?}", endpoint);
        let transport = HttpTransport::new(endpoint, request_timeout)?;
        Ok(Self::new(
            Arc::new(transport),
            Arc::new(RateLimiter::new(rate_limit_interval)),
            retry,
        ))
    }

    pub fn new(transport: Arc<dyn Transport>, limiter: Arc<RateLimiter>, retry: RetryPolicy) -> Self {
        Self {
            transport,
            limiter,
            retry,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// A client over the same transport, rate limiter and request id counter
    /// with a different retry budget
    pub fn with_retry_policy(&self, retry: RetryPolicy) -> Self {
        Self {
            transport: self.transport.clone(),
            limiter: self.limiter.clone(),
            retry,
            next_id: self.next_id.clone(),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Call `method` with positional `params`, retrying rate-limited attempts
    pub async fn call(&self, method: &str, params: Vec<Value>) -> DeployerResult<Value> {
        if method.trim().is_empty() {
            return Err(DeployerError::InvalidRequest(
                "method name must not be empty".to_string(),
            ));
        }

        let mut retries = 0;
        loop {
            match self.call_once(method, &params).await {
                Err(DeployerError::RateLimited(reason)) => {
                    metrics::record_rpc_rate_limited(method);

                    if retries >= self.retry.max_retries {
                        warn!(
                            "{} still rate limited after {} retries: {}",
                            method, retries, reason
                        );
                        metrics::record_rpc_retries_exhausted(method);
                        return Err(DeployerError::RateLimitExceeded {
                            method: method.to_string(),
                            attempts: retries + 1,
                        });
                    }

                    retries += 1;
                    let delay = self.retry.backoff(retries);
                    warn!(
                        "{} rate limited ({}), retry {}/{} in {:?}",
                        method, reason, retries, self.retry.max_retries, delay
                    );
                    tokio::time::sleep(delay).await;
                }
                result => return result,
            }
        }
    }

    /// Call and deserialize the result
    pub async fn call_as<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> DeployerResult<T> {
        let value = self.call(method, params).await?;
        serde_json::from_value(value)
            .map_err(|e| DeployerError::Parse(format!("{} result: {}", method, e)))
    }

    /// Single attempt: one rate-limit permit, one HTTP exchange
    async fn call_once(&self, method: &str, params: &[Value]) -> DeployerResult<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = serde_json::to_vec(&RpcRequest::new(id, method, params))?;

        debug!("RPC {} #{}", method, id);
        metrics::record_rpc_request(method);

        let reply = {
            let _permit = self.limiter.acquire().await;
            self.transport.post(body).await?
        };

        decode_reply(reply)
    }
}

fn decode_reply(reply: HttpReply) -> DeployerResult<Value> {
    match reply.status {
        200 => {}
        429 => return Err(DeployerError::RateLimited("HTTP 429".to_string())),
        status => {
            return Err(DeployerError::Transport {
                status,
                body: reply.body_text(),
            })
        }
    }

    let response: RpcResponse = serde_json::from_slice(&reply.body).map_err(|e| {
        DeployerError::Parse(format!("invalid JSON-RPC body ({}): {}", e, reply.body_text()))
    })?;

    response.into_result()
}
