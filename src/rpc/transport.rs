//! HTTP transport for JSON-RPC payloads

use super::RpcEndpoint;
use crate::error::{DeployerError, DeployerResult};

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use tracing::debug;

/// Header carrying the gateway credential
pub const API_KEY_HEADER: &str = "x-api-key";

/// Raw HTTP exchange result, before any JSON-RPC interpretation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpReply {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Moves one serialized request to the endpoint and returns the raw reply
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post(&self, body: Vec<u8>) -> DeployerResult<HttpReply>;
}

/// `reqwest` backed transport with an explicit per-request timeout
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: RpcEndpoint,
}

impl HttpTransport {
    pub fn new(endpoint: RpcEndpoint, timeout: Duration) -> DeployerResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(DeployerError::Connection)?;
        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(&self, body: Vec<u8>) -> DeployerResult<HttpReply> {
        let mut request = self
            .client
            .post(self.endpoint.url())
            .header(CONTENT_TYPE, "application/json")
            .body(body);

        if let Some(key) = self.endpoint.api_key() {
            request = request.header(API_KEY_HEADER, key);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;

        debug!("POST {} -> HTTP {} ({} bytes)", self.endpoint, status, body.len());
        Ok(HttpReply::new(status, body.to_vec()))
    }
}
