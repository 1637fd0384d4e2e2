//! In-memory JSON-RPC gateway for tests

use super::{HttpReply, Transport};
use crate::error::DeployerResult;

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::time::Instant;

/// Scripted reply for one request
#[derive(Debug, Clone)]
pub enum GatewayReply {
    Result(Value),
    Error { code: i64, message: String },
    Status(u16),
    Raw(String),
}

impl GatewayReply {
    pub fn result(value: Value) -> Self {
        GatewayReply::Result(value)
    }

    pub fn error(code: i64, message: &str) -> Self {
        GatewayReply::Error {
            code,
            message: message.to_string(),
        }
    }
}

/// Replies are queued per method; the last queued reply for a method
/// repeats once the queue is down to it.
#[derive(Default)]
pub struct MockGateway {
    replies: Mutex<HashMap<String, VecDeque<GatewayReply>>>,
    requests: Mutex<Vec<(Instant, Value)>>,
}

impl MockGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn on(&self, method: &str, reply: GatewayReply) {
        self.replies
            .lock()
            .unwrap()
            .entry(method.to_string())
            .or_default()
            .push_back(reply);
    }

    /// Every request body received, in order
    pub fn requests(&self) -> Vec<Value> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|(_, r)| r.clone())
            .collect()
    }

    pub fn requests_for(&self, method: &str) -> Vec<Value> {
        self.requests()
            .into_iter()
            .filter(|r| r["method"] == method)
            .collect()
    }

    pub fn calls(&self, method: &str) -> usize {
        self.requests_for(method).len()
    }

    pub fn call_times(&self) -> Vec<Instant> {
        self.requests.lock().unwrap().iter().map(|(t, _)| *t).collect()
    }

    fn next_reply(&self, method: &str) -> GatewayReply {
        let mut replies = self.replies.lock().unwrap();
        match replies.get_mut(method) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) if !queue.is_empty() => queue[0].clone(),
            _ => GatewayReply::error(-32601, &format!("method {} not scripted", method)),
        }
    }
}

#[async_trait]
impl Transport for MockGateway {
    async fn post(&self, body: Vec<u8>) -> DeployerResult<HttpReply> {
        let request: Value = serde_json::from_slice(&body)?;
        self.requests
            .lock()
            .unwrap()
            .push((Instant::now(), request.clone()));

        let method = request["method"].as_str().unwrap_or_default().to_string();
        let id = request["id"].clone();

        let reply = match self.next_reply(&method) {
            GatewayReply::Result(result) => HttpReply::new(
                200,
                json!({"jsonrpc": "2.0", "id": id, "result": result}).to_string(),
            ),
            GatewayReply::Error { code, message } => HttpReply::new(
                200,
                json!({"jsonrpc": "2.0", "id": id, "error": {"code": code, "message": message}})
                    .to_string(),
            ),
            GatewayReply::Status(status) => HttpReply::new(status, "gateway says no"),
            GatewayReply::Raw(body) => HttpReply::new(200, body),
        };

        Ok(reply)
    }
}
