//! Prometheus counters for RPC traffic and transaction outcomes

use crate::chain::TxOutcome;
use crate::error::{DeployerError, DeployerResult};

use lazy_static::lazy_static;
use prometheus::{register_int_counter, register_int_counter_vec, Encoder, IntCounter, IntCounterVec, TextEncoder};

lazy_static! {
    // RPC metrics
    pub static ref RPC_REQUESTS: IntCounterVec = register_int_counter_vec!(
        "deployer_rpc_requests_total",
        "JSON-RPC requests sent, including retries",
        &["method"]
    ).unwrap();

    pub static ref RPC_RATE_LIMITED: IntCounterVec = register_int_counter_vec!(
        "deployer_rpc_rate_limited_total",
        "JSON-RPC attempts rejected by the gateway rate limit",
        &["method"]
    ).unwrap();

    pub static ref RPC_RETRIES_EXHAUSTED: IntCounterVec = register_int_counter_vec!(
        "deployer_rpc_retries_exhausted_total",
        "JSON-RPC calls that stayed rate limited after every retry",
        &["method"]
    ).unwrap();

    // Transaction metrics
    pub static ref TX_SUBMITTED: IntCounter = register_int_counter!(
        "deployer_tx_submitted_total",
        "Transactions accepted by the gateway"
    ).unwrap();

    pub static ref TX_REJECTED: IntCounter = register_int_counter!(
        "deployer_tx_rejected_total",
        "Transactions the gateway answered with an empty hash"
    ).unwrap();

    pub static ref TX_OUTCOMES: IntCounterVec = register_int_counter_vec!(
        "deployer_tx_outcomes_total",
        "Final transaction outcomes",
        &["outcome"]
    ).unwrap();
}

pub fn record_rpc_request(method: &str) {
    RPC_REQUESTS.with_label_values(&[method]).inc();
}

pub fn record_rpc_rate_limited(method: &str) {
    RPC_RATE_LIMITED.with_label_values(&[method]).inc();
}

pub fn record_rpc_retries_exhausted(method: &str) {
    RPC_RETRIES_EXHAUSTED.with_label_values(&[method]).inc();
}

pub fn record_tx_submitted() {
    TX_SUBMITTED.inc();
}

pub fn record_tx_rejected() {
    TX_REJECTED.inc();
}

pub fn record_tx_outcome(outcome: &TxOutcome) {
    TX_OUTCOMES.with_label_values(&[outcome.kind()]).inc();
}

/// Text exposition of every registered metric
pub fn render() -> DeployerResult<String> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| DeployerError::Internal(format!("Failed to encode metrics: {}", e)))?;
    String::from_utf8(buffer)
        .map_err(|e| DeployerError::Internal(format!("Metrics are not UTF-8: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_contains_recorded_counters() {
        record_rpc_request("eth_chainId");
        record_tx_outcome(&TxOutcome::Unknown {
            tx_hash: "0x1".to_string(),
        });

        let text = render().unwrap();
        assert!(text.contains("deployer_rpc_requests_total{method=\"eth_chainId\"}"));
        assert!(text.contains("deployer_tx_outcomes_total{outcome=\"unknown\"}"));
    }

    #[test]
    fn test_outcome_labels_are_distinct() {
        let before = TX_OUTCOMES.with_label_values(&["reverted"]).get();
        record_tx_outcome(&TxOutcome::Reverted {
            tx_hash: "0x2".to_string(),
            block_number: None,
        });
        assert!(TX_OUTCOMES.with_label_values(&["reverted"]).get() > before);
    }
}
