//! Gas price and gas limit selection with safe defaults
//!
//! Pricing precision is not worth blocking a deployment over: a zero or failed
//! answer from the gateway falls back to the configured default.

use crate::chain::ChainProvider;
use crate::config::TransactionConfig;

use ethers::types::{Address, Bytes, U256};
use tracing::{debug, warn};

/// Gas estimator for transactions
#[derive(Debug, Clone)]
pub struct GasEstimator {
    default_gas_price: U256,
    default_gas_limit: U256,
    /// Buffer percentage added to a successful estimate (e.g., 20 = 20% buffer)
    gas_limit_buffer_percent: u64,
}

impl GasEstimator {
    pub fn new(default_gas_price: U256, default_gas_limit: U256, gas_limit_buffer_percent: u64) -> Self {
        Self {
            default_gas_price,
            default_gas_limit,
            gas_limit_buffer_percent,
        }
    }

    pub fn from_config(config: &TransactionConfig) -> Self {
        Self::new(
            config.default_gas_price(),
            config.default_gas_limit(),
            config.gas_limit_buffer_percent,
        )
    }

    /// Current gas price, or the default when the gateway reports zero or fails
    pub async fn gas_price(&self, provider: &ChainProvider) -> U256 {
        match provider.gas_price().await {
            Ok(price) if !price.is_zero() => {
                debug!("Gas price: {} wei", price);
                price
            }
            Ok(_) => {
                warn!(
                    "Gateway returned a zero gas price, using default {} wei",
                    self.default_gas_price
                );
                self.default_gas_price
            }
            Err(e) => {
                warn!(
                    "Failed to fetch gas price ({}), using default {} wei",
                    e, self.default_gas_price
                );
                self.default_gas_price
            }
        }
    }

    /// Buffered estimate, or the default limit when estimation fails or returns zero
    pub async fn gas_limit(
        &self,
        provider: &ChainProvider,
        from: Address,
        to: Option<Address>,
        data: &Bytes,
    ) -> U256 {
        match provider.estimate_gas(from, to, data).await {
            Ok(estimate) if !estimate.is_zero() => {
                let buffered = self.with_buffer(estimate);
                debug!("Gas estimate {} -> limit {}", estimate, buffered);
                buffered
            }
            Ok(_) => {
                warn!(
                    "Gas estimate of zero is invalid, using default limit {}",
                    self.default_gas_limit
                );
                self.default_gas_limit
            }
            Err(e) => {
                warn!(
                    "Gas estimation failed ({}), using default limit {}",
                    e, self.default_gas_limit
                );
                self.default_gas_limit
            }
        }
    }

    fn with_buffer(&self, estimate: U256) -> U256 {
        let buffer = estimate * self.gas_limit_buffer_percent / 100;
        estimate.saturating_add(buffer)
    }

    /// Calculate total cost in wei
    pub fn calculate_cost(gas_limit: U256, gas_price: U256) -> U256 {
        gas_limit.saturating_mul(gas_price)
    }
}

impl Default for GasEstimator {
    fn default() -> Self {
        Self::from_config(&TransactionConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::testing::{GatewayReply, MockGateway};
    use crate::rpc::{RateLimiter, RetryPolicy, RpcClient};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    fn provider(gateway: Arc<MockGateway>) -> ChainProvider {
        ChainProvider::new(RpcClient::new(
            gateway,
            Arc::new(RateLimiter::new(Duration::from_millis(400))),
            RetryPolicy::default(),
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_gas_price_uses_default() {
        let gateway = MockGateway::new();
        gateway.on("eth_gasPrice", GatewayReply::result(json!("0x0")));

        let price = GasEstimator::default().gas_price(&provider(gateway)).await;
        assert_eq!(price, U256::from(30_000_000_000u64));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_gas_price_uses_default() {
        let gateway = MockGateway::new();
        gateway.on("eth_gasPrice", GatewayReply::Status(500));

        let price = GasEstimator::default().gas_price(&provider(gateway)).await;
        assert_eq!(price, U256::from(30_000_000_000u64));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reported_gas_price_is_used_as_is() {
        let gateway = MockGateway::new();
        gateway.on("eth_gasPrice", GatewayReply::result(json!("0x77359400")));

        let price = GasEstimator::default().gas_price(&provider(gateway)).await;
        assert_eq!(price, U256::from(2_000_000_000u64));
    }

    #[tokio::test(start_paused = true)]
    async fn test_estimate_gets_buffer() {
        let gateway = MockGateway::new();
        gateway.on("eth_estimateGas", GatewayReply::result(json!("0x186a0")));

        let limit = GasEstimator::default()
            .gas_limit(&provider(gateway), Address::zero(), None, &Bytes::new())
            .await;
        assert_eq!(limit, U256::from(120_000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_or_failed_estimate_uses_default_limit() {
        let estimator = GasEstimator::new(U256::one(), U256::from(250_000), 20);

        let gateway = MockGateway::new();
        gateway.on("eth_estimateGas", GatewayReply::result(json!("0x0")));
        let limit = estimator
            .gas_limit(&provider(gateway), Address::zero(), None, &Bytes::new())
            .await;
        assert_eq!(limit, U256::from(250_000));

        let gateway = MockGateway::new();
        gateway.on(
            "eth_estimateGas",
            GatewayReply::error(3, "execution reverted"),
        );
        let limit = estimator
            .gas_limit(&provider(gateway), Address::zero(), None, &Bytes::new())
            .await;
        assert_eq!(limit, U256::from(250_000));
    }

    #[test]
    fn test_calculate_cost() {
        assert_eq!(
            GasEstimator::calculate_cost(U256::from(21_000), U256::from(30_000_000_000u64)),
            U256::from(630_000_000_000_000u64)
        );
    }
}
