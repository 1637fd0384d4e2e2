//! Chain provider over the rate-limited JSON-RPC client

use super::{format_quantity, parse_quantity_u64, quantity_from_value, TransactionReceipt};
use crate::abi::decode_hex;
use crate::error::{DeployerError, DeployerResult};
use crate::rpc::RpcClient;

use ethers::types::{Address, Bytes, U256};
use serde_json::{json, Value};
use tracing::debug;

/// Block tag every read is pinned to
const LATEST: &str = "latest";

/// Typed `eth_*` access to the chain
pub struct ChainProvider {
    rpc: RpcClient,
}

impl ChainProvider {
    pub fn new(rpc: RpcClient) -> Self {
        Self { rpc }
    }

    pub fn rpc(&self) -> &RpcClient {
        &self.rpc
    }

    /// Get chain ID
    pub async fn chain_id(&self) -> DeployerResult<u64> {
        let value = self.rpc.call("eth_chainId", vec![]).await?;
        let chain_id = quantity_from_value("eth_chainId", &value)?;
        if chain_id.is_zero() || chain_id > U256::from(u64::MAX) {
            return Err(DeployerError::Parse(format!(
                "eth_chainId returned {}",
                value
            )));
        }
        Ok(chain_id.as_u64())
    }

    /// Get balance in wei
    pub async fn get_balance(&self, address: Address) -> DeployerResult<U256> {
        let value = self
            .rpc
            .call("eth_getBalance", vec![json!(address), json!(LATEST)])
            .await?;
        quantity_from_value("eth_getBalance", &value)
    }

    /// Get the next nonce for `address`
    pub async fn get_transaction_count(&self, address: Address) -> DeployerResult<u64> {
        let value = self
            .rpc
            .call("eth_getTransactionCount", vec![json!(address), json!(LATEST)])
            .await?;
        match value.as_str() {
            Some(raw) => parse_quantity_u64(raw),
            None => Err(DeployerError::Parse(format!(
                "eth_getTransactionCount returned {}",
                value
            ))),
        }
    }

    /// Gas price as reported; may be zero
    pub async fn gas_price(&self) -> DeployerResult<U256> {
        let value = self.rpc.call("eth_gasPrice", vec![]).await?;
        quantity_from_value("eth_gasPrice", &value)
    }

    /// Estimate gas; `to` absent for contract creation
    pub async fn estimate_gas(
        &self,
        from: Address,
        to: Option<Address>,
        data: &Bytes,
    ) -> DeployerResult<U256> {
        let mut call = json!({
            "from": from,
            "data": data,
            "value": format_quantity(U256::zero()),
        });
        if let Some(to) = to {
            call["to"] = json!(to);
        }

        let value = self.rpc.call("eth_estimateGas", vec![call]).await?;
        quantity_from_value("eth_estimateGas", &value)
    }

    /// Submit signed bytes. Returns the hash string exactly as the gateway
    /// answered; a blank string means the network rejected the transaction.
    pub async fn send_raw_transaction(&self, raw: &Bytes) -> DeployerResult<String> {
        let value = self
            .rpc
            .call("eth_sendRawTransaction", vec![json!(raw)])
            .await?;
        Ok(value.as_str().unwrap_or_default().trim().to_string())
    }

    /// `None` until the transaction is mined
    pub async fn get_transaction_receipt(
        &self,
        tx_hash: &str,
    ) -> DeployerResult<Option<TransactionReceipt>> {
        let value = self
            .rpc
            .call("eth_getTransactionReceipt", vec![json!(tx_hash)])
            .await?;
        if value.is_null() {
            debug!("No receipt yet for {}", tx_hash);
            return Ok(None);
        }
        serde_json::from_value(value)
            .map(Some)
            .map_err(|e| DeployerError::Parse(format!("receipt for {}: {}", tx_hash, e)))
    }

    /// Raw transaction object, `None` if the node does not know the hash
    pub async fn get_transaction_by_hash(&self, tx_hash: &str) -> DeployerResult<Option<Value>> {
        let value = self
            .rpc
            .call("eth_getTransactionByHash", vec![json!(tx_hash)])
            .await?;
        Ok(if value.is_null() { None } else { Some(value) })
    }

    /// Read-only contract call at the latest block
    pub async fn call(&self, to: Address, data: &Bytes) -> DeployerResult<Bytes> {
        let value = self
            .rpc
            .call(
                "eth_call",
                vec![json!({ "to": to, "data": data }), json!(LATEST)],
            )
            .await?;
        let raw = value.as_str().ok_or_else(|| {
            DeployerError::Parse(format!("eth_call returned {}", value))
        })?;
        Ok(Bytes::from(decode_hex(raw)?))
    }
}
