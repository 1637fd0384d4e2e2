//! Chain module - typed access to the EVM chain behind the JSON-RPC gateway
//!
//! This module provides:
//! - Typed wrappers for the `eth_*` methods the deployer uses
//! - Hex quantity decoding
//! - Transaction receipts and their interpretation

pub mod provider;
pub mod receipt;

pub use provider::ChainProvider;
pub use receipt::{TransactionReceipt, TxOutcome};

use crate::abi::strip_hex_prefix;
use crate::error::{DeployerError, DeployerResult};

use ethers::types::U256;
use serde_json::Value;

/// Decode a hex quantity. Empty (`""` or `"0x"`) decodes to zero since some
/// gateways answer that way instead of `"0x0"`.
pub fn parse_quantity(raw: &str) -> DeployerResult<U256> {
    let digits = strip_hex_prefix(raw.trim());
    if digits.is_empty() {
        return Ok(U256::zero());
    }
    U256::from_str_radix(digits, 16)
        .map_err(|e| DeployerError::Parse(format!("invalid hex quantity {:?}: {}", raw, e)))
}

pub fn parse_quantity_u64(raw: &str) -> DeployerResult<u64> {
    let value = parse_quantity(raw)?;
    if value > U256::from(u64::MAX) {
        return Err(DeployerError::Parse(format!(
            "quantity {:?} does not fit in 64 bits",
            raw
        )));
    }
    Ok(value.as_u64())
}

/// Decode a quantity from a JSON result; `null` counts as empty
pub fn quantity_from_value(method: &str, value: &Value) -> DeployerResult<U256> {
    match value {
        Value::String(s) => parse_quantity(s),
        Value::Null => Ok(U256::zero()),
        other => Err(DeployerError::Parse(format!(
            "{} returned a non-string quantity: {}",
            method, other
        ))),
    }
}

/// Format a quantity the way JSON-RPC expects (`0x` + minimal hex)
pub fn format_quantity(value: U256) -> String {
    format!("{:#x}", value)
}
