//! Transaction receipts and submission outcomes

use super::{parse_quantity, parse_quantity_u64};
use crate::abi::parse_address;

use ethers::types::{Address, U256};
use serde::Deserialize;
use std::fmt;

/// The subset of `eth_getTransactionReceipt` the deployer reads
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    #[serde(default)]
    pub transaction_hash: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub gas_used: Option<String>,
    #[serde(default)]
    pub contract_address: Option<String>,
    #[serde(default)]
    pub block_number: Option<String>,
}

impl TransactionReceipt {
    /// Hex-decoded status; `None` when absent or malformed
    pub fn status_code(&self) -> Option<u64> {
        self.status
            .as_deref()
            .and_then(|s| parse_quantity_u64(s).ok())
    }

    /// Only status 1 is success; anything else is an on-chain revert
    pub fn succeeded(&self) -> bool {
        self.status_code() == Some(1)
    }

    pub fn block_number(&self) -> Option<u64> {
        self.block_number
            .as_deref()
            .and_then(|b| parse_quantity_u64(b).ok())
    }

    /// Gas used, only for successful receipts
    pub fn gas_used(&self) -> Option<U256> {
        if !self.succeeded() {
            return None;
        }
        self.gas_used.as_deref().and_then(|g| parse_quantity(g).ok())
    }

    /// Created contract, only for successful creation receipts
    pub fn contract_address(&self) -> Option<Address> {
        if !self.succeeded() {
            return None;
        }
        self.contract_address
            .as_deref()
            .and_then(|a| parse_address(a).ok())
    }

    /// Classify the receipt for `tx_hash`
    pub fn outcome(&self, tx_hash: &str) -> TxOutcome {
        let tx_hash = self
            .transaction_hash
            .clone()
            .unwrap_or_else(|| tx_hash.to_string());

        if self.succeeded() {
            TxOutcome::Succeeded {
                tx_hash,
                block_number: self.block_number(),
                gas_used: self.gas_used().unwrap_or_default(),
                contract_address: self.contract_address(),
            }
        } else {
            TxOutcome::Reverted {
                tx_hash,
                block_number: self.block_number(),
            }
        }
    }
}

/// Final state of one submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxOutcome {
    /// Mined with status 1
    Succeeded {
        tx_hash: String,
        block_number: Option<u64>,
        gas_used: U256,
        contract_address: Option<Address>,
    },
    /// Mined but reverted on chain
    Reverted {
        tx_hash: String,
        block_number: Option<u64>,
    },
    /// No receipt within the polling budget. The transaction may still be
    /// mined; check the hash externally before retrying.
    Unknown { tx_hash: String },
}

impl TxOutcome {
    pub fn tx_hash(&self) -> &str {
        match self {
            TxOutcome::Succeeded { tx_hash, .. }
            | TxOutcome::Reverted { tx_hash, .. }
            | TxOutcome::Unknown { tx_hash } => tx_hash,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TxOutcome::Succeeded { .. })
    }

    pub fn contract_address(&self) -> Option<Address> {
        match self {
            TxOutcome::Succeeded {
                contract_address, ..
            } => *contract_address,
            _ => None,
        }
    }

    /// Metric label
    pub fn kind(&self) -> &'static str {
        match self {
            TxOutcome::Succeeded { .. } => "succeeded",
            TxOutcome::Reverted { .. } => "reverted",
            TxOutcome::Unknown { .. } => "unknown",
        }
    }
}

impl fmt::Display for TxOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxOutcome::Succeeded {
                tx_hash,
                block_number,
                gas_used,
                contract_address,
            } => {
                write!(f, "{} succeeded", tx_hash)?;
                if let Some(block) = block_number {
                    write!(f, " in block {}", block)?;
                }
                write!(f, " (gas used {})", gas_used)?;
                if let Some(address) = contract_address {
                    write!(f, ", contract {:?}", address)?;
                }
                Ok(())
            }
            TxOutcome::Reverted {
                tx_hash,
                block_number,
            } => match block_number {
                Some(block) => write!(f, "{} reverted in block {}", tx_hash, block),
                None => write!(f, "{} reverted", tx_hash),
            },
            TxOutcome::Unknown { tx_hash } => {
                write!(f, "{} has no receipt yet, outcome unknown", tx_hash)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn receipt(value: serde_json::Value) -> TransactionReceipt {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_successful_creation_receipt() {
        let r = receipt(json!({
            "transactionHash": "0xabc",
            "status": "0x1",
            "gasUsed": "0x5208",
            "contractAddress": "0x00000000000000000000000000000000000000aa",
            "blockNumber": "0x10",
            "logs": []
        }));

        assert!(r.succeeded());
        match r.outcome("0xabc") {
            TxOutcome::Succeeded {
                block_number,
                gas_used,
                contract_address,
                ..
            } => {
                assert_eq!(block_number, Some(16));
                assert_eq!(gas_used, U256::from(21_000));
                assert_eq!(
                    contract_address,
                    Some(parse_address("0x00000000000000000000000000000000000000aa").unwrap())
                );
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_reverted_receipt_hides_gas_and_address() {
        let r = receipt(json!({
            "status": "0x0",
            "gasUsed": "0x5208",
            "contractAddress": "0x00000000000000000000000000000000000000aa",
            "blockNumber": "0x10"
        }));

        assert!(!r.succeeded());
        assert_eq!(r.gas_used(), None);
        assert_eq!(r.contract_address(), None);
        assert_eq!(
            r.outcome("0xdef"),
            TxOutcome::Reverted {
                tx_hash: "0xdef".to_string(),
                block_number: Some(16)
            }
        );
    }

    #[test]
    fn test_missing_or_odd_status_is_revert() {
        assert!(!receipt(json!({})).succeeded());
        assert!(!receipt(json!({"status": "0x2"})).succeeded());
        assert!(receipt(json!({"status": "0x01"})).succeeded());
    }

    #[test]
    fn test_null_contract_address_on_call() {
        let r = receipt(json!({"status": "0x1", "gasUsed": "0x1", "contractAddress": null}));
        assert_eq!(r.contract_address(), None);
        assert!(r.outcome("0x1").is_success());
    }
}
