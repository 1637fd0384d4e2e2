//! Persistent record of deployed contracts

use crate::chain::TxOutcome;
use crate::error::{DeployerError, DeployerResult};

use chrono::{DateTime, Utc};
use ethers::types::Address;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// One deployed contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    pub address: Address,
    pub tx_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    /// Decimal, TOML integers are too small for gas in general
    pub gas_used: String,
    pub deployed_at: DateTime<Utc>,
}

/// Contract name to deployment, stored as TOML
#[derive(Debug, Clone, Default)]
pub struct DeploymentBook {
    path: PathBuf,
    contracts: BTreeMap<String, DeploymentRecord>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct BookFile {
    #[serde(default)]
    contracts: BTreeMap<String, DeploymentRecord>,
}

impl DeploymentBook {
    /// Load the book at `path`; a missing file is an empty book
    pub fn load(path: impl AsRef<Path>) -> DeployerResult<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            debug!("No deployment record at {}, starting empty", path.display());
            return Ok(Self {
                path,
                contracts: BTreeMap::new(),
            });
        }

        let content = fs::read_to_string(&path)?;
        let file: BookFile = toml::from_str(&content).map_err(|e| {
            DeployerError::Config(format!("Invalid deployment record {}: {}", path.display(), e))
        })?;
        debug!(
            "Loaded {} deployments from {}",
            file.contracts.len(),
            path.display()
        );
        Ok(Self {
            path,
            contracts: file.contracts,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record a deployment outcome. Returns whether anything was recorded:
    /// only successful creations carry an address.
    pub fn record(&mut self, name: &str, outcome: &TxOutcome) -> bool {
        match outcome {
            TxOutcome::Succeeded {
                tx_hash,
                block_number,
                gas_used,
                contract_address: Some(address),
            } => {
                info!("Recording {} at {:?}", name, address);
                self.contracts.insert(
                    name.to_string(),
                    DeploymentRecord {
                        address: *address,
                        tx_hash: tx_hash.clone(),
                        block_number: *block_number,
                        gas_used: gas_used.to_string(),
                        deployed_at: Utc::now(),
                    },
                );
                true
            }
            other => {
                warn!("Not recording {}: {}", name, other);
                false
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&DeploymentRecord> {
        self.contracts.get(name)
    }

    pub fn address_of(&self, name: &str) -> Option<Address> {
        self.get(name).map(|r| r.address)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.contracts.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }

    /// Write the book back, creating parent directories
    pub fn save(&self) -> DeployerResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = BookFile {
            contracts: self.contracts.clone(),
        };
        let content = toml::to_string_pretty(&file)
            .map_err(|e| DeployerError::Internal(format!("Failed to encode deployments: {}", e)))?;
        fs::write(&self.path, content)?;
        info!("Saved {} deployments to {}", self.contracts.len(), self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::types::U256;
    use tempfile::tempdir;

    fn created(address: Address) -> TxOutcome {
        TxOutcome::Succeeded {
            tx_hash: "0xabc".to_string(),
            block_number: Some(12),
            gas_used: U256::from(1_234_567),
            contract_address: Some(address),
        }
    }

    #[test]
    fn test_missing_file_is_empty_book() {
        let dir = tempdir().unwrap();
        let book = DeploymentBook::load(dir.path().join("none.toml")).unwrap();
        assert!(book.is_empty());
        assert_eq!(book.address_of("Token"), None);
    }

    #[test]
    fn test_record_save_and_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("amoy.toml");
        let token = Address::from_low_u64_be(0xaa);

        let mut book = DeploymentBook::load(&path).unwrap();
        assert!(book.record("Token", &created(token)));
        book.save().unwrap();

        let reloaded = DeploymentBook::load(&path).unwrap();
        assert_eq!(reloaded.address_of("Token"), Some(token));
        let record = reloaded.get("Token").unwrap();
        assert_eq!(record.tx_hash, "0xabc");
        assert_eq!(record.block_number, Some(12));
        assert_eq!(record.gas_used, "1234567");
        assert_eq!(reloaded.names().collect::<Vec<_>>(), vec!["Token"]);
    }

    #[test]
    fn test_only_successful_creations_are_recorded() {
        let dir = tempdir().unwrap();
        let mut book = DeploymentBook::load(dir.path().join("d.toml")).unwrap();

        assert!(!book.record(
            "Reverted",
            &TxOutcome::Reverted {
                tx_hash: "0x1".to_string(),
                block_number: Some(1),
            }
        ));
        assert!(!book.record(
            "Unknown",
            &TxOutcome::Unknown {
                tx_hash: "0x2".to_string()
            }
        ));
        assert!(!book.record(
            "Call",
            &TxOutcome::Succeeded {
                tx_hash: "0x3".to_string(),
                block_number: None,
                gas_used: U256::one(),
                contract_address: None,
            }
        ));
        assert!(book.is_empty());
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "contracts = 5").unwrap();
        assert!(matches!(
            DeploymentBook::load(&path),
            Err(DeployerError::Config(_))
        ));
    }
}
