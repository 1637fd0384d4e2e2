//! Configuration management for the Amoy deployer
//!
//! Loads configuration from a TOML file with environment variable substitution.

use crate::rpc::{RetryPolicy, RpcEndpoint};

use anyhow::{Context, Result};
use ethers::types::U256;
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "DEPLOYER_CONFIG";

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub rpc: RpcConfig,
    #[serde(default)]
    pub transactions: TransactionConfig,
    #[serde(default)]
    pub wallet: WalletConfig,
    #[serde(default)]
    pub deployments: DeploymentsConfig,
    /// Known contract addresses by name
    #[serde(default)]
    pub contracts: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcConfig {
    pub url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_rate_limit_interval_ms")]
    pub rate_limit_interval_ms: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_submit_max_retries")]
    pub submit_max_retries: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_jitter_ms")]
    pub max_jitter_ms: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransactionConfig {
    /// Fetched with `eth_chainId` when absent
    #[serde(default)]
    pub chain_id: Option<u64>,
    #[serde(default = "default_gas_price_wei")]
    pub default_gas_price_wei: u64,
    #[serde(default = "default_gas_limit")]
    pub default_gas_limit: u64,
    #[serde(default = "default_gas_limit_buffer_percent")]
    pub gas_limit_buffer_percent: u64,
    #[serde(default = "default_receipt_max_attempts")]
    pub receipt_max_attempts: u32,
    #[serde(default = "default_receipt_poll_interval_secs")]
    pub receipt_poll_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WalletConfig {
    #[serde(default = "default_private_key_env")]
    pub private_key_env: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeploymentsConfig {
    #[serde(default = "default_deployments_path")]
    pub path: PathBuf,
}

fn default_rate_limit_interval_ms() -> u64 {
    400
}

fn default_max_retries() -> u32 {
    3
}

fn default_submit_max_retries() -> u32 {
    5
}

fn default_base_delay_ms() -> u64 {
    1_000
}

fn default_max_jitter_ms() -> u64 {
    500
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_gas_price_wei() -> u64 {
    30_000_000_000
}

fn default_gas_limit() -> u64 {
    3_000_000
}

fn default_gas_limit_buffer_percent() -> u64 {
    20
}

fn default_receipt_max_attempts() -> u32 {
    40
}

fn default_receipt_poll_interval_secs() -> u64 {
    3
}

fn default_private_key_env() -> String {
    "PRIVATE_KEY".to_string()
}

fn default_deployments_path() -> PathBuf {
    PathBuf::from("deployments/amoy.toml")
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            chain_id: None,
            default_gas_price_wei: default_gas_price_wei(),
            default_gas_limit: default_gas_limit(),
            gas_limit_buffer_percent: default_gas_limit_buffer_percent(),
            receipt_max_attempts: default_receipt_max_attempts(),
            receipt_poll_interval_secs: default_receipt_poll_interval_secs(),
        }
    }
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            private_key_env: default_private_key_env(),
        }
    }
}

impl Default for DeploymentsConfig {
    fn default() -> Self {
        Self {
            path: default_deployments_path(),
        }
    }
}

impl Settings {
    /// Load settings from the path in `DEPLOYER_CONFIG`, or `config/default.toml`
    pub fn load() -> Result<Self> {
        let config_path = env::var(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config/default.toml"));
        Self::load_from(&config_path)
    }

    /// Load settings from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::from_toml(&config_str)
    }

    /// Parse settings from TOML text, substituting `${VAR}` references first
    pub fn from_toml(input: &str) -> Result<Self> {
        let config_str = substitute_env_vars(input);

        let settings: Settings =
            toml::from_str(&config_str).with_context(|| "Failed to parse configuration")?;

        settings.validate()?;

        Ok(settings)
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        let url = self.rpc.url.trim();
        if url.is_empty() {
            anyhow::bail!("rpc.url must be set");
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            anyhow::bail!("rpc.url must be an http(s) URL, got {}", url);
        }
        if self.rpc.rate_limit_interval_ms == 0 {
            tracing::warn!("rpc.rate_limit_interval_ms is 0 - gateway rate limiting disabled");
        }
        if self.transactions.receipt_max_attempts == 0 {
            anyhow::bail!("transactions.receipt_max_attempts must be at least 1");
        }
        if self.transactions.default_gas_limit == 0 {
            anyhow::bail!("transactions.default_gas_limit must be positive");
        }

        Ok(())
    }

    /// Endpoint for the RPC client; a blank API key counts as none
    pub fn endpoint(&self) -> RpcEndpoint {
        let api_key = self
            .rpc
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string);
        RpcEndpoint::new(self.rpc.url.trim(), api_key)
    }

    /// Retry policy for plain reads
    pub fn read_retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.rpc.max_retries,
            Duration::from_millis(self.rpc.base_delay_ms),
            Duration::from_millis(self.rpc.max_jitter_ms),
        )
    }

    /// Retry policy for the transaction submission path
    pub fn submit_retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.rpc.submit_max_retries,
            Duration::from_millis(self.rpc.base_delay_ms),
            Duration::from_millis(self.rpc.max_jitter_ms),
        )
    }

    pub fn rate_limit_interval(&self) -> Duration {
        Duration::from_millis(self.rpc.rate_limit_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc.request_timeout_secs)
    }

    /// Private key from the configured environment variable
    pub fn private_key(&self) -> Result<String> {
        env::var(&self.wallet.private_key_env).with_context(|| {
            format!(
                "No wallet configured. Set {} to a hex private key",
                self.wallet.private_key_env
            )
        })
    }

    /// Get a configured contract address by name
    pub fn contract(&self, name: &str) -> Option<&str> {
        self.contracts
            .get(name)
            .map(|a| a.trim())
            .filter(|a| !a.is_empty())
    }
}

impl TransactionConfig {
    pub fn default_gas_price(&self) -> U256 {
        U256::from(self.default_gas_price_wei)
    }

    pub fn default_gas_limit(&self) -> U256 {
        U256::from(self.default_gas_limit)
    }

    pub fn receipt_poll_interval(&self) -> Duration {
        Duration::from_secs(self.receipt_poll_interval_secs)
    }
}

/// Substitute environment variables in the format ${VAR_NAME}
fn substitute_env_vars(input: &str) -> String {
    lazy_static::lazy_static! {
        static ref ENV_VAR: regex::Regex = regex::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
            .expect("env var pattern is valid");
    }

    let mut result = input.to_string();
    for cap in ENV_VAR.captures_iter(input) {
        let var_name = &cap[1];
        let var_value = env::var(var_name).unwrap_or_default();
        result = result.replace(&cap[0], &var_value);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_env_var_substitution() {
        env::set_var("DEPLOYER_TEST_VAR", "test_value");
        let input = "url = \"https://api.example.com/${DEPLOYER_TEST_VAR}/endpoint\"";
        let result = substitute_env_vars(input);
        assert_eq!(result, "url = \"https://api.example.com/test_value/endpoint\"");
    }

    #[test]
    fn test_missing_env_var_becomes_empty() {
        let result = substitute_env_vars("key = \"${DEPLOYER_TEST_SURELY_UNSET}\"");
        assert_eq!(result, "key = \"\"");
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let settings = Settings::from_toml("[rpc]\nurl = \"https://rpc.example\"\n").unwrap();

        assert_eq!(settings.rpc.rate_limit_interval_ms, 400);
        assert_eq!(settings.rpc.max_retries, 3);
        assert_eq!(settings.rpc.submit_max_retries, 5);
        assert_eq!(settings.transactions.chain_id, None);
        assert_eq!(
            settings.transactions.default_gas_price(),
            U256::from(30_000_000_000u64)
        );
        assert_eq!(settings.transactions.receipt_max_attempts, 40);
        assert_eq!(settings.wallet.private_key_env, "PRIVATE_KEY");
        assert!(settings.endpoint().api_key().is_none());
    }

    #[test]
    fn test_blank_api_key_is_none() {
        let settings = Settings::from_toml(
            "[rpc]\nurl = \"https://rpc.example\"\napi_key = \"${DEPLOYER_TEST_UNSET_KEY}\"\n",
        )
        .unwrap();
        assert!(settings.endpoint().api_key().is_none());
    }

    #[test]
    fn test_rejects_non_http_url() {
        let err = Settings::from_toml("[rpc]\nurl = \"wss://rpc.example\"\n").unwrap_err();
        assert!(err.to_string().contains("http"));
    }

    #[test]
    fn test_load_from_file_with_contracts() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[rpc]
url = "https://rpc.example"
api_key = "secret"
max_retries = 2

[transactions]
chain_id = 80002
default_gas_limit = 500000

[contracts]
token = "0x00000000000000000000000000000000000000aa"
vesting = ""
"#
        )
        .unwrap();

        let settings = Settings::load_from(file.path()).unwrap();
        assert_eq!(settings.rpc.max_retries, 2);
        assert_eq!(settings.transactions.chain_id, Some(80002));
        assert_eq!(settings.read_retry_policy().max_retries, 2);
        assert_eq!(settings.transactions.default_gas_limit(), U256::from(500_000));
        assert_eq!(settings.endpoint().api_key(), Some("secret"));
        assert_eq!(
            settings.contract("token"),
            Some("0x00000000000000000000000000000000000000aa")
        );
        assert_eq!(settings.contract("vesting"), None);
    }
}
