//! Error types for the Amoy deployer

use thiserror::Error;

/// Main error type for the deployer
#[derive(Error, Debug)]
pub enum DeployerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Connection error: {0}")]
    Connection(#[from] reqwest::Error),

    #[error("Transport error: HTTP {status}: {body}")]
    Transport { status: u16, body: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("RPC error {code}: {message}")]
    Rpc {
        code: i64,
        message: String,
        data: Option<serde_json::Value>,
    },

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Rate limit exceeded for {method} after {attempts} attempts")]
    RateLimitExceeded { method: String, attempts: u32 },

    #[error("Transaction rejected: {0}")]
    TransactionRejected(String),

    #[error("Insufficient balance: have {have} wei, need {need} wei")]
    InsufficientBalance { have: String, need: String },

    #[error("Unsupported ABI type: {0}")]
    UnsupportedType(String),

    #[error("Unknown function signature: {0}")]
    UnknownSignature(String),

    #[error("Invalid function signature: {0}")]
    InvalidSignature(String),

    #[error("Invalid {ty} value {value:?}: {reason}")]
    InvalidValue {
        ty: String,
        value: String,
        reason: String,
    },

    #[error("Wallet error: {0}")]
    Wallet(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DeployerError {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(self, DeployerError::RateLimited(_))
    }

    /// Check if error is any flavour of rate limiting, including exhausted retries
    pub fn is_rate_limit(&self) -> bool {
        matches!(
            self,
            DeployerError::RateLimited(_) | DeployerError::RateLimitExceeded { .. }
        )
    }

    pub(crate) fn invalid_value(ty: &str, value: &str, reason: impl Into<String>) -> Self {
        DeployerError::InvalidValue {
            ty: ty.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for DeployerError {
    fn from(e: serde_json::Error) -> Self {
        DeployerError::Parse(e.to_string())
    }
}

/// Result type for deployer operations
pub type DeployerResult<T> = Result<T, DeployerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_single_rate_limit_is_retryable() {
        assert!(DeployerError::RateLimited("429".into()).is_retryable());
        let exhausted = DeployerError::RateLimitExceeded {
            method: "eth_gasPrice".into(),
            attempts: 4,
        };
        assert!(!exhausted.is_retryable());
        assert!(exhausted.is_rate_limit());
        assert!(!DeployerError::Transport {
            status: 500,
            body: String::new()
        }
        .is_retryable());
    }
}
