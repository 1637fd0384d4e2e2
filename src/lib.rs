//! Amoy Deployer - deploys and operates the token, vesting and reward
//! contracts through a rate-limited JSON-RPC gateway.

pub mod abi;
pub mod chain;
pub mod config;
pub mod contracts;
pub mod deployments;
pub mod error;
pub mod metrics;
pub mod rpc;
pub mod tx;

pub use chain::{ChainProvider, TxOutcome};
pub use config::Settings;
pub use contracts::{CallResult, ContractFunction, ContractOperator};
pub use deployments::DeploymentBook;
pub use error::{DeployerError, DeployerResult};
pub use rpc::RpcClient;
pub use tx::TransactionSubmitter;
