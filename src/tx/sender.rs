//! Transaction submitter: nonce and gas selection, signing, sending, and
//! receipt polling

use super::draft::{SentTransaction, SignedTransaction, TransactionDraft};
use super::gas::GasEstimator;
use crate::chain::{ChainProvider, TransactionReceipt, TxOutcome};
use crate::config::TransactionConfig;
use crate::error::{DeployerError, DeployerResult};
use crate::metrics;

use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, Bytes, U256};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// How long to wait for a receipt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiptPolicy {
    pub max_attempts: u32,
    pub poll_interval: Duration,
}

impl ReceiptPolicy {
    pub fn new(max_attempts: u32, poll_interval: Duration) -> Self {
        Self {
            max_attempts,
            poll_interval,
        }
    }

    pub fn from_config(config: &TransactionConfig) -> Self {
        Self::new(config.receipt_max_attempts, config.receipt_poll_interval())
    }
}

impl Default for ReceiptPolicy {
    fn default() -> Self {
        Self::new(40, Duration::from_secs(3))
    }
}

/// Turns a destination and call data into a confirmed on-chain effect
pub struct TransactionSubmitter {
    /// Chain provider
    provider: Arc<ChainProvider>,
    /// Wallet for signing
    wallet: LocalWallet,
    /// Gas estimator
    gas_estimator: GasEstimator,
    receipts: ReceiptPolicy,
    chain_id: u64,
    /// Serialises sends from this key so nonces cannot collide
    send_lock: Mutex<()>,
}

impl TransactionSubmitter {
    /// Create a submitter; the chain id is fetched when not configured
    pub async fn new(
        provider: Arc<ChainProvider>,
        wallet: LocalWallet,
        config: &TransactionConfig,
    ) -> DeployerResult<Self> {
        let chain_id = match config.chain_id {
            Some(chain_id) => chain_id,
            None => provider.chain_id().await?,
        };

        info!(
            "Transaction submitter initialized with wallet {:?} on chain {}",
            wallet.address(),
            chain_id
        );

        Ok(Self::with_parts(
            provider,
            wallet,
            chain_id,
            GasEstimator::from_config(config),
            ReceiptPolicy::from_config(config),
        ))
    }

    pub fn with_parts(
        provider: Arc<ChainProvider>,
        wallet: LocalWallet,
        chain_id: u64,
        gas_estimator: GasEstimator,
        receipts: ReceiptPolicy,
    ) -> Self {
        Self {
            provider,
            wallet,
            gas_estimator,
            receipts,
            chain_id,
            send_lock: Mutex::new(()),
        }
    }

    pub fn provider(&self) -> &ChainProvider {
        &self.provider
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Get wallet address
    pub fn wallet_address(&self) -> Address {
        self.wallet.address()
    }

    /// Next nonce for `address`; errors propagate
    pub async fn get_nonce(&self, address: Address) -> DeployerResult<u64> {
        let nonce = self.provider.get_transaction_count(address).await?;
        debug!("Nonce for {:?}: {}", address, nonce);
        Ok(nonce)
    }

    /// Gas price with the default substituted for zero or failed answers
    pub async fn get_gas_price(&self) -> U256 {
        self.gas_estimator.gas_price(&self.provider).await
    }

    /// Gas limit with the default substituted for zero or failed estimates
    pub async fn estimate_gas(&self, to: Option<Address>, data: &Bytes) -> U256 {
        self.gas_estimator
            .gas_limit(&self.provider, self.wallet.address(), to, data)
            .await
    }

    /// Sign a fully populated draft
    pub fn build_and_sign(&self, draft: TransactionDraft) -> DeployerResult<SignedTransaction> {
        let signed = draft.sign(&self.wallet)?;
        debug!(
            "Signed transaction {:?} (nonce {}, {} bytes)",
            signed.hash(),
            signed.nonce(),
            signed.raw().len()
        );
        Ok(signed)
    }

    /// Fail with `InsufficientBalance` when the signer cannot cover
    /// `gas_limit * gas_price`
    pub async fn ensure_balance(&self, gas_limit: U256, gas_price: U256) -> DeployerResult<()> {
        let cost = GasEstimator::calculate_cost(gas_limit, gas_price);
        let balance = self.provider.get_balance(self.wallet.address()).await?;
        if balance < cost {
            warn!(
                "Wallet {:?} balance {} wei is below the required {} wei",
                self.wallet.address(),
                balance,
                cost
            );
            return Err(DeployerError::InsufficientBalance {
                have: balance.to_string(),
                need: cost.to_string(),
            });
        }
        Ok(())
    }

    /// Submit signed bytes. A blank hash means the network refused the
    /// transaction (usually balance or nonce).
    pub async fn send(&self, signed: SignedTransaction) -> DeployerResult<SentTransaction> {
        let tx_hash = self.provider.send_raw_transaction(signed.raw()).await?;

        if tx_hash.is_empty() || tx_hash == "0x" {
            metrics::record_tx_rejected();
            return Err(DeployerError::TransactionRejected(format!(
                "empty transaction hash for nonce {} (check balance and nonce)",
                signed.nonce()
            )));
        }

        let local_hash = format!("{:?}", signed.hash());
        if !tx_hash.eq_ignore_ascii_case(&local_hash) {
            warn!(
                "Gateway returned hash {} but the signed bytes hash to {}",
                tx_hash, local_hash
            );
        }

        metrics::record_tx_submitted();
        info!(
            "Transaction sent: {} (from {:?}, nonce {})",
            tx_hash,
            signed.from(),
            signed.nonce()
        );
        Ok(SentTransaction {
            tx_hash,
            nonce: signed.nonce(),
        })
    }

    /// Poll for a receipt. Missing receipts and polling errors are not
    /// failures; `None` after `max_attempts` polls means the outcome is unknown.
    pub async fn wait_for_receipt(
        &self,
        tx_hash: &str,
        max_attempts: u32,
        poll_interval: Duration,
    ) -> Option<TransactionReceipt> {
        for attempt in 1..=max_attempts {
            match self.provider.get_transaction_receipt(tx_hash).await {
                Ok(Some(receipt)) => {
                    debug!("Receipt for {} after {} polls", tx_hash, attempt);
                    return Some(receipt);
                }
                Ok(None) => {
                    debug!(
                        "Waiting for {} ({}/{})",
                        tx_hash, attempt, max_attempts
                    );
                }
                Err(e) => {
                    warn!(
                        "Error polling receipt for {} ({}/{}): {}",
                        tx_hash, attempt, max_attempts, e
                    );
                }
            }

            if attempt < max_attempts {
                tokio::time::sleep(poll_interval).await;
            }
        }

        warn!(
            "No receipt for {} after {} polls - outcome unknown",
            tx_hash, max_attempts
        );
        None
    }

    /// Wait with the configured policy and classify the result
    pub async fn confirm(&self, sent: &SentTransaction) -> TxOutcome {
        let outcome = match self
            .wait_for_receipt(
                &sent.tx_hash,
                self.receipts.max_attempts,
                self.receipts.poll_interval,
            )
            .await
        {
            Some(receipt) => receipt.outcome(&sent.tx_hash),
            None => TxOutcome::Unknown {
                tx_hash: sent.tx_hash.clone(),
            },
        };

        match &outcome {
            TxOutcome::Succeeded { .. } => info!("Transaction {}", outcome),
            _ => warn!("Transaction {}", outcome),
        }
        metrics::record_tx_outcome(&outcome);
        outcome
    }

    /// Full pipeline: nonce, gas, balance check, sign, send, confirm.
    /// `to` is `None` for contract creation.
    pub async fn submit(&self, to: Option<Address>, data: Bytes) -> DeployerResult<TxOutcome> {
        let _guard = self.send_lock.lock().await;

        let from = self.wallet.address();
        let nonce = self.get_nonce(from).await?;
        let gas_price = self.get_gas_price().await;
        let gas_limit = self.estimate_gas(to, &data).await;

        let draft = TransactionDraft::new(self.chain_id, to, data)
            .nonce(nonce)
            .gas_price(gas_price)
            .gas_limit(gas_limit);

        self.ensure_balance(draft.gas_limit, draft.gas_price).await?;

        let signed = self.build_and_sign(draft)?;
        let sent = self.send(signed).await?;
        Ok(self.confirm(&sent).await)
    }

    /// Deploy contract creation bytecode
    pub async fn deploy(&self, bytecode: Bytes) -> DeployerResult<TxOutcome> {
        if bytecode.is_empty() {
            return Err(DeployerError::InvalidRequest(
                "contract bytecode is empty".to_string(),
            ));
        }
        info!("Deploying contract ({} bytes of init code)", bytecode.len());
        self.submit(None, bytecode).await
    }
}
