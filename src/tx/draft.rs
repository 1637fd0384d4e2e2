//! Transaction drafts and their signed form
//!
//! `TransactionDraft::sign` consumes the draft and `TransactionSubmitter::send`
//! consumes the signed transaction, so an unsigned draft can never reach the
//! network and a signed transaction is sent at most once.

use crate::error::{DeployerError, DeployerResult};

use ethers::signers::{LocalWallet, Signer};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, TransactionRequest, H256, U256};
use ethers::utils::keccak256;

/// Legacy transaction being assembled. `to` is `None` for contract creation;
/// value is always zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionDraft {
    pub chain_id: u64,
    pub nonce: u64,
    pub gas_price: U256,
    pub gas_limit: U256,
    pub to: Option<Address>,
    pub data: Bytes,
}

impl TransactionDraft {
    pub fn new(chain_id: u64, to: Option<Address>, data: Bytes) -> Self {
        Self {
            chain_id,
            nonce: 0,
            gas_price: U256::zero(),
            gas_limit: U256::zero(),
            to,
            data,
        }
    }

    pub fn nonce(mut self, nonce: u64) -> Self {
        self.nonce = nonce;
        self
    }

    pub fn gas_price(mut self, gas_price: U256) -> Self {
        self.gas_price = gas_price;
        self
    }

    pub fn gas_limit(mut self, gas_limit: U256) -> Self {
        self.gas_limit = gas_limit;
        self
    }

    pub fn is_creation(&self) -> bool {
        self.to.is_none()
    }

    /// Upper bound of the fee this draft can burn
    pub fn max_cost(&self) -> U256 {
        self.gas_limit.saturating_mul(self.gas_price)
    }

    fn to_typed(&self, from: Address) -> TypedTransaction {
        let mut request = TransactionRequest::new()
            .from(from)
            .nonce(self.nonce)
            .gas(self.gas_limit)
            .gas_price(self.gas_price)
            .value(U256::zero())
            .data(self.data.clone())
            .chain_id(self.chain_id);
        if let Some(to) = self.to {
            request = request.to(to);
        }
        TypedTransaction::Legacy(request)
    }

    /// EIP-155 sign with `wallet`
    pub fn sign(self, wallet: &LocalWallet) -> DeployerResult<SignedTransaction> {
        let wallet = wallet.clone().with_chain_id(self.chain_id);
        let typed = self.to_typed(wallet.address());

        let signature = wallet
            .sign_transaction_sync(&typed)
            .map_err(|e| DeployerError::Wallet(format!("Failed to sign transaction: {}", e)))?;
        let raw = typed.rlp_signed(&signature);
        let hash = H256::from(keccak256(&raw));

        Ok(SignedTransaction {
            raw,
            hash,
            from: wallet.address(),
            nonce: self.nonce,
            draft: self,
        })
    }
}

/// Signed, RLP-encoded transaction ready for `eth_sendRawTransaction`
#[derive(Debug, Clone)]
pub struct SignedTransaction {
    raw: Bytes,
    hash: H256,
    from: Address,
    nonce: u64,
    draft: TransactionDraft,
}

impl SignedTransaction {
    pub fn raw(&self) -> &Bytes {
        &self.raw
    }

    /// Hash computed locally from the signed bytes
    pub fn hash(&self) -> H256 {
        self.hash
    }

    pub fn from(&self) -> Address {
        self.from
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn draft(&self) -> &TransactionDraft {
        &self.draft
    }
}

/// Transaction accepted by the gateway, awaiting its receipt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentTransaction {
    pub tx_hash: String,
    pub nonce: u64,
}

/// Parse a hex private key (with or without `0x`)
pub fn load_wallet(private_key: &str) -> DeployerResult<LocalWallet> {
    let key = private_key.trim();
    let key = key.strip_prefix("0x").unwrap_or(key);
    key.parse::<LocalWallet>()
        .map_err(|e| DeployerError::Wallet(format!("Invalid private key: {}", e)))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use ethers::types::transaction::eip2718::TypedTransaction;
    use ethers::utils::rlp::Rlp;

    /// Well-known development key (anvil account 0)
    pub(crate) const DEV_KEY: &str =
        "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    pub(crate) fn dev_wallet() -> LocalWallet {
        load_wallet(DEV_KEY).unwrap()
    }

    #[test]
    fn test_load_wallet_with_and_without_prefix() {
        let with = load_wallet(DEV_KEY).unwrap();
        let without = load_wallet(&DEV_KEY[2..]).unwrap();
        assert_eq!(with.address(), without.address());
        assert_eq!(
            format!("{:?}", with.address()),
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        );
    }

    #[test]
    fn test_load_wallet_rejects_garbage() {
        assert!(matches!(
            load_wallet("0x1234"),
            Err(DeployerError::Wallet(_))
        ));
    }

    #[test]
    fn test_signed_transaction_decodes_back() {
        let to = Address::from_low_u64_be(0xaa);
        let draft = TransactionDraft::new(80002, Some(to), Bytes::from(vec![0xa9, 0x05, 0x9c, 0xbb]))
            .nonce(7)
            .gas_price(U256::from(30_000_000_000u64))
            .gas_limit(U256::from(100_000));

        let signed = draft.clone().sign(&dev_wallet()).unwrap();
        assert_eq!(signed.nonce(), 7);
        assert_eq!(signed.from(), dev_wallet().address());
        assert_eq!(signed.draft(), &draft);
        assert_eq!(signed.hash(), H256::from(keccak256(signed.raw())));

        let rlp = Rlp::new(signed.raw());
        let (decoded, signature) = TypedTransaction::decode_signed(&rlp).unwrap();
        assert_eq!(decoded.nonce(), Some(&U256::from(7)));
        assert_eq!(decoded.gas_price(), Some(U256::from(30_000_000_000u64)));
        assert_eq!(decoded.gas(), Some(&U256::from(100_000)));
        assert_eq!(decoded.chain_id().map(|c| c.as_u64()), Some(80002));
        assert_eq!(
            signature.recover(decoded.sighash()).unwrap(),
            dev_wallet().address()
        );
    }

    #[test]
    fn test_creation_draft_has_no_recipient() {
        let draft = TransactionDraft::new(80002, None, Bytes::from(vec![0x60, 0x80]))
            .gas_price(U256::from(2))
            .gas_limit(U256::from(3));
        assert!(draft.is_creation());
        assert_eq!(draft.max_cost(), U256::from(6));

        let signed = draft.sign(&dev_wallet()).unwrap();
        let (decoded, _) = TypedTransaction::decode_signed(&Rlp::new(signed.raw())).unwrap();
        assert!(decoded.to().is_none());
    }
}
