//! Transaction assembly, signing, submission and confirmation

mod draft;
mod gas;
mod sender;

pub use draft::{load_wallet, SentTransaction, SignedTransaction, TransactionDraft};
pub use gas::GasEstimator;
pub use sender::{ReceiptPolicy, TransactionSubmitter};

#[cfg(test)]
pub(crate) use draft::tests::dev_wallet;
