//! The wallet boundary: wrapping an encoded payload into a chain transaction.
//!
//! Coin selection, signing and relay belong to the underlying chain. The
//! submission pipeline only hands over a canonical payload, the fee it must
//! pay and the address that pays it.

use std::future::Future;

use agora_types::{KeyId, TxHash};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// The wallet could not fund the transaction.
    #[error("insufficient funds: {0}")]
    InsufficientFunds(String),

    /// The wallet or relay refused the transaction.
    #[error("transaction rejected: {0}")]
    Rejected(String),

    #[error("transaction builder unavailable: {0}")]
    Unavailable(String),
}

/// Builds, signs and broadcasts a transaction carrying `payload`.
pub trait TransactionBuilder: Send + Sync {
    fn submit(
        &self,
        payload: Vec<u8>,
        fee: u64,
        from: KeyId,
    ) -> impl Future<Output = Result<TxHash, BuildError>> + Send;
}
