use agora_store::StoreError;
use agora_types::BlockHeight;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    /// The store refused an admitted effect: validation and state disagree.
    /// Fatal; the applier halts.
    #[error("internal inconsistency: {0}")]
    InternalInconsistency(String),

    #[error("block {height} delivered after block {last}")]
    BlockOrder { height: BlockHeight, last: BlockHeight },

    #[error("transaction index {index} out of order in block {height}")]
    TxOrder { height: BlockHeight, index: u32 },

    #[error("applier halted after an internal inconsistency")]
    Halted,

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

impl LedgerError {
    /// Whether the applier can never continue after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::InternalInconsistency(_) | Self::Halted)
    }
}

/// Map store errors raised while applying an admitted effect.
///
/// A duplicate or missing key means the validator admitted something the
/// store cannot hold.
pub(crate) trait Consistent<T> {
    fn consistent(self) -> Result<T, LedgerError>;
}

impl<T> Consistent<T> for Result<T, StoreError> {
    fn consistent(self) -> Result<T, LedgerError> {
        self.map_err(|e| match e {
            StoreError::Duplicate(_) | StoreError::NotFound(_) => {
                LedgerError::InternalInconsistency(e.to_string())
            }
            other => LedgerError::Storage(other),
        })
    }
}
