use agora_governance::Rejection;
use agora_operations::BuildError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("ledger error: {0}")]
    Ledger(#[from] agora_ledger::LedgerError),

    #[error("store error: {0}")]
    Store(#[from] agora_store::StoreError),

    #[error("database error: {0}")]
    Lmdb(#[from] agora_store_lmdb::LmdbError),

    #[error("query error: {0}")]
    Query(#[from] agora_query::QueryError),

    #[error("codec error: {0}")]
    Codec(#[from] agora_operations::CodecError),

    /// The operation would have no ledger effect.
    #[error("{0}")]
    Rejected(#[from] Rejection),

    #[error("transaction builder: {0}")]
    Build(#[from] BuildError),

    #[error("transaction builder did not answer within {secs}s")]
    Timeout { secs: u64 },

    #[error("invalid amount: {0}")]
    Amount(#[from] agora_types::AgoraError),

    #[error("unknown {kind} '{name}'")]
    UnknownName { kind: &'static str, name: String },

    #[error("duplicate {kind} '{name}'")]
    DuplicateName { kind: &'static str, name: String },

    #[error("insufficient funds: balance {balance}, fee {required}")]
    InsufficientFunds { balance: u64, required: u64 },

    #[error("config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0} channel closed")]
    ChannelClosed(&'static str),

    #[error("{0}")]
    Other(String),
}

impl From<agora_governance::GovernanceError> for NodeError {
    fn from(error: agora_governance::GovernanceError) -> Self {
        match error {
            agora_governance::GovernanceError::Rejected(rejection) => Self::Rejected(rejection),
            agora_governance::GovernanceError::Store(store) => Self::Store(store),
        }
    }
}
