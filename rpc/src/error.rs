//! RPC error types and their JSON-RPC codes.

use agora_node::NodeError;
use agora_operations::BuildError;
use agora_query::QueryError;
use agora_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("parse error: {0}")]
    Parse(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("method not found: {0}")]
    MethodNotFound(String),

    #[error("invalid params: {0}")]
    InvalidParams(String),

    #[error("{0}")]
    InvalidAddress(String),

    /// The operation failed validation at submission.
    #[error("{0}")]
    Rejected(String),

    #[error("{0}")]
    InsufficientFunds(String),

    /// The transaction builder failed or did not answer.
    #[error("{0}")]
    Wallet(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("server error: {0}")]
    Server(String),
}

impl RpcError {
    /// The JSON-RPC error code. Application errors use the wallet RPC
    /// codes clients of the chain already understand.
    pub fn code(&self) -> i32 {
        match self {
            RpcError::Parse(_) => -32700,
            RpcError::InvalidRequest(_) => -32600,
            RpcError::MethodNotFound(_) => -32601,
            RpcError::InvalidParams(_) => -8,
            RpcError::InvalidAddress(_) => -5,
            RpcError::Rejected(_) => -26,
            RpcError::InsufficientFunds(_) => -6,
            RpcError::Wallet(_) => -4,
            RpcError::Database(_) => -20,
            RpcError::Internal(_) | RpcError::Server(_) => -32603,
        }
    }
}

impl From<StoreError> for RpcError {
    fn from(e: StoreError) -> Self {
        RpcError::Database(e.to_string())
    }
}

impl From<QueryError> for RpcError {
    fn from(e: QueryError) -> Self {
        match e {
            QueryError::UnknownDelegate(_) => RpcError::InvalidAddress(e.to_string()),
            QueryError::NoThresholds | QueryError::ZeroThreshold => {
                RpcError::InvalidParams(e.to_string())
            }
            QueryError::Storage(store) => store.into(),
        }
    }
}

impl From<NodeError> for RpcError {
    fn from(e: NodeError) -> Self {
        match e {
            NodeError::Rejected(rejection) => RpcError::Rejected(rejection.to_string()),
            NodeError::UnknownName { .. } => RpcError::InvalidAddress(e.to_string()),
            NodeError::DuplicateName { .. } | NodeError::Amount(_) => {
                RpcError::InvalidParams(e.to_string())
            }
            NodeError::InsufficientFunds { .. } => RpcError::InsufficientFunds(e.to_string()),
            NodeError::Build(BuildError::InsufficientFunds(reason)) => {
                RpcError::InsufficientFunds(reason)
            }
            NodeError::Build(_) | NodeError::Timeout { .. } => RpcError::Wallet(e.to_string()),
            NodeError::Query(query) => query.into(),
            NodeError::Store(_) | NodeError::Lmdb(_) | NodeError::Ledger(_) => {
                RpcError::Database(e.to_string())
            }
            other => RpcError::Internal(other.to_string()),
        }
    }
}
