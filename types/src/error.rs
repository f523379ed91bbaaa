//! Parse errors for the fundamental types.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AgoraError {
    #[error("invalid key id: {0}")]
    InvalidKeyId(String),

    #[error("invalid bill id: {0}")]
    InvalidBillId(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("unknown network: {0}")]
    UnknownNetwork(String),
}
