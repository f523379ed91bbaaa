//! Fundamental types for the Agora ledger.
//!
//! This crate defines the core types shared across every other crate in the workspace:
//! key identifiers, bill and token identifiers, fixed-point amounts, timestamps,
//! chain context and protocol parameters.

pub mod address;
pub mod amount;
pub mod context;
pub mod error;
pub mod hash;
pub mod network;
pub mod params;
pub mod time;
pub mod token;

pub use address::KeyId;
pub use amount::{format_fixed_point, parse_fixed_point, pow10, COIN, MAX_DIGITS};
pub use context::ChainContext;
pub use error::AgoraError;
pub use hash::{BillId, TxHash};
pub use network::NetworkId;
pub use params::{FeeSchedule, ProtocolParams};
pub use time::Timestamp;
pub use token::TokenId;

/// Height of a block in the underlying chain.
pub type BlockHeight = u64;
