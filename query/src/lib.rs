//! Read-side views over the Agora ledger.
//!
//! A [`QueryEngine`] is pinned to one ledger snapshot, one balance oracle and
//! one chain position. Everything weighted by coin balance (delegate and
//! committee standing, open bills) is computed at read time from the
//! oracle; frozen bills return their frozen values.

mod bills;
mod coins;
mod committees;
mod delegates;
mod tokens;

pub mod engine;
pub mod error;
pub mod views;

pub use engine::QueryEngine;
pub use error::QueryError;
pub use views::{
    BillInfo, BillStatus, BillSummary, CoinHolding, CommitteeInfo, DelegateInfo, DelegateWeight,
    DistributionBucket, LockView, OptionVoters, TokenBalance, TokenInfo, VoterBill, VoterWeight,
};

/// Ranking length when the caller gives none.
pub const DEFAULT_COIN_RANK: usize = 100;
