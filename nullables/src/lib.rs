//! Nullable infrastructure for deterministic testing.
//!
//! Inspired by the "A-frame architecture" pattern from RsNano.
//! Everything outside the ledger state machine (chain tip, coin balances,
//! storage, the wallet that broadcasts transactions) sits behind a trait.
//! This crate provides test-friendly implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically
//! - Never touch the filesystem or network
//!
//! Usage: swap real implementations for nullables in tests.

pub mod clock;
pub mod oracle;
pub mod store;
pub mod tx_builder;

pub use clock::NullClock;
pub use oracle::NullBalanceOracle;
pub use store::{NullBatch, NullSnapshot, NullStore};
pub use tx_builder::{NullTxBuilder, SubmittedTx};
