//! Deterministic application of confirmed Agora operations.
//!
//! The [`Applier`] is the only writer of the ledger store. Feeding it the
//! same confirmed blocks always yields the same ledger, checked with
//! [`ledger_digest`].

pub mod applier;
pub mod block;
pub mod digest;
pub mod error;
pub mod replay;

pub use applier::{apply_effect, Applier, ApplierState, BlockReport, TxOutcome};
pub use block::{ConfirmedBlock, ConfirmedTx};
pub use digest::{ledger_digest, LedgerDigest, RecordCounts};
pub use error::LedgerError;
pub use replay::{replay, ReplaySummary};
