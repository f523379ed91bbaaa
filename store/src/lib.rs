//! Ledger records and abstract storage traits for the Agora ledger.
//!
//! Every storage backend (LMDB, in-memory for testing) implements these
//! traits. The validator, applier and query engine depend only on the traits.

pub mod balance;
pub mod bill;
pub mod clock;
pub mod committee;
pub mod delegate;
pub mod error;
pub mod ledger;
pub mod meta;
pub mod token;

pub use balance::{BalanceOracle, SyncedBlock};
pub use bill::{BillRecord, BillState, BillVote};
pub use clock::ChainClock;
pub use committee::CommitteeRecord;
pub use delegate::DelegateRecord;
pub use error::StoreError;
pub use ledger::{LedgerBatch, LedgerStore, LedgerView};
pub use meta::{ApplyCursor, MetaStore};
pub use token::{TokenLock, TokenRecord};
