//! Stateful validation for the Agora ledger.
//!
//! [`validate`] is a pure function of the sender, the operation, the chain
//! position it is evaluated at and a read-only ledger view. It either
//! derives an [`Effect`] ready for the applier or explains, through a
//! [`Rejection`], why the operation has no effect.
//!
//! The same function serves both sides of the chain: the submission
//! pipeline validates at the next height and the wall clock before
//! broadcasting, and the applier re-validates at the confirmed block's
//! height and time.

pub mod effect;
pub mod error;
pub mod params;
pub mod tally;
pub mod validator;

pub use effect::{Effect, TokenDebit};
pub use error::{GovernanceError, Rejection};
pub use tally::{tally, BillTally};
pub use validator::{spendable_token_balance, validate};
