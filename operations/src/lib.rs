//! Agora ledger operations and their wire codec.
//!
//! Operation types:
//! - **RegisterDelegate / VoteDelegates / RevokeDelegates**: block-producer candidacy and approval votes
//! - **RegisterCommittee / VoteCommittee / RevokeCommittee**: governance committees and their backers
//! - **SubmitBill / VoteBill**: committee bills with a fixed voting window
//! - **RegisterName**: a unique human-readable name for an address
//! - **CreateToken / TransferToken / LockToken**: user-issued fungible tokens
//!
//! Every payload is one opcode byte followed by a canonical body. See [`codec`].

pub mod bill;
pub mod builder;
pub mod codec;
pub mod committee;
pub mod delegate;
pub mod error;
pub mod name;
pub mod opcode;
pub mod token;
pub mod validation;

pub use bill::{SubmitBill, VoteBill};
pub use builder::{BuildError, TransactionBuilder};
pub use codec::{decode, encode, MAX_PAYLOAD_LEN};
pub use committee::{RegisterCommittee, RevokeCommittee, VoteCommittee};
pub use delegate::{DelegateSet, RegisterDelegate};
pub use error::{CodecError, FormatError};
pub use name::RegisterName;
pub use opcode::Opcode;
pub use token::{CreateToken, LockToken, TransferToken};
pub use validation::check_format;

use agora_types::FeeSchedule;

/// The unified operation enum wrapping every payload type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operation {
    RegisterDelegate(RegisterDelegate),
    VoteDelegates(DelegateSet),
    RevokeDelegates(DelegateSet),
    RegisterCommittee(RegisterCommittee),
    VoteCommittee(VoteCommittee),
    RevokeCommittee(RevokeCommittee),
    SubmitBill(SubmitBill),
    VoteBill(VoteBill),
    RegisterName(RegisterName),
    CreateToken(CreateToken),
    TransferToken(TransferToken),
    LockToken(LockToken),
    /// A payload whose opcode this node does not know. Skipped on apply.
    Unrecognized { opcode: u8, body: Vec<u8> },
}

impl Operation {
    /// The opcode this operation travels under, `None` for unrecognized payloads.
    pub fn opcode(&self) -> Option<Opcode> {
        Some(match self {
            Self::RegisterDelegate(_) => Opcode::RegisterDelegate,
            Self::VoteDelegates(_) => Opcode::VoteDelegates,
            Self::RevokeDelegates(_) => Opcode::RevokeDelegates,
            Self::RegisterCommittee(_) => Opcode::RegisterCommittee,
            Self::VoteCommittee(_) => Opcode::VoteCommittee,
            Self::RevokeCommittee(_) => Opcode::RevokeCommittee,
            Self::SubmitBill(_) => Opcode::SubmitBill,
            Self::VoteBill(_) => Opcode::VoteBill,
            Self::RegisterName(_) => Opcode::RegisterName,
            Self::CreateToken(_) => Opcode::CreateToken,
            Self::TransferToken(_) => Opcode::TransferToken,
            Self::LockToken(_) => Opcode::LockToken,
            Self::Unrecognized { .. } => return None,
        })
    }

    /// Short lowercase name, used in logs and metrics labels.
    pub fn kind(&self) -> &'static str {
        self.opcode().map(Opcode::name).unwrap_or("unrecognized")
    }

    /// Minimum fee the carrying transaction must pay.
    pub fn min_fee(&self, fees: &FeeSchedule) -> u64 {
        match self.opcode() {
            Some(op) => op.min_fee(fees),
            None => 0,
        }
    }
}
