//! Validated, ready-to-apply ledger mutations.
//!
//! An [`Effect`] carries every derived value the applier needs (record
//! fields, ids, end times, locks to fold) so applying it never re-reads the
//! rules.

use agora_store::{BillRecord, CommitteeRecord, DelegateRecord, TokenLock, TokenRecord};
use agora_types::{BillId, BlockHeight, KeyId, TokenId};

/// A movement of token units out of `from`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenDebit {
    pub token: TokenId,
    pub from: KeyId,
    pub to: KeyId,
    pub amount: u64,
    /// Matured locks of `from` folded into its available balance first.
    pub matured: Vec<TokenLock>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    RegisterDelegate(DelegateRecord),
    VoteDelegates { voter: KeyId, delegates: Vec<KeyId> },
    RevokeDelegates { voter: KeyId, delegates: Vec<KeyId> },
    RegisterCommittee(CommitteeRecord),
    VoteCommittee { voter: KeyId, committee: KeyId },
    RevokeCommittee { voter: KeyId, committee: KeyId },
    SubmitBill(BillRecord),
    VoteBill { bill: BillId, voter: KeyId, option: u8 },
    RegisterName { address: KeyId, name: String },
    /// The owner receives the whole supply.
    CreateToken(TokenRecord),
    TransferToken(TokenDebit),
    /// Credit `to` with a lock maturing at `expiry_height`.
    LockToken { debit: TokenDebit, expiry_height: BlockHeight },
}

impl Effect {
    /// Short lowercase name, used in logs and events.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RegisterDelegate(_) => "register_delegate",
            Self::VoteDelegates { .. } => "vote_delegates",
            Self::RevokeDelegates { .. } => "revoke_delegates",
            Self::RegisterCommittee(_) => "register_committee",
            Self::VoteCommittee { .. } => "vote_committee",
            Self::RevokeCommittee { .. } => "revoke_committee",
            Self::SubmitBill(_) => "submit_bill",
            Self::VoteBill { .. } => "vote_bill",
            Self::RegisterName { .. } => "register_name",
            Self::CreateToken(_) => "create_token",
            Self::TransferToken(_) => "transfer_token",
            Self::LockToken { .. } => "lock_token",
        }
    }
}
