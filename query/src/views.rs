//! Query results.

use agora_types::{BillId, BlockHeight, KeyId, Timestamp, TokenId};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DelegateInfo {
    pub address: KeyId,
    pub name: String,
}

/// A delegate and the summed live balance of its voters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DelegateWeight {
    pub address: KeyId,
    pub name: String,
    pub votes: u64,
}

/// An address and the weight it carries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoterWeight {
    pub address: KeyId,
    pub votes: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitteeInfo {
    pub address: KeyId,
    pub name: String,
    pub url: String,
    /// Summed live balance of the committee's backers.
    pub votes: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BillSummary {
    pub id: BillId,
    pub title: String,
}

/// Outcome of a bill as seen at the query's chain position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BillStatus {
    pub finished: bool,
    pub passed: bool,
    pub winning_option: Option<u8>,
    pub total_vote: u64,
    pub option_totals: Vec<u64>,
    /// Set once the applier froze the outcome.
    pub finalized_height: Option<BlockHeight>,
}

impl BillStatus {
    pub fn is_frozen(&self) -> bool {
        self.finalized_height.is_some()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BillInfo {
    pub id: BillId,
    pub title: String,
    pub detail: String,
    pub url: String,
    pub committee: KeyId,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub options: Vec<String>,
    pub status: BillStatus,
}

/// Voters of one bill option.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OptionVoters {
    pub index: u8,
    pub voters: Vec<VoterWeight>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoterBill {
    pub bill: BillId,
    pub option: u8,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CoinHolding {
    pub address: KeyId,
    pub balance: u64,
}

/// Addresses whose balance lies in `[threshold, next threshold)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DistributionBucket {
    pub threshold: u64,
    pub addresses: u64,
    pub coins: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenInfo {
    pub id: TokenId,
    pub symbol: String,
    pub name: String,
    pub owner: KeyId,
    pub token_address: KeyId,
    pub total_amount: u64,
    pub digits: u8,
    pub created_height: BlockHeight,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LockView {
    pub expiry_height: BlockHeight,
    pub amount: u64,
    pub matured: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenBalance {
    pub token: TokenId,
    pub symbol: String,
    pub token_address: KeyId,
    pub digits: u8,
    pub available: u64,
    pub locks: Vec<LockView>,
}

impl TokenBalance {
    /// Available balance plus every matured lock.
    pub fn spendable(&self) -> u64 {
        self.locks
            .iter()
            .filter(|l| l.matured)
            .fold(self.available, |acc, l| acc.saturating_add(l.amount))
    }
}
