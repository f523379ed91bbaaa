//! Bill records, votes and frozen outcomes.

use agora_types::{BillId, BlockHeight, KeyId, Timestamp};
use serde::{Deserialize, Serialize};

/// A bill submitted by a committee.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillRecord {
    pub id: BillId,
    pub title: String,
    pub detail: String,
    pub url: String,
    pub committee: KeyId,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub options: Vec<String>,
    pub submitted_height: BlockHeight,
}

impl BillRecord {
    /// Voting is closed once block time reaches `end_time`.
    pub fn is_finished_at(&self, time: Timestamp) -> bool {
        time >= self.end_time
    }
}

/// One voter's choice on a bill.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillVote {
    pub option: u8,
    /// The voter's balance captured when the bill was frozen. `None` while
    /// the bill is still live.
    pub weight: Option<u64>,
}

/// The frozen outcome of a bill, written once when its voting window closes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillState {
    pub passed: bool,
    /// Option with the highest total, lowest index on ties. `None` when no
    /// weight was cast.
    pub winning_option: Option<u8>,
    pub total_vote: u64,
    pub option_totals: Vec<u64>,
    pub finalized_height: BlockHeight,
    pub finalized_time: Timestamp,
}
