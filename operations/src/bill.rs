//! Bill submission and bill votes.

use agora_types::BillId;
use serde::{Deserialize, Serialize};

/// Submit a bill on behalf of the sending committee.
///
/// The bill id is the hash160 of `title`. Voting opens at the including
/// block's time and runs for `duration_days` days.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitBill {
    pub title: String,
    pub detail: String,
    pub url: String,
    pub duration_days: u16,
    pub options: Vec<String>,
}

/// Vote for option `option` of `bill`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteBill {
    pub bill: BillId,
    pub option: u8,
}
