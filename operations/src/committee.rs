//! Committee registration and committee votes.

use agora_types::KeyId;
use serde::{Deserialize, Serialize};

/// Register the sender as a committee.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterCommittee {
    pub name: String,
    pub url: String,
}

/// Back a committee. A voter backs at most one committee at a time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteCommittee {
    pub committee: KeyId,
}

/// Withdraw the sender's backing from a committee.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevokeCommittee {
    pub committee: KeyId,
}
