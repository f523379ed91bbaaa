use agora_types::{BlockHeight, KeyId};
use serde::{Deserialize, Serialize};

/// A registered governance committee.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitteeRecord {
    pub address: KeyId,
    pub name: String,
    pub url: String,
    pub registered_height: BlockHeight,
}
