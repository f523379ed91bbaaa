use agora_types::{BlockHeight, KeyId};
use serde::{Deserialize, Serialize};

/// A registered block-producer candidate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegateRecord {
    pub address: KeyId,
    pub name: String,
    pub registered_height: BlockHeight,
}
