//! Delegate registration and delegate approval votes.

use agora_types::KeyId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Register the sender as a block-producer candidate under `name`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterDelegate {
    pub name: String,
}

/// The delegates a VoteDelegates or RevokeDelegates operation targets.
///
/// Ordered and duplicate-free, so the encoding of a given set is unique.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegateSet {
    pub delegates: BTreeSet<KeyId>,
}

impl DelegateSet {
    pub fn new(delegates: impl IntoIterator<Item = KeyId>) -> Self {
        Self {
            delegates: delegates.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.delegates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.delegates.is_empty()
    }
}
