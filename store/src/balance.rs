//! The coin-balance boundary.
//!
//! Coin balances live in the UTXO set, which this workspace does not own.
//! The chain-sync side hands the ledger an oracle pinned to the block being
//! processed, so every node derives the same vote weights.

use agora_types::{BlockHeight, ChainContext, KeyId, Timestamp};
use serde::{Deserialize, Serialize};

/// The confirmed block the recorded coin balances belong to.
///
/// Chain sync records a block's balances before its operations are applied,
/// so readers see the balances the applier weighs that block with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncedBlock {
    pub height: BlockHeight,
    pub time: Timestamp,
}

impl SyncedBlock {
    pub fn new(height: BlockHeight, time: Timestamp) -> Self {
        Self { height, time }
    }

    pub fn context(&self) -> ChainContext {
        ChainContext::new(self.height, self.time)
    }
}

/// Read-only view of spendable coin balances at one chain height.
pub trait BalanceOracle: Send + Sync {
    /// Spendable coin balance of `address`, 0 when unknown.
    fn spendable_balance(&self, address: &KeyId) -> u64;

    /// The height the balances are pinned to.
    fn chain_height(&self) -> BlockHeight;

    /// Every address with a non-zero balance, ordered by address.
    fn balances(&self) -> Vec<(KeyId, u64)>;
}

impl<T: BalanceOracle + ?Sized> BalanceOracle for std::sync::Arc<T> {
    fn spendable_balance(&self, address: &KeyId) -> u64 {
        (**self).spendable_balance(address)
    }

    fn chain_height(&self) -> BlockHeight {
        (**self).chain_height()
    }

    fn balances(&self) -> Vec<(KeyId, u64)> {
        (**self).balances()
    }
}
