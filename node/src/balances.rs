//! The node's coin-balance views.
//!
//! [`BalanceSheet`] is the live view chain sync keeps current and the
//! applier weighs votes with. [`PinnedBalances`] is a frozen copy read from
//! a store snapshot, so a query sees balances and ledger records of the
//! same block.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use agora_store::{BalanceOracle, LedgerView, StoreError};
use agora_types::{BlockHeight, ChainContext, KeyId, Timestamp};

/// Spendable balances as of the last block chain sync delivered.
///
/// Chain sync pushes the balances that changed in a block before the block
/// is applied, so the applier and queries weigh votes at the same height.
#[derive(Default)]
pub struct BalanceSheet {
    balances: RwLock<BTreeMap<KeyId, u64>>,
    height: AtomicU64,
}

impl BalanceSheet {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sheet holding `balances` as of `height`, as recorded by an earlier run.
    pub fn restore(height: BlockHeight, balances: Vec<(KeyId, u64)>) -> Self {
        Self {
            balances: RwLock::new(balances.into_iter().filter(|(_, amount)| *amount > 0).collect()),
            height: AtomicU64::new(height),
        }
    }

    /// Overwrite the balances that changed at `height`. A zero balance
    /// removes the address.
    pub fn update(&self, height: BlockHeight, changes: &[(KeyId, u64)]) {
        let mut balances = self.balances.write().unwrap_or_else(PoisonError::into_inner);
        for (address, amount) in changes {
            if *amount == 0 {
                balances.remove(address);
            } else {
                balances.insert(*address, *amount);
            }
        }
        self.height.store(height, Ordering::SeqCst);
    }

    /// Number of addresses with a non-zero balance.
    pub fn len(&self) -> usize {
        self.balances.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BalanceOracle for BalanceSheet {
    fn spendable_balance(&self, address: &KeyId) -> u64 {
        self.balances
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(address)
            .copied()
            .unwrap_or(0)
    }

    fn chain_height(&self) -> BlockHeight {
        self.height.load(Ordering::SeqCst)
    }

    fn balances(&self) -> Vec<(KeyId, u64)> {
        self.balances
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(address, amount)| (*address, *amount))
            .collect()
    }
}

/// Coin balances and chain position read from one store snapshot.
#[derive(Clone, Debug)]
pub struct PinnedBalances {
    at: ChainContext,
    balances: BTreeMap<KeyId, u64>,
}

impl PinnedBalances {
    /// Read the balances `view` recorded and the block they belong to.
    /// Before chain sync has recorded a block the view is pinned to the
    /// apply cursor, or to height 0, at the epoch.
    pub fn load<V: LedgerView + ?Sized>(view: &V) -> Result<Self, StoreError> {
        let at = match view.synced_block()? {
            Some(block) => block.context(),
            None => ChainContext::new(
                view.apply_cursor()?.map_or(0, |cursor| cursor.height),
                Timestamp::EPOCH,
            ),
        };
        Ok(Self {
            at,
            balances: view.coin_balances()?.into_iter().collect(),
        })
    }

    /// The chain position queries against this view are pinned to.
    pub fn context(&self) -> ChainContext {
        self.at
    }
}

impl BalanceOracle for PinnedBalances {
    fn spendable_balance(&self, address: &KeyId) -> u64 {
        self.balances.get(address).copied().unwrap_or(0)
    }

    fn chain_height(&self) -> BlockHeight {
        self.at.height
    }

    fn balances(&self) -> Vec<(KeyId, u64)> {
        self.balances.iter().map(|(address, amount)| (*address, *amount)).collect()
    }
}
