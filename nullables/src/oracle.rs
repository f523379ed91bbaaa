//! Nullable balance oracle: coin balances set by the test.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use agora_store::BalanceOracle;
use agora_types::{BlockHeight, KeyId};

/// Spendable balances under direct test control.
#[derive(Default)]
pub struct NullBalanceOracle {
    balances: Mutex<BTreeMap<KeyId, u64>>,
    height: AtomicU64,
}

impl NullBalanceOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_balances(balances: impl IntoIterator<Item = (KeyId, u64)>) -> Self {
        let oracle = Self::new();
        for (address, amount) in balances {
            oracle.set_balance(address, amount);
        }
        oracle
    }

    /// Set a balance; 0 forgets the address.
    pub fn set_balance(&self, address: KeyId, amount: u64) {
        let mut balances = self.balances.lock().unwrap();
        if amount == 0 {
            balances.remove(&address);
        } else {
            balances.insert(address, amount);
        }
    }

    pub fn set_height(&self, height: BlockHeight) {
        self.height.store(height, Ordering::SeqCst);
    }
}

impl BalanceOracle for NullBalanceOracle {
    fn spendable_balance(&self, address: &KeyId) -> u64 {
        self.balances.lock().unwrap().get(address).copied().unwrap_or(0)
    }

    fn chain_height(&self) -> BlockHeight {
        self.height.load(Ordering::SeqCst)
    }

    fn balances(&self) -> Vec<(KeyId, u64)> {
        self.balances
            .lock()
            .unwrap()
            .iter()
            .map(|(k, v)| (*k, *v))
            .collect()
    }
}
