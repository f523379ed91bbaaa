use agora_store::{BalanceOracle, LedgerView};
use agora_types::{ChainContext, KeyId};

use crate::QueryError;

/// Read-only queries pinned to one snapshot, balance oracle and chain
/// position. The oracle must describe balances at `at.height`.
pub struct QueryEngine<'a, V: ?Sized, O: ?Sized> {
    pub(crate) view: &'a V,
    pub(crate) oracle: &'a O,
    pub(crate) at: ChainContext,
}

impl<'a, V, O> QueryEngine<'a, V, O>
where
    V: LedgerView + ?Sized,
    O: BalanceOracle + ?Sized,
{
    pub fn new(view: &'a V, oracle: &'a O, at: ChainContext) -> Self {
        Self { view, oracle, at }
    }

    pub fn at(&self) -> ChainContext {
        self.at
    }

    pub fn address_name(&self, address: &KeyId) -> Result<Option<String>, QueryError> {
        Ok(self.view.address_name(address)?)
    }

    pub fn name_address(&self, name: &str) -> Result<Option<KeyId>, QueryError> {
        Ok(self.view.name_address(name)?)
    }

    /// Sum of the live balances of `voters`.
    pub(crate) fn weight_of<'k>(&self, voters: impl IntoIterator<Item = &'k KeyId>) -> u64 {
        voters
            .into_iter()
            .fold(0u64, |acc, v| acc.saturating_add(self.oracle.spendable_balance(v)))
    }
}
