use agora_store::{BalanceOracle, LedgerView, TokenRecord};
use agora_types::{KeyId, TokenId};

use crate::{LockView, QueryEngine, QueryError, TokenBalance, TokenInfo};

fn token_info(record: TokenRecord) -> TokenInfo {
    TokenInfo {
        id: record.id,
        symbol: record.symbol,
        name: record.name,
        owner: record.owner,
        token_address: record.token_address,
        total_amount: record.total_amount,
        digits: record.digits,
        created_height: record.created_height,
    }
}

impl<V, O> QueryEngine<'_, V, O>
where
    V: LedgerView + ?Sized,
    O: BalanceOracle + ?Sized,
{
    /// Every token, or only the one bound to `token_address`.
    pub fn token_info(&self, token_address: Option<&KeyId>) -> Result<Vec<TokenInfo>, QueryError> {
        let records: Vec<TokenRecord> = match token_address {
            Some(address) => match self.view.token_by_address(address)? {
                Some(id) => self.view.token(id)?.into_iter().collect(),
                None => Vec::new(),
            },
            None => self.view.tokens()?,
        };
        Ok(records.into_iter().map(token_info).collect())
    }

    /// Balances of `holder` in every token it has touched, or in the one
    /// token bound to `token_address`. Locks are flagged matured against
    /// the pinned height.
    pub fn token_balances(
        &self,
        holder: &KeyId,
        token_address: Option<&KeyId>,
    ) -> Result<Vec<TokenBalance>, QueryError> {
        let ids: Vec<TokenId> = match token_address {
            Some(address) => self.view.token_by_address(address)?.into_iter().collect(),
            None => self.view.holder_tokens(holder)?,
        };
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            let Some(record) = self.view.token(id)? else {
                continue;
            };
            let locks = self
                .view
                .token_locks(id, holder)?
                .into_iter()
                .map(|lock| LockView {
                    matured: lock.is_matured_at(self.at.height),
                    expiry_height: lock.expiry_height,
                    amount: lock.amount,
                })
                .collect();
            out.push(TokenBalance {
                token: id,
                symbol: record.symbol,
                token_address: record.token_address,
                digits: record.digits,
                available: self.view.token_balance(id, holder)?,
                locks,
            });
        }
        Ok(out)
    }
}
