use agora_store::{BalanceOracle, DelegateRecord, LedgerView};
use agora_types::KeyId;

use crate::{DelegateInfo, DelegateWeight, QueryEngine, QueryError, VoterWeight};

fn info(record: DelegateRecord) -> DelegateInfo {
    DelegateInfo {
        address: record.address,
        name: record.name,
    }
}

impl<V, O> QueryEngine<'_, V, O>
where
    V: LedgerView + ?Sized,
    O: BalanceOracle + ?Sized,
{
    pub fn list_delegates(&self) -> Result<Vec<DelegateInfo>, QueryError> {
        Ok(self.view.delegates()?.into_iter().map(info).collect())
    }

    fn delegate_named(&self, name: &str) -> Result<KeyId, QueryError> {
        self.view
            .delegate_by_name(name)?
            .ok_or_else(|| QueryError::UnknownDelegate(name.to_string()))
    }

    /// Summed live balance of everyone voting for the delegate `name`.
    pub fn delegate_votes(&self, name: &str) -> Result<u64, QueryError> {
        let delegate = self.delegate_named(name)?;
        Ok(self.weight_of(&self.view.delegate_voters(&delegate)?))
    }

    /// The delegate's own live balance.
    pub fn delegate_funds(&self, name: &str) -> Result<u64, QueryError> {
        let delegate = self.delegate_named(name)?;
        Ok(self.oracle.spendable_balance(&delegate))
    }

    /// Delegates `voter` votes for.
    pub fn voted_delegates(&self, voter: &KeyId) -> Result<Vec<DelegateInfo>, QueryError> {
        let mut out = Vec::new();
        for address in self.view.delegate_votes_of(voter)? {
            if let Some(record) = self.view.delegate(&address)? {
                out.push(info(record));
            }
        }
        Ok(out)
    }

    /// Voters of the delegate `name` with their live balances.
    pub fn received_votes(&self, name: &str) -> Result<Vec<VoterWeight>, QueryError> {
        let delegate = self.delegate_named(name)?;
        Ok(self
            .view
            .delegate_voters(&delegate)?
            .into_iter()
            .map(|address| VoterWeight {
                votes: self.oracle.spendable_balance(&address),
                address,
            })
            .collect())
    }

    /// The `n` heaviest delegates whose own balance is at least
    /// `min_balance`, heaviest first, ties by address.
    pub fn top_delegates(&self, n: usize, min_balance: u64) -> Result<Vec<DelegateWeight>, QueryError> {
        let mut ranked = Vec::new();
        for record in self.view.delegates()? {
            if self.oracle.spendable_balance(&record.address) < min_balance {
                continue;
            }
            let votes = self.weight_of(&self.view.delegate_voters(&record.address)?);
            ranked.push(DelegateWeight {
                address: record.address,
                name: record.name,
                votes,
            });
        }
        ranked.sort_by(|a, b| b.votes.cmp(&a.votes).then(a.address.cmp(&b.address)));
        tracing::trace!(eligible = ranked.len(), n, min_balance, "ranked delegates");
        ranked.truncate(n);
        Ok(ranked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_nullables::{NullBalanceOracle, NullStore};
    use agora_store::{LedgerBatch, LedgerStore};
    use agora_types::{ChainContext, Timestamp};

    fn key(b: u8) -> KeyId {
        KeyId::new([b; 20])
    }

    fn store() -> NullStore {
        let store = NullStore::new();
        let mut batch = store.begin_batch().unwrap();
        for (b, name) in [(1, "dana"), (2, "eli"), (3, "fay")] {
            batch
                .insert_delegate(&DelegateRecord {
                    address: key(b),
                    name: name.into(),
                    registered_height: 1,
                })
                .unwrap();
        }
        // Voters 10 and 11 back dana; 11 also backs eli.
        batch.add_delegate_vote(&key(10), &key(1)).unwrap();
        batch.add_delegate_vote(&key(11), &key(1)).unwrap();
        batch.add_delegate_vote(&key(11), &key(2)).unwrap();
        batch.commit().unwrap();
        store
    }

    fn oracle() -> NullBalanceOracle {
        NullBalanceOracle::with_balances([
            (key(1), 50),
            (key(2), 5),
            (key(3), 50),
            (key(10), 300),
            (key(11), 200),
        ])
    }

    fn at() -> ChainContext {
        ChainContext::new(10, Timestamp::new(1_000))
    }

    #[test]
    fn votes_are_live_balances() {
        let store = store();
        let snap = store.snapshot().unwrap();
        let oracle = oracle();
        let q = QueryEngine::new(&snap, &oracle, at());

        assert_eq!(q.delegate_votes("dana").unwrap(), 500);
        assert_eq!(q.delegate_votes("eli").unwrap(), 200);
        assert_eq!(q.delegate_funds("dana").unwrap(), 50);

        oracle.set_balance(key(10), 0);
        assert_eq!(q.delegate_votes("dana").unwrap(), 200);
    }

    #[test]
    fn unknown_delegate_is_an_error() {
        let store = store();
        let snap = store.snapshot().unwrap();
        let oracle = oracle();
        let q = QueryEngine::new(&snap, &oracle, at());
        assert!(matches!(
            q.delegate_votes("nobody"),
            Err(QueryError::UnknownDelegate(_))
        ));
    }

    #[test]
    fn lists_votes_in_both_directions() {
        let store = store();
        let snap = store.snapshot().unwrap();
        let oracle = oracle();
        let q = QueryEngine::new(&snap, &oracle, at());

        let names: Vec<String> = q
            .voted_delegates(&key(11))
            .unwrap()
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, vec!["dana", "eli"]);
        assert_eq!(
            q.received_votes("dana").unwrap(),
            vec![
                VoterWeight { address: key(10), votes: 300 },
                VoterWeight { address: key(11), votes: 200 },
            ]
        );
        assert_eq!(q.list_delegates().unwrap().len(), 3);
    }

    #[test]
    fn top_delegates_filters_and_orders() {
        let store = store();
        let snap = store.snapshot().unwrap();
        let oracle = oracle();
        let q = QueryEngine::new(&snap, &oracle, at());

        // eli holds only 5 and is filtered out; fay ties nobody and has 0 votes.
        let top = q.top_delegates(10, 10).unwrap();
        let order: Vec<(&str, u64)> = top.iter().map(|d| (d.name.as_str(), d.votes)).collect();
        assert_eq!(order, vec![("dana", 500), ("fay", 0)]);

        assert_eq!(q.top_delegates(1, 0).unwrap()[0].name, "dana");
    }
}
