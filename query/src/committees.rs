use agora_store::{BalanceOracle, CommitteeRecord, LedgerView};
use agora_types::KeyId;

use crate::{BillSummary, CommitteeInfo, QueryEngine, QueryError, VoterWeight};

impl<V, O> QueryEngine<'_, V, O>
where
    V: LedgerView + ?Sized,
    O: BalanceOracle + ?Sized,
{
    fn committee_info(&self, record: CommitteeRecord) -> Result<CommitteeInfo, QueryError> {
        let votes = self.weight_of(&self.view.committee_voters(&record.address)?);
        Ok(CommitteeInfo {
            address: record.address,
            name: record.name,
            url: record.url,
            votes,
        })
    }

    /// A committee with its live standing, `None` if unregistered.
    pub fn committee(&self, address: &KeyId) -> Result<Option<CommitteeInfo>, QueryError> {
        self.view
            .committee(address)?
            .map(|record| self.committee_info(record))
            .transpose()
    }

    pub fn list_committees(&self) -> Result<Vec<CommitteeInfo>, QueryError> {
        self.view
            .committees()?
            .into_iter()
            .map(|record| self.committee_info(record))
            .collect()
    }

    pub fn committee_voters(&self, address: &KeyId) -> Result<Vec<VoterWeight>, QueryError> {
        Ok(self
            .view
            .committee_voters(address)?
            .into_iter()
            .map(|voter| VoterWeight {
                votes: self.oracle.spendable_balance(&voter),
                address: voter,
            })
            .collect())
    }

    pub fn committee_bills(&self, address: &KeyId) -> Result<Vec<BillSummary>, QueryError> {
        let mut out = Vec::new();
        for id in self.view.committee_bills(address)? {
            if let Some(bill) = self.view.bill(&id)? {
                out.push(BillSummary {
                    id,
                    title: bill.title,
                });
            }
        }
        Ok(out)
    }

    /// Committees `voter` backs: at most one.
    pub fn voter_committees(&self, voter: &KeyId) -> Result<Vec<CommitteeInfo>, QueryError> {
        let Some(address) = self.view.committee_vote_of(voter)? else {
            return Ok(Vec::new());
        };
        Ok(self.committee(&address)?.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_nullables::{NullBalanceOracle, NullStore};
    use agora_store::{LedgerBatch, LedgerStore};
    use agora_types::{ChainContext, Timestamp};

    const A: KeyId = KeyId::new([0xA0; 20]);
    const B: KeyId = KeyId::new([0xB0; 20]);

    fn with_alpha() -> NullStore {
        let store = NullStore::new();
        let mut batch = store.begin_batch().unwrap();
        batch
            .insert_committee(&CommitteeRecord {
                address: A,
                name: "alpha".into(),
                url: "http://a".into(),
                registered_height: 1,
            })
            .unwrap();
        batch.commit().unwrap();
        store
    }

    #[test]
    fn standing_follows_backer_balance() {
        let store = with_alpha();
        let oracle = NullBalanceOracle::with_balances([(B, 500)]);
        let at = ChainContext::new(2, Timestamp::new(0));

        {
            let snap = store.snapshot().unwrap();
            let q = QueryEngine::new(&snap, &oracle, at);
            let info = q.committee(&A).unwrap().unwrap();
            assert_eq!(info.votes, 0);
            assert_eq!(info.url, "http://a");
            assert!(q.voter_committees(&B).unwrap().is_empty());
        }

        let mut batch = store.begin_batch().unwrap();
        batch.put_committee_vote(&B, &A).unwrap();
        batch.commit().unwrap();

        let snap = store.snapshot().unwrap();
        let q = QueryEngine::new(&snap, &oracle, at);
        assert_eq!(q.committee(&A).unwrap().unwrap().votes, 500);
        assert_eq!(
            q.committee_voters(&A).unwrap(),
            vec![VoterWeight { address: B, votes: 500 }]
        );
        assert_eq!(q.voter_committees(&B).unwrap()[0].name, "alpha");
        assert_eq!(q.list_committees().unwrap().len(), 1);
    }

    #[test]
    fn unknown_committee_is_none() {
        let store = NullStore::new();
        let snap = store.snapshot().unwrap();
        let oracle = NullBalanceOracle::new();
        let q = QueryEngine::new(&snap, &oracle, ChainContext::new(1, Timestamp::new(0)));
        assert_eq!(q.committee(&A).unwrap(), None);
        assert!(q.committee_bills(&A).unwrap().is_empty());
    }
}
