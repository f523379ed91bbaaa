//! Nullable store: thread-safe in-memory ledger for testing.
//!
//! Committed state lives behind an `Arc` that is swapped on commit, so a
//! snapshot is a cheap pointer copy and never observes later batches. A batch
//! works on a private copy and holds the writer lock until it is committed or
//! dropped.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use agora_store::{
    ApplyCursor, BillRecord, BillState, BillVote, CommitteeRecord, DelegateRecord, LedgerBatch,
    LedgerStore, LedgerView, StoreError, SyncedBlock, TokenLock, TokenRecord,
};
use agora_types::{BillId, KeyId, Timestamp, TokenId};

const KEY_MAX: KeyId = KeyId::new([0xff; 20]);

fn bill_min() -> BillId {
    BillId::new([0; 20])
}

fn bill_max() -> BillId {
    BillId::new([0xff; 20])
}

#[derive(Clone, Default)]
struct MemState {
    delegates: BTreeMap<KeyId, DelegateRecord>,
    delegate_names: BTreeMap<String, KeyId>,
    /// (voter, delegate)
    delegate_votes: BTreeSet<(KeyId, KeyId)>,
    /// (delegate, voter)
    delegate_voters: BTreeSet<(KeyId, KeyId)>,
    committees: BTreeMap<KeyId, CommitteeRecord>,
    committee_names: BTreeMap<String, KeyId>,
    committee_votes: BTreeMap<KeyId, KeyId>,
    /// (committee, voter)
    committee_voters: BTreeSet<(KeyId, KeyId)>,
    bills: BTreeMap<BillId, BillRecord>,
    committee_bills: BTreeSet<(KeyId, BillId)>,
    bill_votes: BTreeMap<(BillId, KeyId), BillVote>,
    voter_bills: BTreeSet<(KeyId, BillId)>,
    bill_states: BTreeMap<BillId, BillState>,
    bills_due: BTreeSet<(Timestamp, BillId)>,
    names: BTreeMap<KeyId, String>,
    name_index: BTreeMap<String, KeyId>,
    tokens: BTreeMap<TokenId, TokenRecord>,
    token_addresses: BTreeMap<KeyId, TokenId>,
    token_symbols: BTreeMap<(KeyId, String), TokenId>,
    token_balances: BTreeMap<(TokenId, KeyId), u64>,
    token_locks: BTreeMap<(TokenId, KeyId, u64), u64>,
    holder_tokens: BTreeSet<(KeyId, TokenId)>,
    coin_balances: BTreeMap<KeyId, u64>,
    synced_block: Option<SyncedBlock>,
    apply_cursor: Option<ApplyCursor>,
}

/// An in-memory [`LedgerStore`] for testing.
/// Thread-safe for use with tokio's multi-threaded runtime.
#[derive(Default)]
pub struct NullStore {
    committed: RwLock<Arc<MemState>>,
    writer: Mutex<()>,
}

impl NullStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Read-only view of the state committed when it was taken.
pub struct NullSnapshot {
    state: Arc<MemState>,
}

impl NullSnapshot {
    fn state(&self) -> &MemState {
        &self.state
    }
}

/// The single open write batch of a [`NullStore`].
pub struct NullBatch<'a> {
    store: &'a NullStore,
    _writer: MutexGuard<'a, ()>,
    working: MemState,
}

impl NullBatch<'_> {
    fn state(&self) -> &MemState {
        &self.working
    }
}

impl LedgerStore for NullStore {
    type Snapshot<'a> = NullSnapshot;
    type Batch<'a> = NullBatch<'a>;

    fn snapshot(&self) -> Result<NullSnapshot, StoreError> {
        let state = self
            .committed
            .read()
            .map_err(|_| StoreError::Backend("null store lock poisoned".into()))?;
        Ok(NullSnapshot {
            state: Arc::clone(&state),
        })
    }

    fn begin_batch(&self) -> Result<NullBatch<'_>, StoreError> {
        let writer = self
            .writer
            .lock()
            .map_err(|_| StoreError::Backend("null store writer poisoned".into()))?;
        let working = self.snapshot()?.state.as_ref().clone();
        Ok(NullBatch {
            store: self,
            _writer: writer,
            working,
        })
    }
}

macro_rules! impl_ledger_view {
    ($ty:ty) => {
        impl LedgerView for $ty {
            fn delegate(&self, address: &KeyId) -> Result<Option<DelegateRecord>, StoreError> {
                Ok(self.state().delegates.get(address).cloned())
            }

            fn delegate_by_name(&self, name: &str) -> Result<Option<KeyId>, StoreError> {
                Ok(self.state().delegate_names.get(name).copied())
            }

            fn delegates(&self) -> Result<Vec<DelegateRecord>, StoreError> {
                Ok(self.state().delegates.values().cloned().collect())
            }

            fn delegate_votes_of(&self, voter: &KeyId) -> Result<BTreeSet<KeyId>, StoreError> {
                Ok(self
                    .state()
                    .delegate_votes
                    .range((*voter, KeyId::ZERO)..=(*voter, KEY_MAX))
                    .map(|(_, d)| *d)
                    .collect())
            }

            fn delegate_voters(&self, delegate: &KeyId) -> Result<Vec<KeyId>, StoreError> {
                Ok(self
                    .state()
                    .delegate_voters
                    .range((*delegate, KeyId::ZERO)..=(*delegate, KEY_MAX))
                    .map(|(_, v)| *v)
                    .collect())
            }

            fn committee(&self, address: &KeyId) -> Result<Option<CommitteeRecord>, StoreError> {
                Ok(self.state().committees.get(address).cloned())
            }

            fn committee_by_name(&self, name: &str) -> Result<Option<KeyId>, StoreError> {
                Ok(self.state().committee_names.get(name).copied())
            }

            fn committees(&self) -> Result<Vec<CommitteeRecord>, StoreError> {
                Ok(self.state().committees.values().cloned().collect())
            }

            fn committee_vote_of(&self, voter: &KeyId) -> Result<Option<KeyId>, StoreError> {
                Ok(self.state().committee_votes.get(voter).copied())
            }

            fn committee_voters(&self, committee: &KeyId) -> Result<Vec<KeyId>, StoreError> {
                Ok(self
                    .state()
                    .committee_voters
                    .range((*committee, KeyId::ZERO)..=(*committee, KEY_MAX))
                    .map(|(_, v)| *v)
                    .collect())
            }

            fn bill(&self, id: &BillId) -> Result<Option<BillRecord>, StoreError> {
                Ok(self.state().bills.get(id).cloned())
            }

            fn bills(&self) -> Result<Vec<BillRecord>, StoreError> {
                Ok(self.state().bills.values().cloned().collect())
            }

            fn committee_bills(&self, committee: &KeyId) -> Result<Vec<BillId>, StoreError> {
                Ok(self
                    .state()
                    .committee_bills
                    .range((*committee, bill_min())..=(*committee, bill_max()))
                    .map(|(_, b)| *b)
                    .collect())
            }

            fn bill_vote(&self, bill: &BillId, voter: &KeyId) -> Result<Option<BillVote>, StoreError> {
                Ok(self.state().bill_votes.get(&(*bill, *voter)).cloned())
            }

            fn bill_votes(&self, bill: &BillId) -> Result<Vec<(KeyId, BillVote)>, StoreError> {
                Ok(self
                    .state()
                    .bill_votes
                    .range((*bill, KeyId::ZERO)..=(*bill, KEY_MAX))
                    .map(|((_, voter), vote)| (*voter, vote.clone()))
                    .collect())
            }

            fn voter_bills(&self, voter: &KeyId) -> Result<Vec<BillId>, StoreError> {
                Ok(self
                    .state()
                    .voter_bills
                    .range((*voter, bill_min())..=(*voter, bill_max()))
                    .map(|(_, b)| *b)
                    .collect())
            }

            fn bill_state(&self, id: &BillId) -> Result<Option<BillState>, StoreError> {
                Ok(self.state().bill_states.get(id).cloned())
            }

            fn bills_due(&self, time: Timestamp) -> Result<Vec<BillId>, StoreError> {
                Ok(self
                    .state()
                    .bills_due
                    .range(..=(time, bill_max()))
                    .map(|(_, b)| *b)
                    .collect())
            }

            fn address_name(&self, address: &KeyId) -> Result<Option<String>, StoreError> {
                Ok(self.state().names.get(address).cloned())
            }

            fn name_address(&self, name: &str) -> Result<Option<KeyId>, StoreError> {
                Ok(self.state().name_index.get(name).copied())
            }

            fn names(&self) -> Result<Vec<(KeyId, String)>, StoreError> {
                Ok(self
                    .state()
                    .names
                    .iter()
                    .map(|(k, n)| (*k, n.clone()))
                    .collect())
            }

            fn token(&self, id: TokenId) -> Result<Option<TokenRecord>, StoreError> {
                Ok(self.state().tokens.get(&id).cloned())
            }

            fn token_by_address(&self, token_address: &KeyId) -> Result<Option<TokenId>, StoreError> {
                Ok(self.state().token_addresses.get(token_address).copied())
            }

            fn token_by_symbol(&self, owner: &KeyId, symbol: &str) -> Result<Option<TokenId>, StoreError> {
                Ok(self
                    .state()
                    .token_symbols
                    .get(&(*owner, symbol.to_string()))
                    .copied())
            }

            fn tokens(&self) -> Result<Vec<TokenRecord>, StoreError> {
                Ok(self.state().tokens.values().cloned().collect())
            }

            fn token_balance(&self, token: TokenId, holder: &KeyId) -> Result<u64, StoreError> {
                Ok(self
                    .state()
                    .token_balances
                    .get(&(token, *holder))
                    .copied()
                    .unwrap_or(0))
            }

            fn token_holders(&self, token: TokenId) -> Result<Vec<(KeyId, u64)>, StoreError> {
                Ok(self
                    .state()
                    .token_balances
                    .range((token, KeyId::ZERO)..=(token, KEY_MAX))
                    .map(|((_, holder), amount)| (*holder, *amount))
                    .collect())
            }

            fn token_locks(&self, token: TokenId, holder: &KeyId) -> Result<Vec<TokenLock>, StoreError> {
                Ok(self
                    .state()
                    .token_locks
                    .range((token, *holder, 0)..=(token, *holder, u64::MAX))
                    .map(|((_, _, expiry), amount)| TokenLock {
                        token,
                        holder: *holder,
                        expiry_height: *expiry,
                        amount: *amount,
                    })
                    .collect())
            }

            fn all_token_locks(&self, token: TokenId) -> Result<Vec<TokenLock>, StoreError> {
                Ok(self
                    .state()
                    .token_locks
                    .range((token, KeyId::ZERO, 0)..=(token, KEY_MAX, u64::MAX))
                    .map(|((_, holder, expiry), amount)| TokenLock {
                        token,
                        holder: *holder,
                        expiry_height: *expiry,
                        amount: *amount,
                    })
                    .collect())
            }

            fn holder_tokens(&self, holder: &KeyId) -> Result<Vec<TokenId>, StoreError> {
                Ok(self
                    .state()
                    .holder_tokens
                    .range((*holder, TokenId::new(0))..=(*holder, TokenId::new(u64::MAX)))
                    .map(|(_, t)| *t)
                    .collect())
            }

            fn coin_balances(&self) -> Result<Vec<(KeyId, u64)>, StoreError> {
                Ok(self
                    .state()
                    .coin_balances
                    .iter()
                    .map(|(address, amount)| (*address, *amount))
                    .collect())
            }

            fn synced_block(&self) -> Result<Option<SyncedBlock>, StoreError> {
                Ok(self.state().synced_block)
            }

            fn apply_cursor(&self) -> Result<Option<ApplyCursor>, StoreError> {
                Ok(self.state().apply_cursor)
            }
        }
    };
}

impl_ledger_view!(NullSnapshot);
impl_ledger_view!(NullBatch<'_>);

fn duplicate(what: String) -> StoreError {
    StoreError::Duplicate(what)
}

impl LedgerBatch for NullBatch<'_> {
    fn insert_delegate(&mut self, record: &DelegateRecord) -> Result<(), StoreError> {
        let s = &mut self.working;
        if s.delegates.contains_key(&record.address) {
            return Err(duplicate(format!("delegate {}", record.address)));
        }
        if s.delegate_names.contains_key(&record.name) {
            return Err(duplicate(format!("delegate name '{}'", record.name)));
        }
        s.delegates.insert(record.address, record.clone());
        s.delegate_names.insert(record.name.clone(), record.address);
        Ok(())
    }

    fn add_delegate_vote(&mut self, voter: &KeyId, delegate: &KeyId) -> Result<(), StoreError> {
        let s = &mut self.working;
        if !s.delegate_votes.insert((*voter, *delegate)) {
            return Err(duplicate(format!("vote {voter} -> {delegate}")));
        }
        s.delegate_voters.insert((*delegate, *voter));
        Ok(())
    }

    fn remove_delegate_vote(&mut self, voter: &KeyId, delegate: &KeyId) -> Result<(), StoreError> {
        let s = &mut self.working;
        if !s.delegate_votes.remove(&(*voter, *delegate)) {
            return Err(StoreError::NotFound(format!("vote {voter} -> {delegate}")));
        }
        s.delegate_voters.remove(&(*delegate, *voter));
        Ok(())
    }

    fn insert_committee(&mut self, record: &CommitteeRecord) -> Result<(), StoreError> {
        let s = &mut self.working;
        if s.committees.contains_key(&record.address) {
            return Err(duplicate(format!("committee {}", record.address)));
        }
        if s.committee_names.contains_key(&record.name) {
            return Err(duplicate(format!("committee name '{}'", record.name)));
        }
        s.committees.insert(record.address, record.clone());
        s.committee_names.insert(record.name.clone(), record.address);
        Ok(())
    }

    fn put_committee_vote(&mut self, voter: &KeyId, committee: &KeyId) -> Result<(), StoreError> {
        let s = &mut self.working;
        if s.committee_votes.contains_key(voter) {
            return Err(duplicate(format!("committee vote of {voter}")));
        }
        s.committee_votes.insert(*voter, *committee);
        s.committee_voters.insert((*committee, *voter));
        Ok(())
    }

    fn remove_committee_vote(&mut self, voter: &KeyId, committee: &KeyId) -> Result<(), StoreError> {
        let s = &mut self.working;
        if s.committee_votes.get(voter) != Some(committee) {
            return Err(StoreError::NotFound(format!("committee vote {voter} -> {committee}")));
        }
        s.committee_votes.remove(voter);
        s.committee_voters.remove(&(*committee, *voter));
        Ok(())
    }

    fn insert_bill(&mut self, record: &BillRecord) -> Result<(), StoreError> {
        let s = &mut self.working;
        if s.bills.contains_key(&record.id) {
            return Err(duplicate(format!("bill {}", record.id)));
        }
        s.bills.insert(record.id, record.clone());
        s.committee_bills.insert((record.committee, record.id));
        s.bills_due.insert((record.end_time, record.id));
        Ok(())
    }

    fn put_bill_vote(&mut self, bill: &BillId, voter: &KeyId, option: u8) -> Result<(), StoreError> {
        let s = &mut self.working;
        if s.bill_votes.contains_key(&(*bill, *voter)) {
            return Err(duplicate(format!("vote of {voter} on bill {bill}")));
        }
        s.bill_votes
            .insert((*bill, *voter), BillVote { option, weight: None });
        s.voter_bills.insert((*voter, *bill));
        Ok(())
    }

    fn freeze_bill(
        &mut self,
        bill: &BillId,
        state: &BillState,
        weights: &[(KeyId, u64)],
    ) -> Result<(), StoreError> {
        let s = &mut self.working;
        let end_time = s
            .bills
            .get(bill)
            .map(|b| b.end_time)
            .ok_or_else(|| StoreError::NotFound(format!("bill {bill}")))?;
        if s.bill_states.contains_key(bill) {
            return Err(duplicate(format!("state of bill {bill}")));
        }
        for (voter, weight) in weights {
            let vote = s
                .bill_votes
                .get_mut(&(*bill, *voter))
                .ok_or_else(|| StoreError::NotFound(format!("vote of {voter} on bill {bill}")))?;
            vote.weight = Some(*weight);
        }
        s.bill_states.insert(*bill, state.clone());
        s.bills_due.remove(&(end_time, *bill));
        Ok(())
    }

    fn insert_name(&mut self, address: &KeyId, name: &str) -> Result<(), StoreError> {
        let s = &mut self.working;
        if s.names.contains_key(address) {
            return Err(duplicate(format!("name of {address}")));
        }
        if s.name_index.contains_key(name) {
            return Err(duplicate(format!("name '{name}'")));
        }
        s.names.insert(*address, name.to_string());
        s.name_index.insert(name.to_string(), *address);
        Ok(())
    }

    fn insert_token(&mut self, record: &TokenRecord) -> Result<(), StoreError> {
        let s = &mut self.working;
        let symbol_key = (record.owner, record.symbol.clone());
        if s.tokens.contains_key(&record.id) {
            return Err(duplicate(format!("token {}", record.id)));
        }
        if s.token_addresses.contains_key(&record.token_address) {
            return Err(duplicate(format!("token address {}", record.token_address)));
        }
        if s.token_symbols.contains_key(&symbol_key) {
            return Err(duplicate(format!(
                "token symbol '{}' of {}",
                record.symbol, record.owner
            )));
        }
        s.tokens.insert(record.id, record.clone());
        s.token_addresses.insert(record.token_address, record.id);
        s.token_symbols.insert(symbol_key, record.id);
        Ok(())
    }

    fn set_token_balance(&mut self, token: TokenId, holder: &KeyId, amount: u64) -> Result<(), StoreError> {
        let s = &mut self.working;
        if amount == 0 {
            s.token_balances.remove(&(token, *holder));
        } else {
            s.token_balances.insert((token, *holder), amount);
            s.holder_tokens.insert((*holder, token));
        }
        Ok(())
    }

    fn add_token_lock(&mut self, lock: &TokenLock) -> Result<(), StoreError> {
        let s = &mut self.working;
        let entry = s
            .token_locks
            .entry((lock.token, lock.holder, lock.expiry_height))
            .or_insert(0);
        *entry = entry.checked_add(lock.amount).ok_or_else(|| {
            StoreError::Corruption(format!("lock amount overflow for {}", lock.holder))
        })?;
        s.holder_tokens.insert((lock.holder, lock.token));
        Ok(())
    }

    fn remove_token_lock(&mut self, token: TokenId, holder: &KeyId, expiry_height: u64) -> Result<(), StoreError> {
        self.working
            .token_locks
            .remove(&(token, *holder, expiry_height))
            .map(|_| ())
            .ok_or_else(|| {
                StoreError::NotFound(format!(
                    "lock of token {token} held by {holder} at {expiry_height}"
                ))
            })
    }

    fn set_coin_balance(&mut self, address: &KeyId, amount: u64) -> Result<(), StoreError> {
        if amount == 0 {
            self.working.coin_balances.remove(address);
        } else {
            self.working.coin_balances.insert(*address, amount);
        }
        Ok(())
    }

    fn set_synced_block(&mut self, block: SyncedBlock) -> Result<(), StoreError> {
        self.working.synced_block = Some(block);
        Ok(())
    }

    fn set_apply_cursor(&mut self, cursor: ApplyCursor) -> Result<(), StoreError> {
        self.working.apply_cursor = Some(cursor);
        Ok(())
    }

    fn commit(self) -> Result<(), StoreError> {
        let NullBatch {
            store,
            _writer,
            working,
        } = self;
        let mut committed = store
            .committed
            .write()
            .map_err(|_| StoreError::Backend("null store lock poisoned".into()))?;
        *committed = Arc::new(working);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(b: u8) -> KeyId {
        KeyId::new([b; 20])
    }

    #[test]
    fn uncommitted_batch_is_invisible() {
        let store = NullStore::new();
        {
            let mut batch = store.begin_batch().unwrap();
            batch.insert_name(&key(1), "alice").unwrap();
            assert_eq!(batch.name_address("alice").unwrap(), Some(key(1)));
        }
        assert!(store.snapshot().unwrap().name_address("alice").unwrap().is_none());
    }

    #[test]
    fn snapshot_is_isolated_from_later_commits() {
        let store = NullStore::new();
        let before = store.snapshot().unwrap();

        let mut batch = store.begin_batch().unwrap();
        batch.add_delegate_vote(&key(2), &key(1)).unwrap();
        batch.commit().unwrap();

        assert!(before.delegate_voters(&key(1)).unwrap().is_empty());
        assert_eq!(store.snapshot().unwrap().delegate_voters(&key(1)).unwrap(), vec![key(2)]);
    }

    #[test]
    fn unique_names_across_addresses() {
        let store = NullStore::new();
        let mut batch = store.begin_batch().unwrap();
        batch.insert_name(&key(1), "alice").unwrap();
        assert!(matches!(batch.insert_name(&key(2), "alice"), Err(StoreError::Duplicate(_))));
        assert!(matches!(batch.insert_name(&key(1), "other"), Err(StoreError::Duplicate(_))));
    }

    #[test]
    fn zero_balance_removes_holder_entry() {
        let store = NullStore::new();
        let mut batch = store.begin_batch().unwrap();
        batch.set_token_balance(TokenId::FIRST, &key(1), 10).unwrap();
        batch.set_token_balance(TokenId::FIRST, &key(1), 0).unwrap();
        assert!(batch.token_holders(TokenId::FIRST).unwrap().is_empty());
        // holder index keeps the history
        assert_eq!(batch.holder_tokens(&key(1)).unwrap(), vec![TokenId::FIRST]);
    }

    #[test]
    fn locks_sum_per_expiry_and_remove() {
        let store = NullStore::new();
        let mut batch = store.begin_batch().unwrap();
        for (expiry, amount) in [(20, 5), (10, 3), (20, 2)] {
            batch
                .add_token_lock(&TokenLock {
                    token: TokenId::FIRST,
                    holder: key(4),
                    expiry_height: expiry,
                    amount,
                })
                .unwrap();
        }
        let locks = batch.token_locks(TokenId::FIRST, &key(4)).unwrap();
        assert_eq!(
            locks.iter().map(|l| (l.expiry_height, l.amount)).collect::<Vec<_>>(),
            vec![(10, 3), (20, 7)]
        );
        batch.remove_token_lock(TokenId::FIRST, &key(4), 10).unwrap();
        assert!(matches!(
            batch.remove_token_lock(TokenId::FIRST, &key(4), 10),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn frozen_bill_leaves_due_set() {
        let store = NullStore::new();
        let id = BillId::new([7; 20]);
        let mut batch = store.begin_batch().unwrap();
        batch
            .insert_bill(&BillRecord {
                id,
                title: "t1".into(),
                detail: String::new(),
                url: String::new(),
                committee: key(1),
                start_time: Timestamp::new(0),
                end_time: Timestamp::new(50),
                options: vec!["a".into(), "b".into()],
                submitted_height: 1,
            })
            .unwrap();
        assert!(batch.bills_due(Timestamp::new(49)).unwrap().is_empty());
        assert_eq!(batch.bills_due(Timestamp::new(50)).unwrap(), vec![id]);

        let state = BillState {
            passed: false,
            winning_option: None,
            total_vote: 0,
            option_totals: vec![0, 0],
            finalized_height: 3,
            finalized_time: Timestamp::new(50),
        };
        batch.freeze_bill(&id, &state, &[]).unwrap();
        assert!(batch.bills_due(Timestamp::new(100)).unwrap().is_empty());
        assert!(matches!(batch.freeze_bill(&id, &state, &[]), Err(StoreError::Duplicate(_))));
    }

    #[test]
    fn coin_balances_drop_zero_and_keep_order() {
        let store = NullStore::new();
        let mut batch = store.begin_batch().unwrap();
        batch.set_coin_balance(&key(9), 5).unwrap();
        batch.set_coin_balance(&key(3), 8).unwrap();
        batch.set_coin_balance(&key(9), 0).unwrap();
        batch
            .set_synced_block(SyncedBlock::new(2, Timestamp::new(1_200)))
            .unwrap();
        batch.commit().unwrap();

        let snap = store.snapshot().unwrap();
        assert_eq!(snap.coin_balances().unwrap(), vec![(key(3), 8)]);
        assert_eq!(snap.synced_block().unwrap().map(|b| b.height), Some(2));
    }
}
