//! Write batching: every mutation of one applied operation goes into a single
//! LMDB write transaction, together with the applier's cursor.
//!
//! # Usage
//!
//! ```ignore
//! let mut batch = env.begin_batch()?;
//! batch.insert_delegate(&record)?;
//! batch.set_apply_cursor(cursor)?;
//! batch.commit()?;
//! ```
//!
//! If the batch is dropped without calling [`LedgerBatch::commit`], all
//! operations are rolled back (the underlying LMDB transaction is aborted).

use heed::{RoTxn, RwTxn};

use agora_store::{
    ApplyCursor, BillRecord, BillState, BillVote, CommitteeRecord, DelegateRecord, LedgerBatch,
    LedgerView, StoreError, SyncedBlock, TokenLock, TokenRecord,
};
use agora_types::{BillId, KeyId, TokenId};

use crate::keys::{balance_key, due_key, lock_key, pair};
use crate::read::{contains, get_u64, get_value};
use crate::tables::{Db, Tables};
use crate::view::{APPLY_CURSOR_KEY, SYNCED_BLOCK_KEY};
use crate::LmdbError;

/// The single open write transaction of an [`LmdbEnvironment`](crate::LmdbEnvironment).
pub struct LmdbBatch<'e> {
    pub(crate) tables: Tables,
    pub(crate) txn: RwTxn<'e>,
}

impl<'e> LmdbBatch<'e> {
    pub(crate) fn ro(&self) -> &RoTxn<'e> {
        &self.txn
    }

    fn put(&mut self, db: Db, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        db.put(&mut self.txn, key, value).map_err(LmdbError::from)?;
        Ok(())
    }

    fn put_record<T: serde::Serialize>(&mut self, db: Db, key: &[u8], value: &T) -> Result<(), StoreError> {
        let bytes = bincode::serialize(value).map_err(LmdbError::from)?;
        self.put(db, key, &bytes)
    }

    /// Delete `key`, returning whether it existed.
    fn delete(&mut self, db: Db, key: &[u8]) -> Result<bool, StoreError> {
        Ok(db.delete(&mut self.txn, key).map_err(LmdbError::from)?)
    }

    fn ensure_absent(&self, db: Db, key: &[u8], what: impl FnOnce() -> String) -> Result<(), StoreError> {
        if contains(db, self.ro(), key)? {
            return Err(StoreError::Duplicate(what()));
        }
        Ok(())
    }

    fn note_holding(&mut self, token: TokenId, holder: &KeyId) -> Result<(), StoreError> {
        let db = self.tables.holder_tokens;
        self.put(db, &pair(holder.as_bytes(), &token.to_be_bytes()), &[])
    }
}

impl<'e> LedgerBatch for LmdbBatch<'e> {
    fn insert_delegate(&mut self, record: &DelegateRecord) -> Result<(), StoreError> {
        let t = self.tables;
        self.ensure_absent(t.delegates, record.address.as_bytes(), || {
            format!("delegate {}", record.address)
        })?;
        self.ensure_absent(t.delegate_names, record.name.as_bytes(), || {
            format!("delegate name '{}'", record.name)
        })?;
        self.put_record(t.delegates, record.address.as_bytes(), record)?;
        self.put(t.delegate_names, record.name.as_bytes(), record.address.as_bytes())
    }

    fn add_delegate_vote(&mut self, voter: &KeyId, delegate: &KeyId) -> Result<(), StoreError> {
        let t = self.tables;
        let forward = pair(voter.as_bytes(), delegate.as_bytes());
        self.ensure_absent(t.delegate_votes, &forward, || {
            format!("vote {voter} -> {delegate}")
        })?;
        self.put(t.delegate_votes, &forward, &[])?;
        self.put(t.delegate_voters, &pair(delegate.as_bytes(), voter.as_bytes()), &[])
    }

    fn remove_delegate_vote(&mut self, voter: &KeyId, delegate: &KeyId) -> Result<(), StoreError> {
        let t = self.tables;
        if !self.delete(t.delegate_votes, &pair(voter.as_bytes(), delegate.as_bytes()))? {
            return Err(StoreError::NotFound(format!("vote {voter} -> {delegate}")));
        }
        self.delete(t.delegate_voters, &pair(delegate.as_bytes(), voter.as_bytes()))?;
        Ok(())
    }

    fn insert_committee(&mut self, record: &CommitteeRecord) -> Result<(), StoreError> {
        let t = self.tables;
        self.ensure_absent(t.committees, record.address.as_bytes(), || {
            format!("committee {}", record.address)
        })?;
        self.ensure_absent(t.committee_names, record.name.as_bytes(), || {
            format!("committee name '{}'", record.name)
        })?;
        self.put_record(t.committees, record.address.as_bytes(), record)?;
        self.put(t.committee_names, record.name.as_bytes(), record.address.as_bytes())
    }

    fn put_committee_vote(&mut self, voter: &KeyId, committee: &KeyId) -> Result<(), StoreError> {
        let t = self.tables;
        self.ensure_absent(t.committee_votes, voter.as_bytes(), || {
            format!("committee vote of {voter}")
        })?;
        self.put(t.committee_votes, voter.as_bytes(), committee.as_bytes())?;
        self.put(t.committee_voters, &pair(committee.as_bytes(), voter.as_bytes()), &[])
    }

    fn remove_committee_vote(&mut self, voter: &KeyId, committee: &KeyId) -> Result<(), StoreError> {
        let t = self.tables;
        if self.committee_vote_of(voter)? != Some(*committee) {
            return Err(StoreError::NotFound(format!("committee vote {voter} -> {committee}")));
        }
        self.delete(t.committee_votes, voter.as_bytes())?;
        self.delete(t.committee_voters, &pair(committee.as_bytes(), voter.as_bytes()))?;
        Ok(())
    }

    fn insert_bill(&mut self, record: &BillRecord) -> Result<(), StoreError> {
        let t = self.tables;
        self.ensure_absent(t.bills, record.id.as_bytes(), || format!("bill {}", record.id))?;
        self.put_record(t.bills, record.id.as_bytes(), record)?;
        self.put(
            t.committee_bills,
            &pair(record.committee.as_bytes(), record.id.as_bytes()),
            &[],
        )?;
        self.put(t.bills_due, &due_key(record.end_time, &record.id), &[])
    }

    fn put_bill_vote(&mut self, bill: &BillId, voter: &KeyId, option: u8) -> Result<(), StoreError> {
        let t = self.tables;
        let key = pair(bill.as_bytes(), voter.as_bytes());
        self.ensure_absent(t.bill_votes, &key, || format!("vote of {voter} on bill {bill}"))?;
        self.put_record(t.bill_votes, &key, &BillVote { option, weight: None })?;
        self.put(t.voter_bills, &pair(voter.as_bytes(), bill.as_bytes()), &[])
    }

    fn freeze_bill(
        &mut self,
        bill: &BillId,
        state: &BillState,
        weights: &[(KeyId, u64)],
    ) -> Result<(), StoreError> {
        let t = self.tables;
        let record = self
            .bill(bill)?
            .ok_or_else(|| StoreError::NotFound(format!("bill {bill}")))?;
        self.ensure_absent(t.bill_states, bill.as_bytes(), || format!("state of bill {bill}"))?;
        self.put_record(t.bill_states, bill.as_bytes(), state)?;
        self.delete(t.bills_due, &due_key(record.end_time, bill))?;

        for (voter, weight) in weights {
            let key = pair(bill.as_bytes(), voter.as_bytes());
            let mut vote: BillVote = get_value(t.bill_votes, self.ro(), &key)?
                .ok_or_else(|| StoreError::NotFound(format!("vote of {voter} on bill {bill}")))?;
            vote.weight = Some(*weight);
            self.put_record(t.bill_votes, &key, &vote)?;
        }
        Ok(())
    }

    fn insert_name(&mut self, address: &KeyId, name: &str) -> Result<(), StoreError> {
        let t = self.tables;
        self.ensure_absent(t.names, address.as_bytes(), || format!("name of {address}"))?;
        self.ensure_absent(t.name_index, name.as_bytes(), || format!("name '{name}'"))?;
        self.put(t.names, address.as_bytes(), name.as_bytes())?;
        self.put(t.name_index, name.as_bytes(), address.as_bytes())
    }

    fn insert_token(&mut self, record: &TokenRecord) -> Result<(), StoreError> {
        let t = self.tables;
        let id_bytes = record.id.to_be_bytes();
        let symbol_key = pair(record.owner.as_bytes(), record.symbol.as_bytes());
        self.ensure_absent(t.tokens, &id_bytes, || format!("token {}", record.id))?;
        self.ensure_absent(t.token_addresses, record.token_address.as_bytes(), || {
            format!("token address {}", record.token_address)
        })?;
        self.ensure_absent(t.token_symbols, &symbol_key, || {
            format!("token symbol '{}' of {}", record.symbol, record.owner)
        })?;
        self.put_record(t.tokens, &id_bytes, record)?;
        self.put(t.token_addresses, record.token_address.as_bytes(), &id_bytes)?;
        self.put(t.token_symbols, &symbol_key, &id_bytes)
    }

    fn set_token_balance(&mut self, token: TokenId, holder: &KeyId, amount: u64) -> Result<(), StoreError> {
        let t = self.tables;
        let key = balance_key(token, holder);
        if amount == 0 {
            self.delete(t.token_balances, &key)?;
            return Ok(());
        }
        self.put(t.token_balances, &key, &amount.to_be_bytes())?;
        self.note_holding(token, holder)
    }

    fn add_token_lock(&mut self, lock: &TokenLock) -> Result<(), StoreError> {
        let t = self.tables;
        let key = lock_key(lock.token, &lock.holder, lock.expiry_height);
        let current = get_u64(t.token_locks, self.ro(), &key)?.unwrap_or(0);
        let amount = current.checked_add(lock.amount).ok_or_else(|| {
            StoreError::Corruption(format!("lock amount overflow for {}", lock.holder))
        })?;
        self.put(t.token_locks, &key, &amount.to_be_bytes())?;
        self.note_holding(lock.token, &lock.holder)
    }

    fn remove_token_lock(&mut self, token: TokenId, holder: &KeyId, expiry_height: u64) -> Result<(), StoreError> {
        let t = self.tables;
        if !self.delete(t.token_locks, &lock_key(token, holder, expiry_height))? {
            return Err(StoreError::NotFound(format!(
                "lock of token {token} held by {holder} at {expiry_height}"
            )));
        }
        Ok(())
    }

    fn set_coin_balance(&mut self, address: &KeyId, amount: u64) -> Result<(), StoreError> {
        let t = self.tables;
        if amount == 0 {
            self.delete(t.coin_balances, address.as_bytes())?;
            return Ok(());
        }
        self.put(t.coin_balances, address.as_bytes(), &amount.to_be_bytes())
    }

    fn set_synced_block(&mut self, block: SyncedBlock) -> Result<(), StoreError> {
        let t = self.tables;
        self.put_record(t.meta, SYNCED_BLOCK_KEY, &block)
    }

    fn set_apply_cursor(&mut self, cursor: ApplyCursor) -> Result<(), StoreError> {
        let t = self.tables;
        self.put_record(t.meta, APPLY_CURSOR_KEY, &cursor)
    }

    /// Commit all batched operations in a single write transaction.
    ///
    /// This is the only fsync in the entire batch.
    fn commit(self) -> Result<(), StoreError> {
        self.txn.commit().map_err(LmdbError::from)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LmdbEnvironment;
    use agora_store::LedgerStore;
    use agora_types::Timestamp;

    /// Helper: open a temporary LMDB environment.
    fn temp_env() -> (tempfile::TempDir, LmdbEnvironment) {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let env = LmdbEnvironment::open(dir.path(), 32, 10 * 1024 * 1024).expect("failed to open env");
        (dir, env)
    }

    fn key(b: u8) -> KeyId {
        KeyId::new([b; 20])
    }

    fn delegate(b: u8, name: &str) -> DelegateRecord {
        DelegateRecord {
            address: key(b),
            name: name.into(),
            registered_height: 1,
        }
    }

    fn bill(id: u8, committee: u8, end: u64) -> BillRecord {
        BillRecord {
            id: BillId::new([id; 20]),
            title: format!("bill-{id}"),
            detail: String::new(),
            url: String::new(),
            committee: key(committee),
            start_time: Timestamp::new(0),
            end_time: Timestamp::new(end),
            options: vec!["yes".into(), "no".into()],
            submitted_height: 1,
        }
    }

    #[test]
    fn committed_batch_is_visible_to_snapshots() {
        let (_dir, env) = temp_env();

        let mut batch = env.begin_batch().unwrap();
        batch.insert_delegate(&delegate(1, "alice")).unwrap();
        batch.set_apply_cursor(ApplyCursor::new(5, 1)).unwrap();
        batch.commit().unwrap();

        let snap = env.snapshot().unwrap();
        assert_eq!(snap.delegate(&key(1)).unwrap(), Some(delegate(1, "alice")));
        assert_eq!(snap.delegate_by_name("alice").unwrap(), Some(key(1)));
        assert_eq!(snap.apply_cursor().unwrap(), Some(ApplyCursor::new(5, 1)));
    }

    #[test]
    fn dropped_batch_does_not_persist() {
        let (_dir, env) = temp_env();

        {
            let mut batch = env.begin_batch().unwrap();
            batch.insert_delegate(&delegate(2, "bob")).unwrap();
            // batch is dropped here, rolling back
        }

        let snap = env.snapshot().unwrap();
        assert!(snap.delegate(&key(2)).unwrap().is_none());
        assert!(snap.delegate_by_name("bob").unwrap().is_none());
    }

    #[test]
    fn batch_reads_its_own_writes() {
        let (_dir, env) = temp_env();

        let mut batch = env.begin_batch().unwrap();
        batch.set_token_balance(TokenId::FIRST, &key(1), 50).unwrap();
        assert_eq!(batch.token_balance(TokenId::FIRST, &key(1)).unwrap(), 50);
        batch.insert_name(&key(1), "carol").unwrap();
        assert_eq!(batch.name_address("carol").unwrap(), Some(key(1)));
    }

    #[test]
    fn duplicate_delegate_address_and_name_rejected() {
        let (_dir, env) = temp_env();

        let mut batch = env.begin_batch().unwrap();
        batch.insert_delegate(&delegate(1, "alice")).unwrap();
        assert!(matches!(
            batch.insert_delegate(&delegate(1, "other")),
            Err(StoreError::Duplicate(_))
        ));
        assert!(matches!(
            batch.insert_delegate(&delegate(2, "alice")),
            Err(StoreError::Duplicate(_))
        ));
    }

    #[test]
    fn delegate_votes_maintain_both_directions() {
        let (_dir, env) = temp_env();

        let mut batch = env.begin_batch().unwrap();
        batch.add_delegate_vote(&key(9), &key(1)).unwrap();
        batch.add_delegate_vote(&key(9), &key(2)).unwrap();
        batch.add_delegate_vote(&key(8), &key(1)).unwrap();
        assert!(matches!(
            batch.add_delegate_vote(&key(9), &key(1)),
            Err(StoreError::Duplicate(_))
        ));
        batch.remove_delegate_vote(&key(9), &key(2)).unwrap();
        assert!(matches!(
            batch.remove_delegate_vote(&key(9), &key(2)),
            Err(StoreError::NotFound(_))
        ));
        batch.commit().unwrap();

        let snap = env.snapshot().unwrap();
        assert_eq!(
            snap.delegate_votes_of(&key(9)).unwrap().into_iter().collect::<Vec<_>>(),
            vec![key(1)]
        );
        assert_eq!(snap.delegate_voters(&key(1)).unwrap(), vec![key(8), key(9)]);
        assert!(snap.delegate_voters(&key(2)).unwrap().is_empty());
    }

    #[test]
    fn committee_vote_is_single() {
        let (_dir, env) = temp_env();

        let mut batch = env.begin_batch().unwrap();
        batch.put_committee_vote(&key(5), &key(1)).unwrap();
        assert!(matches!(
            batch.put_committee_vote(&key(5), &key(2)),
            Err(StoreError::Duplicate(_))
        ));
        assert!(matches!(
            batch.remove_committee_vote(&key(5), &key(2)),
            Err(StoreError::NotFound(_))
        ));
        batch.remove_committee_vote(&key(5), &key(1)).unwrap();
        assert_eq!(batch.committee_vote_of(&key(5)).unwrap(), None);
        assert!(batch.committee_voters(&key(1)).unwrap().is_empty());
    }

    #[test]
    fn bills_due_until_frozen() {
        let (_dir, env) = temp_env();

        let mut batch = env.begin_batch().unwrap();
        batch.insert_bill(&bill(1, 7, 100)).unwrap();
        batch.insert_bill(&bill(2, 7, 200)).unwrap();
        batch.put_bill_vote(&BillId::new([1; 20]), &key(3), 0).unwrap();

        assert!(batch.bills_due(Timestamp::new(99)).unwrap().is_empty());
        assert_eq!(
            batch.bills_due(Timestamp::new(100)).unwrap(),
            vec![BillId::new([1; 20])]
        );

        let state = BillState {
            passed: true,
            winning_option: Some(0),
            total_vote: 10,
            option_totals: vec![10, 0],
            finalized_height: 4,
            finalized_time: Timestamp::new(100),
        };
        batch
            .freeze_bill(&BillId::new([1; 20]), &state, &[(key(3), 10)])
            .unwrap();
        assert!(matches!(
            batch.freeze_bill(&BillId::new([1; 20]), &state, &[]),
            Err(StoreError::Duplicate(_))
        ));
        batch.commit().unwrap();

        let snap = env.snapshot().unwrap();
        assert_eq!(
            snap.bills_due(Timestamp::new(1_000)).unwrap(),
            vec![BillId::new([2; 20])]
        );
        assert_eq!(snap.bill_state(&BillId::new([1; 20])).unwrap(), Some(state));
        assert_eq!(
            snap.bill_vote(&BillId::new([1; 20]), &key(3)).unwrap(),
            Some(BillVote {
                option: 0,
                weight: Some(10)
            })
        );
        assert_eq!(
            snap.committee_bills(&key(7)).unwrap(),
            vec![BillId::new([1; 20]), BillId::new([2; 20])]
        );
        assert_eq!(snap.voter_bills(&key(3)).unwrap(), vec![BillId::new([1; 20])]);
    }

    #[test]
    fn token_uniqueness_and_balances() {
        let (_dir, env) = temp_env();
        let record = TokenRecord {
            id: TokenId::FIRST,
            symbol: "GOLD".into(),
            name: "Gold".into(),
            owner: key(1),
            token_address: key(50),
            total_amount: 1_000,
            digits: 0,
            created_height: 2,
        };

        let mut batch = env.begin_batch().unwrap();
        assert_eq!(batch.next_token_id().unwrap(), TokenId::FIRST);
        batch.insert_token(&record).unwrap();
        assert_eq!(batch.next_token_id().unwrap(), TokenId::new(2));

        let mut same_address = record.clone();
        same_address.id = TokenId::new(2);
        same_address.symbol = "SILVER".into();
        assert!(matches!(batch.insert_token(&same_address), Err(StoreError::Duplicate(_))));

        let mut same_symbol = record.clone();
        same_symbol.id = TokenId::new(2);
        same_symbol.token_address = key(51);
        assert!(matches!(batch.insert_token(&same_symbol), Err(StoreError::Duplicate(_))));

        batch.set_token_balance(TokenId::FIRST, &key(1), 600).unwrap();
        batch.set_token_balance(TokenId::FIRST, &key(2), 0).unwrap();
        batch
            .add_token_lock(&TokenLock {
                token: TokenId::FIRST,
                holder: key(2),
                expiry_height: 10,
                amount: 300,
            })
            .unwrap();
        batch
            .add_token_lock(&TokenLock {
                token: TokenId::FIRST,
                holder: key(2),
                expiry_height: 10,
                amount: 100,
            })
            .unwrap();
        batch.commit().unwrap();

        let snap = env.snapshot().unwrap();
        assert_eq!(snap.token_by_address(&key(50)).unwrap(), Some(TokenId::FIRST));
        assert_eq!(snap.token_by_symbol(&key(1), "GOLD").unwrap(), Some(TokenId::FIRST));
        assert_eq!(snap.token_holders(TokenId::FIRST).unwrap(), vec![(key(1), 600)]);
        let locks = snap.token_locks(TokenId::FIRST, &key(2)).unwrap();
        assert_eq!(locks.len(), 1);
        assert_eq!(locks[0].amount, 400);
        assert_eq!(snap.holder_tokens(&key(2)).unwrap(), vec![TokenId::FIRST]);
    }

    #[test]
    fn names_list_the_whole_table() {
        let (_dir, env) = temp_env();
        assert!(env.snapshot().unwrap().names().unwrap().is_empty());

        let mut batch = env.begin_batch().unwrap();
        batch.insert_name(&key(0xff), "zed").unwrap();
        batch.insert_name(&key(0), "amy").unwrap();
        batch.insert_name(&key(7), "bob").unwrap();
        batch.commit().unwrap();

        assert_eq!(
            env.snapshot().unwrap().names().unwrap(),
            vec![
                (key(0), "amy".to_string()),
                (key(7), "bob".to_string()),
                (key(0xff), "zed".to_string()),
            ]
        );
    }

    #[test]
    fn coin_balances_and_synced_block() {
        let (_dir, env) = temp_env();
        assert_eq!(env.snapshot().unwrap().synced_block().unwrap(), None);

        let mut batch = env.begin_batch().unwrap();
        batch.set_coin_balance(&key(2), 70).unwrap();
        batch.set_coin_balance(&key(1), 30).unwrap();
        batch.set_synced_block(SyncedBlock::new(4, Timestamp::new(2_400))).unwrap();
        batch.commit().unwrap();

        let mut batch = env.begin_batch().unwrap();
        batch.set_coin_balance(&key(1), 0).unwrap();
        batch.commit().unwrap();

        let snap = env.snapshot().unwrap();
        assert_eq!(snap.coin_balances().unwrap(), vec![(key(2), 70)]);
        assert_eq!(
            snap.synced_block().unwrap(),
            Some(SyncedBlock::new(4, Timestamp::new(2_400)))
        );
    }
}
