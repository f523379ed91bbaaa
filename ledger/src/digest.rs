//! Ledger digests: one hash over every record, in canonical order.
//!
//! Two stores that hold the same ledger produce the same digest no matter
//! which backend they use or how often they were restarted, so a digest
//! taken after replaying chain sync can be compared across nodes. The
//! apply cursor and the coin balances chain sync records are bookkeeping,
//! not ledger records, and are left out.

use std::fmt;

use serde::Serialize;

use agora_crypto::Blake2bHasher;
use agora_store::{ApplyCursor, LedgerView, StoreError};

/// Record counts included in a digest, for display.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RecordCounts {
    pub delegates: usize,
    pub delegate_votes: usize,
    pub committees: usize,
    pub committee_votes: usize,
    pub bills: usize,
    pub frozen_bills: usize,
    pub bill_votes: usize,
    pub names: usize,
    pub tokens: usize,
    pub token_balances: usize,
    pub token_locks: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LedgerDigest {
    /// Blake2b-256 over every record.
    pub hash: [u8; 32],
    /// Where the applier stood; not part of the hash.
    pub cursor: Option<ApplyCursor>,
    pub counts: RecordCounts,
}

impl LedgerDigest {
    pub fn to_hex(&self) -> String {
        hex::encode(self.hash)
    }
}

impl fmt::Display for LedgerDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Each section is framed by a tag and a length so adjacent sections can
/// never run into each other.
struct Sections {
    hasher: Blake2bHasher,
}

impl Sections {
    fn push<T: Serialize + ?Sized>(&mut self, tag: &str, value: &T) -> Result<(), StoreError> {
        let bytes =
            bincode::serialize(value).map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.hasher.update(&(tag.len() as u64).to_le_bytes());
        self.hasher.update(tag.as_bytes());
        self.hasher.update(&(bytes.len() as u64).to_le_bytes());
        self.hasher.update(&bytes);
        Ok(())
    }
}

/// Digest the ledger seen through `view`.
pub fn ledger_digest<V: LedgerView + ?Sized>(view: &V) -> Result<LedgerDigest, StoreError> {
    let mut out = Sections {
        hasher: Blake2bHasher::new(),
    };
    let mut counts = RecordCounts::default();

    let delegates = view.delegates()?;
    out.push("delegates", &delegates)?;
    counts.delegates = delegates.len();
    for delegate in &delegates {
        let voters = view.delegate_voters(&delegate.address)?;
        out.push("delegate_voters", &voters)?;
        counts.delegate_votes += voters.len();
    }

    let committees = view.committees()?;
    out.push("committees", &committees)?;
    counts.committees = committees.len();
    for committee in &committees {
        let voters = view.committee_voters(&committee.address)?;
        out.push("committee_voters", &voters)?;
        counts.committee_votes += voters.len();
    }

    let bills = view.bills()?;
    out.push("bills", &bills)?;
    counts.bills = bills.len();
    for bill in &bills {
        let votes = view.bill_votes(&bill.id)?;
        out.push("bill_votes", &votes)?;
        counts.bill_votes += votes.len();
        let state = view.bill_state(&bill.id)?;
        if state.is_some() {
            counts.frozen_bills += 1;
        }
        out.push("bill_state", &state)?;
    }

    let names = view.names()?;
    out.push("names", &names)?;
    counts.names = names.len();

    let tokens = view.tokens()?;
    out.push("tokens", &tokens)?;
    counts.tokens = tokens.len();
    for token in &tokens {
        let holders = view.token_holders(token.id)?;
        out.push("token_holders", &holders)?;
        counts.token_balances += holders.len();
        let locks = view.all_token_locks(token.id)?;
        out.push("token_locks", &locks)?;
        counts.token_locks += locks.len();
    }

    Ok(LedgerDigest {
        hash: out.hasher.finalize(),
        cursor: view.apply_cursor()?,
        counts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_nullables::NullStore;
    use agora_store::{CommitteeRecord, LedgerBatch, LedgerStore};
    use agora_types::KeyId;

    fn committee(b: u8, name: &str) -> CommitteeRecord {
        CommitteeRecord {
            address: KeyId::new([b; 20]),
            name: name.into(),
            url: String::new(),
            registered_height: 1,
        }
    }

    #[test]
    fn empty_ledgers_agree() {
        let a = ledger_digest(&NullStore::new().snapshot().unwrap()).unwrap();
        let b = ledger_digest(&NullStore::new().snapshot().unwrap()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.counts, RecordCounts::default());
        assert_eq!(a.to_hex().len(), 64);
    }

    #[test]
    fn any_record_changes_the_hash() {
        let store = NullStore::new();
        let before = ledger_digest(&store.snapshot().unwrap()).unwrap();

        let mut batch = store.begin_batch().unwrap();
        batch.insert_committee(&committee(1, "alpha")).unwrap();
        batch.commit().unwrap();
        let after = ledger_digest(&store.snapshot().unwrap()).unwrap();

        assert_ne!(before.hash, after.hash);
        assert_eq!(after.counts.committees, 1);
    }

    #[test]
    fn cursor_is_not_hashed() {
        let store = NullStore::new();
        let before = ledger_digest(&store.snapshot().unwrap()).unwrap();

        let mut batch = store.begin_batch().unwrap();
        batch.set_apply_cursor(ApplyCursor::new(9, 2)).unwrap();
        batch.commit().unwrap();
        let after = ledger_digest(&store.snapshot().unwrap()).unwrap();

        assert_eq!(before.hash, after.hash);
        assert_eq!(after.cursor, Some(ApplyCursor::new(9, 2)));
    }

    #[test]
    fn coin_balances_are_not_hashed() {
        let store = NullStore::new();
        let before = ledger_digest(&store.snapshot().unwrap()).unwrap();

        let mut batch = store.begin_batch().unwrap();
        batch.set_coin_balance(&KeyId::new([3; 20]), 70).unwrap();
        batch.commit().unwrap();

        assert_eq!(before, ledger_digest(&store.snapshot().unwrap()).unwrap());
    }

    #[test]
    fn lmdb_digest_matches_memory() {
        let dir = tempfile::tempdir().unwrap();
        let lmdb = agora_store_lmdb::LmdbEnvironment::open(dir.path(), 32, 1 << 22).unwrap();
        let memory = NullStore::new();

        let mut batch = lmdb.begin_batch().unwrap();
        batch.insert_committee(&committee(1, "alpha")).unwrap();
        batch.insert_name(&KeyId::new([2; 20]), "bob").unwrap();
        batch.insert_name(&KeyId::new([1; 20]), "alice").unwrap();
        batch.commit().unwrap();
        let mut batch = memory.begin_batch().unwrap();
        batch.insert_name(&KeyId::new([1; 20]), "alice").unwrap();
        batch.insert_name(&KeyId::new([2; 20]), "bob").unwrap();
        batch.insert_committee(&committee(1, "alpha")).unwrap();
        batch.commit().unwrap();

        let on_disk = ledger_digest(&lmdb.snapshot().unwrap()).unwrap();
        assert_eq!(on_disk, ledger_digest(&memory.snapshot().unwrap()).unwrap());
        assert_eq!(on_disk.counts.names, 2);
    }

    #[test]
    fn insertion_order_does_not_matter() {
        let first = NullStore::new();
        let mut batch = first.begin_batch().unwrap();
        batch.insert_committee(&committee(1, "alpha")).unwrap();
        batch.insert_committee(&committee(2, "beta")).unwrap();
        batch.commit().unwrap();

        let second = NullStore::new();
        let mut batch = second.begin_batch().unwrap();
        batch.insert_committee(&committee(2, "beta")).unwrap();
        batch.commit().unwrap();
        let mut batch = second.begin_batch().unwrap();
        batch.insert_committee(&committee(1, "alpha")).unwrap();
        batch.commit().unwrap();

        assert_eq!(
            ledger_digest(&first.snapshot().unwrap()).unwrap().hash,
            ledger_digest(&second.snapshot().unwrap()).unwrap().hash
        );
    }
}
