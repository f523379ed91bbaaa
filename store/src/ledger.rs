//! The ledger store: snapshot reads and atomic write batches.
//!
//! The sync task is the only writer: it records each block's coin balances,
//! then its applier applies the block. The applier opens a [`LedgerBatch`], validates
//! against it (a batch sees its own writes), mutates, and commits. Readers
//! take a [`LedgerStore::snapshot`] and see the last committed batch and
//! nothing newer for as long as they hold it.
//!
//! All list methods return their results in a stable key order so that two
//! stores holding the same records answer identically.

use std::collections::BTreeSet;

use agora_types::{BillId, KeyId, Timestamp, TokenId};

use crate::{
    ApplyCursor, BillRecord, BillState, BillVote, CommitteeRecord, DelegateRecord, StoreError,
    SyncedBlock, TokenLock, TokenRecord,
};

/// Read access to ledger state.
pub trait LedgerView {
    // ── Delegates ───────────────────────────────────────────────────────

    fn delegate(&self, address: &KeyId) -> Result<Option<DelegateRecord>, StoreError>;

    fn delegate_by_name(&self, name: &str) -> Result<Option<KeyId>, StoreError>;

    /// All delegates, ordered by address.
    fn delegates(&self) -> Result<Vec<DelegateRecord>, StoreError>;

    /// Delegates that `voter` currently votes for.
    fn delegate_votes_of(&self, voter: &KeyId) -> Result<BTreeSet<KeyId>, StoreError>;

    /// Addresses currently voting for `delegate`, ordered by address.
    fn delegate_voters(&self, delegate: &KeyId) -> Result<Vec<KeyId>, StoreError>;

    // ── Committees ──────────────────────────────────────────────────────

    fn committee(&self, address: &KeyId) -> Result<Option<CommitteeRecord>, StoreError>;

    fn committee_by_name(&self, name: &str) -> Result<Option<KeyId>, StoreError>;

    /// All committees, ordered by address.
    fn committees(&self) -> Result<Vec<CommitteeRecord>, StoreError>;

    /// The committee `voter` currently backs, if any.
    fn committee_vote_of(&self, voter: &KeyId) -> Result<Option<KeyId>, StoreError>;

    /// Addresses currently backing `committee`, ordered by address.
    fn committee_voters(&self, committee: &KeyId) -> Result<Vec<KeyId>, StoreError>;

    // ── Bills ───────────────────────────────────────────────────────────

    fn bill(&self, id: &BillId) -> Result<Option<BillRecord>, StoreError>;

    /// All bills, ordered by id.
    fn bills(&self) -> Result<Vec<BillRecord>, StoreError>;

    /// Bills submitted by `committee`, ordered by id.
    fn committee_bills(&self, committee: &KeyId) -> Result<Vec<BillId>, StoreError>;

    fn bill_vote(&self, bill: &BillId, voter: &KeyId) -> Result<Option<BillVote>, StoreError>;

    /// Every vote on `bill`, ordered by voter.
    fn bill_votes(&self, bill: &BillId) -> Result<Vec<(KeyId, BillVote)>, StoreError>;

    /// Bills `voter` has voted on, ordered by id.
    fn voter_bills(&self, voter: &KeyId) -> Result<Vec<BillId>, StoreError>;

    fn bill_state(&self, id: &BillId) -> Result<Option<BillState>, StoreError>;

    /// Unfrozen bills whose voting window closed at or before `time`,
    /// ordered by end time, then id.
    fn bills_due(&self, time: Timestamp) -> Result<Vec<BillId>, StoreError>;

    // ── Address names ───────────────────────────────────────────────────

    fn address_name(&self, address: &KeyId) -> Result<Option<String>, StoreError>;

    fn name_address(&self, name: &str) -> Result<Option<KeyId>, StoreError>;

    /// Every registered name, ordered by address.
    fn names(&self) -> Result<Vec<(KeyId, String)>, StoreError>;

    // ── Tokens ──────────────────────────────────────────────────────────

    fn token(&self, id: TokenId) -> Result<Option<TokenRecord>, StoreError>;

    fn token_by_address(&self, token_address: &KeyId) -> Result<Option<TokenId>, StoreError>;

    fn token_by_symbol(&self, owner: &KeyId, symbol: &str) -> Result<Option<TokenId>, StoreError>;

    /// All tokens, ordered by id.
    fn tokens(&self) -> Result<Vec<TokenRecord>, StoreError>;

    /// Available (unlocked) balance of `holder`.
    fn token_balance(&self, token: TokenId, holder: &KeyId) -> Result<u64, StoreError>;

    /// Non-zero available balances of `token`, ordered by holder.
    fn token_holders(&self, token: TokenId) -> Result<Vec<(KeyId, u64)>, StoreError>;

    /// Locks held by `holder`, ordered by expiry height.
    fn token_locks(&self, token: TokenId, holder: &KeyId) -> Result<Vec<TokenLock>, StoreError>;

    /// Every lock on `token`, ordered by holder, then expiry height.
    fn all_token_locks(&self, token: TokenId) -> Result<Vec<TokenLock>, StoreError>;

    /// Tokens `holder` has ever held a balance or lock in, ordered by id.
    fn holder_tokens(&self, holder: &KeyId) -> Result<Vec<TokenId>, StoreError>;

    // ── Coin balances ───────────────────────────────────────────────────

    /// Coin balances recorded by chain sync, ordered by address.
    fn coin_balances(&self) -> Result<Vec<(KeyId, u64)>, StoreError>;

    /// The block the recorded coin balances belong to.
    fn synced_block(&self) -> Result<Option<SyncedBlock>, StoreError>;

    // ── Applier bookkeeping ─────────────────────────────────────────────

    fn apply_cursor(&self) -> Result<Option<ApplyCursor>, StoreError>;

    /// Id the next created token will receive.
    fn next_token_id(&self) -> Result<TokenId, StoreError> {
        Ok(self
            .tokens()?
            .last()
            .map(|t| t.id.next())
            .unwrap_or(TokenId::FIRST))
    }
}

/// An atomic write batch.
///
/// Unique-key inserts return [`StoreError::Duplicate`] instead of
/// overwriting. Secondary indices change in the same batch as their primary
/// record. Dropping the batch without [`LedgerBatch::commit`] discards it.
pub trait LedgerBatch: LedgerView {
    /// Fails if the address or the name is already registered.
    fn insert_delegate(&mut self, record: &DelegateRecord) -> Result<(), StoreError>;

    /// Fails if `voter` already votes for `delegate`.
    fn add_delegate_vote(&mut self, voter: &KeyId, delegate: &KeyId) -> Result<(), StoreError>;

    /// Fails with `NotFound` if `voter` does not vote for `delegate`.
    fn remove_delegate_vote(&mut self, voter: &KeyId, delegate: &KeyId) -> Result<(), StoreError>;

    /// Fails if the address or the name is already a committee.
    fn insert_committee(&mut self, record: &CommitteeRecord) -> Result<(), StoreError>;

    /// Fails if `voter` already backs any committee.
    fn put_committee_vote(&mut self, voter: &KeyId, committee: &KeyId) -> Result<(), StoreError>;

    /// Fails with `NotFound` unless `voter` backs exactly `committee`.
    fn remove_committee_vote(&mut self, voter: &KeyId, committee: &KeyId) -> Result<(), StoreError>;

    /// Fails if a bill with the same id exists.
    fn insert_bill(&mut self, record: &BillRecord) -> Result<(), StoreError>;

    /// Fails if `voter` already voted on `bill`.
    fn put_bill_vote(&mut self, bill: &BillId, voter: &KeyId, option: u8) -> Result<(), StoreError>;

    /// Freeze a bill's outcome and the weight of each of its voters.
    ///
    /// Fails if the bill is unknown or already frozen.
    fn freeze_bill(
        &mut self,
        bill: &BillId,
        state: &BillState,
        weights: &[(KeyId, u64)],
    ) -> Result<(), StoreError>;

    /// Fails if the address already has a name or the name is taken.
    fn insert_name(&mut self, address: &KeyId, name: &str) -> Result<(), StoreError>;

    /// Fails if the id, the token address or the (owner, symbol) pair is taken.
    fn insert_token(&mut self, record: &TokenRecord) -> Result<(), StoreError>;

    /// Set the available balance; 0 removes the entry.
    fn set_token_balance(&mut self, token: TokenId, holder: &KeyId, amount: u64) -> Result<(), StoreError>;

    /// Add to the lock at `(token, holder, expiry_height)`, creating it if absent.
    fn add_token_lock(&mut self, lock: &TokenLock) -> Result<(), StoreError>;

    /// Remove a lock entirely. Fails with `NotFound` if absent.
    fn remove_token_lock(
        &mut self,
        token: TokenId,
        holder: &KeyId,
        expiry_height: u64,
    ) -> Result<(), StoreError>;

    /// Record the coin balance of `address`. Zero removes it.
    fn set_coin_balance(&mut self, address: &KeyId, amount: u64) -> Result<(), StoreError>;

    fn set_synced_block(&mut self, block: SyncedBlock) -> Result<(), StoreError>;

    fn set_apply_cursor(&mut self, cursor: ApplyCursor) -> Result<(), StoreError>;

    /// Commit every write in the batch atomically.
    fn commit(self) -> Result<(), StoreError>;
}

/// A ledger backend.
pub trait LedgerStore: Send + Sync {
    type Snapshot<'a>: LedgerView
    where
        Self: 'a;

    type Batch<'a>: LedgerBatch
    where
        Self: 'a;

    /// A consistent read-only view of the last committed state.
    fn snapshot(&self) -> Result<Self::Snapshot<'_>, StoreError>;

    /// Begin the single write batch. Blocks while another batch is open.
    fn begin_batch(&self) -> Result<Self::Batch<'_>, StoreError>;
}
