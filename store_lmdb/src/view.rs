//! `LedgerView` over an LMDB transaction.
//!
//! Snapshots hold a read transaction and batches hold the write transaction;
//! both read through the same code, so a batch sees its own writes.

use std::collections::BTreeSet;

use heed::RoTxn;

use agora_store::{
    ApplyCursor, BillRecord, BillState, BillVote, CommitteeRecord, DelegateRecord, LedgerView,
    StoreError, SyncedBlock, TokenLock, TokenRecord,
};
use agora_types::{BillId, KeyId, Timestamp, TokenId};

use crate::keys::{balance_key, bill_id_at, due_key, key_id_at, pair, u64_at};
use crate::read::{get_key_id, get_u64, get_value, scan_keys_through, scan_prefix, scan_values};
use crate::tables::Tables;
use crate::write_batch::LmdbBatch;

pub(crate) const APPLY_CURSOR_KEY: &[u8] = b"apply_cursor";
pub(crate) const SYNCED_BLOCK_KEY: &[u8] = b"synced_block";

/// A consistent read-only view of the ledger (one LMDB read transaction).
pub struct LmdbSnapshot<'e> {
    pub(crate) tables: Tables,
    pub(crate) txn: RoTxn<'e>,
}

impl<'e> LmdbSnapshot<'e> {
    fn ro(&self) -> &RoTxn<'e> {
        &self.txn
    }
}

fn token_id_value(bytes: &[u8]) -> Result<TokenId, StoreError> {
    Ok(TokenId::new(u64_at(bytes, 0)?))
}

macro_rules! impl_ledger_view {
    ($ty:ident) => {
        impl<'e> LedgerView for $ty<'e> {
            fn delegate(&self, address: &KeyId) -> Result<Option<DelegateRecord>, StoreError> {
                get_value(self.tables.delegates, self.ro(), address.as_bytes())
            }

            fn delegate_by_name(&self, name: &str) -> Result<Option<KeyId>, StoreError> {
                get_key_id(self.tables.delegate_names, self.ro(), name.as_bytes())
            }

            fn delegates(&self) -> Result<Vec<DelegateRecord>, StoreError> {
                scan_values(self.tables.delegates, self.ro())
            }

            fn delegate_votes_of(&self, voter: &KeyId) -> Result<BTreeSet<KeyId>, StoreError> {
                scan_prefix(self.tables.delegate_votes, self.ro(), voter.as_bytes())?
                    .iter()
                    .map(|(k, _)| key_id_at(k, KeyId::LEN).map_err(StoreError::from))
                    .collect()
            }

            fn delegate_voters(&self, delegate: &KeyId) -> Result<Vec<KeyId>, StoreError> {
                scan_prefix(self.tables.delegate_voters, self.ro(), delegate.as_bytes())?
                    .iter()
                    .map(|(k, _)| key_id_at(k, KeyId::LEN).map_err(StoreError::from))
                    .collect()
            }

            fn committee(&self, address: &KeyId) -> Result<Option<CommitteeRecord>, StoreError> {
                get_value(self.tables.committees, self.ro(), address.as_bytes())
            }

            fn committee_by_name(&self, name: &str) -> Result<Option<KeyId>, StoreError> {
                get_key_id(self.tables.committee_names, self.ro(), name.as_bytes())
            }

            fn committees(&self) -> Result<Vec<CommitteeRecord>, StoreError> {
                scan_values(self.tables.committees, self.ro())
            }

            fn committee_vote_of(&self, voter: &KeyId) -> Result<Option<KeyId>, StoreError> {
                get_key_id(self.tables.committee_votes, self.ro(), voter.as_bytes())
            }

            fn committee_voters(&self, committee: &KeyId) -> Result<Vec<KeyId>, StoreError> {
                scan_prefix(self.tables.committee_voters, self.ro(), committee.as_bytes())?
                    .iter()
                    .map(|(k, _)| key_id_at(k, KeyId::LEN).map_err(StoreError::from))
                    .collect()
            }

            fn bill(&self, id: &BillId) -> Result<Option<BillRecord>, StoreError> {
                get_value(self.tables.bills, self.ro(), id.as_bytes())
            }

            fn bills(&self) -> Result<Vec<BillRecord>, StoreError> {
                scan_values(self.tables.bills, self.ro())
            }

            fn committee_bills(&self, committee: &KeyId) -> Result<Vec<BillId>, StoreError> {
                scan_prefix(self.tables.committee_bills, self.ro(), committee.as_bytes())?
                    .iter()
                    .map(|(k, _)| bill_id_at(k, KeyId::LEN).map_err(StoreError::from))
                    .collect()
            }

            fn bill_vote(&self, bill: &BillId, voter: &KeyId) -> Result<Option<BillVote>, StoreError> {
                get_value(
                    self.tables.bill_votes,
                    self.ro(),
                    &pair(bill.as_bytes(), voter.as_bytes()),
                )
            }

            fn bill_votes(&self, bill: &BillId) -> Result<Vec<(KeyId, BillVote)>, StoreError> {
                scan_prefix(self.tables.bill_votes, self.ro(), bill.as_bytes())?
                    .iter()
                    .map(|(k, v)| -> Result<_, StoreError> {
                        let voter = key_id_at(k, 20)?;
                        let vote: BillVote =
                            bincode::deserialize(v).map_err(crate::LmdbError::from)?;
                        Ok((voter, vote))
                    })
                    .collect()
            }

            fn voter_bills(&self, voter: &KeyId) -> Result<Vec<BillId>, StoreError> {
                scan_prefix(self.tables.voter_bills, self.ro(), voter.as_bytes())?
                    .iter()
                    .map(|(k, _)| bill_id_at(k, KeyId::LEN).map_err(StoreError::from))
                    .collect()
            }

            fn bill_state(&self, id: &BillId) -> Result<Option<BillState>, StoreError> {
                get_value(self.tables.bill_states, self.ro(), id.as_bytes())
            }

            fn bills_due(&self, time: Timestamp) -> Result<Vec<BillId>, StoreError> {
                let upper = due_key(time, &BillId::new([0xff; 20]));
                scan_keys_through(self.tables.bills_due, self.ro(), &upper)?
                    .iter()
                    .map(|k| bill_id_at(k, 8).map_err(StoreError::from))
                    .collect()
            }

            fn address_name(&self, address: &KeyId) -> Result<Option<String>, StoreError> {
                match self
                    .tables
                    .names
                    .get(self.ro(), address.as_bytes())
                    .map_err(crate::LmdbError::from)?
                {
                    Some(bytes) => Ok(Some(String::from_utf8(bytes.to_vec()).map_err(|e| {
                        StoreError::Corruption(format!("stored name: {e}"))
                    })?)),
                    None => Ok(None),
                }
            }

            fn name_address(&self, name: &str) -> Result<Option<KeyId>, StoreError> {
                get_key_id(self.tables.name_index, self.ro(), name.as_bytes())
            }

            fn names(&self) -> Result<Vec<(KeyId, String)>, StoreError> {
                scan_prefix(self.tables.names, self.ro(), &[])?
                    .into_iter()
                    .map(|(k, v)| -> Result<_, StoreError> {
                        let name = String::from_utf8(v)
                            .map_err(|e| StoreError::Corruption(format!("stored name: {e}")))?;
                        Ok((key_id_at(&k, 0)?, name))
                    })
                    .collect()
            }

            fn token(&self, id: TokenId) -> Result<Option<TokenRecord>, StoreError> {
                get_value(self.tables.tokens, self.ro(), &id.to_be_bytes())
            }

            fn token_by_address(&self, token_address: &KeyId) -> Result<Option<TokenId>, StoreError> {
                Ok(get_u64(self.tables.token_addresses, self.ro(), token_address.as_bytes())?
                    .map(TokenId::new))
            }

            fn token_by_symbol(&self, owner: &KeyId, symbol: &str) -> Result<Option<TokenId>, StoreError> {
                Ok(get_u64(
                    self.tables.token_symbols,
                    self.ro(),
                    &pair(owner.as_bytes(), symbol.as_bytes()),
                )?
                .map(TokenId::new))
            }

            fn tokens(&self) -> Result<Vec<TokenRecord>, StoreError> {
                scan_values(self.tables.tokens, self.ro())
            }

            fn token_balance(&self, token: TokenId, holder: &KeyId) -> Result<u64, StoreError> {
                Ok(get_u64(self.tables.token_balances, self.ro(), &balance_key(token, holder))?
                    .unwrap_or(0))
            }

            fn token_holders(&self, token: TokenId) -> Result<Vec<(KeyId, u64)>, StoreError> {
                scan_prefix(self.tables.token_balances, self.ro(), &token.to_be_bytes())?
                    .iter()
                    .map(|(k, v)| -> Result<_, StoreError> { Ok((key_id_at(k, 8)?, u64_at(v, 0)?)) })
                    .collect()
            }

            fn token_locks(&self, token: TokenId, holder: &KeyId) -> Result<Vec<TokenLock>, StoreError> {
                scan_prefix(self.tables.token_locks, self.ro(), &balance_key(token, holder))?
                    .iter()
                    .map(|(k, v)| -> Result<_, StoreError> {
                        Ok(TokenLock {
                            token,
                            holder: *holder,
                            expiry_height: u64_at(k, 8 + KeyId::LEN)?,
                            amount: u64_at(v, 0)?,
                        })
                    })
                    .collect()
            }

            fn all_token_locks(&self, token: TokenId) -> Result<Vec<TokenLock>, StoreError> {
                scan_prefix(self.tables.token_locks, self.ro(), &token.to_be_bytes())?
                    .iter()
                    .map(|(k, v)| -> Result<_, StoreError> {
                        Ok(TokenLock {
                            token,
                            holder: key_id_at(k, 8)?,
                            expiry_height: u64_at(k, 8 + KeyId::LEN)?,
                            amount: u64_at(v, 0)?,
                        })
                    })
                    .collect()
            }

            fn holder_tokens(&self, holder: &KeyId) -> Result<Vec<TokenId>, StoreError> {
                scan_prefix(self.tables.holder_tokens, self.ro(), holder.as_bytes())?
                    .iter()
                    .map(|(k, _)| u64_at(k, KeyId::LEN).map(TokenId::new).map_err(StoreError::from))
                    .collect()
            }

            fn coin_balances(&self) -> Result<Vec<(KeyId, u64)>, StoreError> {
                scan_prefix(self.tables.coin_balances, self.ro(), &[])?
                    .iter()
                    .map(|(k, v)| -> Result<_, StoreError> { Ok((key_id_at(k, 0)?, u64_at(v, 0)?)) })
                    .collect()
            }

            fn synced_block(&self) -> Result<Option<SyncedBlock>, StoreError> {
                get_value(self.tables.meta, self.ro(), SYNCED_BLOCK_KEY)
            }

            fn apply_cursor(&self) -> Result<Option<ApplyCursor>, StoreError> {
                get_value(self.tables.meta, self.ro(), APPLY_CURSOR_KEY)
            }

            fn next_token_id(&self) -> Result<TokenId, StoreError> {
                let last = self
                    .tables
                    .tokens
                    .last(self.ro())
                    .map_err(crate::LmdbError::from)?;
                match last {
                    Some((key, _)) => Ok(token_id_value(key)?.next()),
                    None => Ok(TokenId::FIRST),
                }
            }
        }
    };
}

impl_ledger_view!(LmdbSnapshot);
impl_ledger_view!(LmdbBatch);
