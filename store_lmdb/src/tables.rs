//! Named LMDB databases.

use heed::types::Bytes;
use heed::{Database, Env};

use crate::LmdbError;

pub(crate) type Db = Database<Bytes, Bytes>;

/// Every database name in the environment, in creation order.
pub(crate) const TABLE_NAMES: &[&str] = &[
    "delegates",
    "delegate_names",
    "delegate_votes",
    "delegate_voters",
    "committees",
    "committee_names",
    "committee_votes",
    "committee_voters",
    "bills",
    "committee_bills",
    "bill_votes",
    "voter_bills",
    "bill_states",
    "bills_due",
    "names",
    "name_index",
    "tokens",
    "token_addresses",
    "token_symbols",
    "token_balances",
    "token_locks",
    "holder_tokens",
    "coin_balances",
    "meta",
];

/// Handles to every database. Copyable, shared by snapshots and batches.
#[derive(Clone, Copy)]
pub(crate) struct Tables {
    /// address -> DelegateRecord
    pub delegates: Db,
    /// name -> address
    pub delegate_names: Db,
    /// voter ++ delegate -> ()
    pub delegate_votes: Db,
    /// delegate ++ voter -> ()
    pub delegate_voters: Db,
    /// address -> CommitteeRecord
    pub committees: Db,
    /// name -> address
    pub committee_names: Db,
    /// voter -> committee
    pub committee_votes: Db,
    /// committee ++ voter -> ()
    pub committee_voters: Db,
    /// bill -> BillRecord
    pub bills: Db,
    /// committee ++ bill -> ()
    pub committee_bills: Db,
    /// bill ++ voter -> BillVote
    pub bill_votes: Db,
    /// voter ++ bill -> ()
    pub voter_bills: Db,
    /// bill -> BillState
    pub bill_states: Db,
    /// end_time_be ++ bill -> (), removed when the bill is frozen
    pub bills_due: Db,
    /// address -> name
    pub names: Db,
    /// name -> address
    pub name_index: Db,
    /// token_be -> TokenRecord
    pub tokens: Db,
    /// token address -> token_be
    pub token_addresses: Db,
    /// owner ++ symbol -> token_be
    pub token_symbols: Db,
    /// token_be ++ holder -> amount_be
    pub token_balances: Db,
    /// token_be ++ holder ++ expiry_be -> amount_be
    pub token_locks: Db,
    /// holder ++ token_be -> ()
    pub holder_tokens: Db,
    /// address -> amount_be
    pub coin_balances: Db,
    /// string key -> bytes
    pub meta: Db,
}

impl Tables {
    /// Open or create every database in one write transaction.
    pub(crate) fn create(env: &Env) -> Result<Self, LmdbError> {
        let mut wtxn = env.write_txn()?;
        let mut open = |name: &str| -> Result<Db, LmdbError> {
            Ok(env.create_database::<Bytes, Bytes>(&mut wtxn, Some(name))?)
        };
        let tables = Self {
            delegates: open("delegates")?,
            delegate_names: open("delegate_names")?,
            delegate_votes: open("delegate_votes")?,
            delegate_voters: open("delegate_voters")?,
            committees: open("committees")?,
            committee_names: open("committee_names")?,
            committee_votes: open("committee_votes")?,
            committee_voters: open("committee_voters")?,
            bills: open("bills")?,
            committee_bills: open("committee_bills")?,
            bill_votes: open("bill_votes")?,
            voter_bills: open("voter_bills")?,
            bill_states: open("bill_states")?,
            bills_due: open("bills_due")?,
            names: open("names")?,
            name_index: open("name_index")?,
            tokens: open("tokens")?,
            token_addresses: open("token_addresses")?,
            token_symbols: open("token_symbols")?,
            token_balances: open("token_balances")?,
            token_locks: open("token_locks")?,
            holder_tokens: open("holder_tokens")?,
            coin_balances: open("coin_balances")?,
            meta: open("meta")?,
        };
        wtxn.commit()?;
        Ok(tables)
    }
}
