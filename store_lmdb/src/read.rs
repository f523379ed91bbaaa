//! Read helpers shared by snapshots and write batches.

use std::ops::Bound;

use heed::RoTxn;
use serde::de::DeserializeOwned;

use agora_store::StoreError;
use agora_types::KeyId;

use crate::keys::increment_prefix;
use crate::tables::Db;
use crate::LmdbError;

/// Point lookup of a bincode value.
pub(crate) fn get_value<T: DeserializeOwned>(
    db: Db,
    txn: &RoTxn,
    key: &[u8],
) -> Result<Option<T>, StoreError> {
    match db.get(txn, key).map_err(LmdbError::from)? {
        Some(bytes) => Ok(Some(bincode::deserialize(bytes).map_err(LmdbError::from)?)),
        None => Ok(None),
    }
}

/// Point lookup of a raw 20-byte key id value.
pub(crate) fn get_key_id(db: Db, txn: &RoTxn, key: &[u8]) -> Result<Option<KeyId>, StoreError> {
    match db.get(txn, key).map_err(LmdbError::from)? {
        Some(bytes) => Ok(Some(KeyId::from_slice(bytes).map_err(|e| {
            StoreError::Corruption(format!("stored key id: {e}"))
        })?)),
        None => Ok(None),
    }
}

/// Point lookup of a big-endian u64 value.
pub(crate) fn get_u64(db: Db, txn: &RoTxn, key: &[u8]) -> Result<Option<u64>, StoreError> {
    match db.get(txn, key).map_err(LmdbError::from)? {
        Some(bytes) => Ok(Some(crate::keys::u64_at(bytes, 0)?)),
        None => Ok(None),
    }
}

pub(crate) fn contains(db: Db, txn: &RoTxn, key: &[u8]) -> Result<bool, StoreError> {
    Ok(db.get(txn, key).map_err(LmdbError::from)?.is_some())
}

/// Prefix range-scan: every `(key, value)` whose key starts with `prefix`,
/// in key order. An empty prefix scans the whole table.
pub(crate) fn scan_prefix(
    db: Db,
    txn: &RoTxn,
    prefix: &[u8],
) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
    let upper = increment_prefix(prefix);
    // LMDB refuses zero-length keys, even as a range bound.
    let bounds = (
        if prefix.is_empty() {
            Bound::Unbounded
        } else {
            Bound::Included(prefix)
        },
        match upper.as_deref() {
            Some(upper) => Bound::Excluded(upper),
            None => Bound::Unbounded,
        },
    );
    let iter = db.range(txn, &bounds).map_err(LmdbError::from)?;
    let mut results = Vec::new();
    for result in iter {
        let (key, val) = result.map_err(LmdbError::from)?;
        results.push((key.to_vec(), val.to_vec()));
    }
    Ok(results)
}

/// Every value in a table of bincode records, in key order.
pub(crate) fn scan_values<T: DeserializeOwned>(db: Db, txn: &RoTxn) -> Result<Vec<T>, StoreError> {
    let iter = db.iter(txn).map_err(LmdbError::from)?;
    let mut results = Vec::new();
    for result in iter {
        let (_key, val) = result.map_err(LmdbError::from)?;
        results.push(bincode::deserialize(val).map_err(LmdbError::from)?);
    }
    Ok(results)
}

/// Every key in a table up to and including `upper`, in key order.
pub(crate) fn scan_keys_through(db: Db, txn: &RoTxn, upper: &[u8]) -> Result<Vec<Vec<u8>>, StoreError> {
    let bounds: (Bound<&[u8]>, Bound<&[u8]>) = (Bound::Unbounded, Bound::Included(upper));
    let iter = db.range(txn, &bounds).map_err(LmdbError::from)?;
    let mut results = Vec::new();
    for result in iter {
        let (key, _val) = result.map_err(LmdbError::from)?;
        results.push(key.to_vec());
    }
    Ok(results)
}
