//! Composite key layouts.
//!
//! Integers are big-endian so that byte order equals numeric order.

use agora_types::{BillId, KeyId, Timestamp, TokenId};

use crate::LmdbError;

/// `a ++ b`.
pub(crate) fn pair(a: &[u8], b: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(a.len() + b.len());
    key.extend_from_slice(a);
    key.extend_from_slice(b);
    key
}

/// `token_be ++ holder`, the key of an available balance.
pub(crate) fn balance_key(token: TokenId, holder: &KeyId) -> Vec<u8> {
    pair(&token.to_be_bytes(), holder.as_bytes())
}

/// `token_be ++ holder ++ expiry_be`, the key of a lock.
pub(crate) fn lock_key(token: TokenId, holder: &KeyId, expiry_height: u64) -> Vec<u8> {
    let mut key = balance_key(token, holder);
    key.extend_from_slice(&expiry_height.to_be_bytes());
    key
}

/// `end_time_be ++ bill`, the key of a bill awaiting its freeze.
pub(crate) fn due_key(end_time: Timestamp, bill: &BillId) -> Vec<u8> {
    pair(&end_time.as_secs().to_be_bytes(), bill.as_bytes())
}

/// The smallest byte string greater than every string starting with `prefix`,
/// or `None` when no such bound exists (all bytes are 0xff).
pub(crate) fn increment_prefix(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut upper = prefix.to_vec();
    while let Some(last) = upper.last_mut() {
        if *last < 0xff {
            *last += 1;
            return Some(upper);
        }
        upper.pop();
    }
    None
}

pub(crate) fn key_id_at(bytes: &[u8], offset: usize) -> Result<KeyId, LmdbError> {
    bytes
        .get(offset..offset + KeyId::LEN)
        .and_then(|s| KeyId::from_slice(s).ok())
        .ok_or_else(|| LmdbError::Serialization(format!("short key id at offset {offset}")))
}

pub(crate) fn bill_id_at(bytes: &[u8], offset: usize) -> Result<BillId, LmdbError> {
    bytes
        .get(offset..offset + 20)
        .and_then(|s| BillId::from_slice(s).ok())
        .ok_or_else(|| LmdbError::Serialization(format!("short bill id at offset {offset}")))
}

pub(crate) fn u64_at(bytes: &[u8], offset: usize) -> Result<u64, LmdbError> {
    bytes
        .get(offset..offset + 8)
        .and_then(|s| <[u8; 8]>::try_from(s).ok())
        .map(u64::from_be_bytes)
        .ok_or_else(|| LmdbError::Serialization(format!("short u64 at offset {offset}")))
}
