//! Hash primitives for the Agora ledger.
//!
//! - hash160 (RIPEMD-160 of SHA-256) for key ids and bill ids
//! - Blake2b-256 for transaction ids and ledger state digests

pub mod hash;

pub use hash::{bill_id, blake2b_256, blake2b_256_multi, hash160, key_id_from_pubkey, Blake2bHasher};
