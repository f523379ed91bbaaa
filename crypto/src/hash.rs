//! Blake2b and hash160 hashing.

use agora_types::{BillId, KeyId};
use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use ripemd::Ripemd160;
use sha2::Sha256;

type Blake2b256 = Blake2b<U32>;

/// Compute a 256-bit Blake2b hash of arbitrary data.
pub fn blake2b_256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Blake2bHasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// Hash multiple byte slices in sequence (avoids concatenation allocation).
pub fn blake2b_256_multi(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Blake2bHasher::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize()
}

/// Incremental Blake2b-256, for digests over many records.
pub struct Blake2bHasher(Blake2b256);

impl Blake2bHasher {
    pub fn new() -> Self {
        Self(Blake2b256::new())
    }

    pub fn update(&mut self, data: &[u8]) {
        Digest::update(&mut self.0, data);
    }

    pub fn finalize(self) -> [u8; 32] {
        let result = self.0.finalize();
        let mut output = [0u8; 32];
        output.copy_from_slice(&result);
        output
    }
}

impl Default for Blake2bHasher {
    fn default() -> Self {
        Self::new()
    }
}

/// RIPEMD-160 of SHA-256.
pub fn hash160(data: &[u8]) -> [u8; 20] {
    let sha = Sha256::digest(data);
    let result = Ripemd160::digest(sha);
    let mut output = [0u8; 20];
    output.copy_from_slice(&result);
    output
}

/// The key id of a serialized public key.
pub fn key_id_from_pubkey(pubkey: &[u8]) -> KeyId {
    KeyId::new(hash160(pubkey))
}

/// A bill is identified by the hash160 of its title bytes.
pub fn bill_id(title: &str) -> BillId {
    BillId::new(hash160(title.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blake2b_deterministic() {
        let h1 = blake2b_256(b"hello agora");
        let h2 = blake2b_256(b"hello agora");
        assert_eq!(h1, h2);
    }

    #[test]
    fn blake2b_multi_matches_concatenation() {
        let joined = blake2b_256(b"helloworld");
        let parts = blake2b_256_multi(&[b"hello", b"world"]);
        assert_eq!(joined, parts);
    }

    #[test]
    fn hash160_empty_vector() {
        assert_eq!(
            hex::encode(hash160(b"")),
            "b472a266d0bd89c13706a4132ccfb16f7c3b9fcb"
        );
    }

    #[test]
    fn bill_id_depends_only_on_title() {
        assert_eq!(bill_id("t1"), bill_id("t1"));
        assert_ne!(bill_id("t1"), bill_id("t2"));
        assert_eq!(bill_id("t1").as_bytes(), &hash160(b"t1"));
    }
}
