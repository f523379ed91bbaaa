//! Key identifiers.
//!
//! A [`KeyId`] is the 20-byte hash160 of a public key. The same identifier
//! addresses coin balances, token balances, delegates and committees.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::AgoraError;

/// A 20-byte hash160 of a public key.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct KeyId([u8; 20]);

impl KeyId {
    pub const LEN: usize = 20;
    pub const ZERO: Self = Self([0u8; 20]);

    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Build a key id from a slice, failing unless it is exactly 20 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, AgoraError> {
        let arr: [u8; 20] = bytes
            .try_into()
            .map_err(|_| AgoraError::InvalidKeyId(format!("expected 20 bytes, got {}", bytes.len())))?;
        Ok(Self(arr))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl FromStr for KeyId {
    type Err = AgoraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|e| AgoraError::InvalidKeyId(format!("{s}: {e}")))?;
        Self::from_slice(&bytes)
    }
}

impl fmt::Debug for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyId({})", hex::encode(&self.0[..4]))
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_its_own_display() {
        let id = KeyId::new([0xab; 20]);
        let parsed: KeyId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn rejects_wrong_length() {
        assert!("abcd".parse::<KeyId>().is_err());
        assert!(KeyId::from_slice(&[0u8; 21]).is_err());
    }

    #[test]
    fn rejects_non_hex() {
        let s = "zz".repeat(20);
        assert!(matches!(s.parse::<KeyId>(), Err(AgoraError::InvalidKeyId(_))));
    }

    #[test]
    fn ordering_is_bytewise() {
        let mut low = [0u8; 20];
        low[19] = 1;
        let mut high = [0u8; 20];
        high[0] = 1;
        assert!(KeyId::new(low) < KeyId::new(high));
    }
}
