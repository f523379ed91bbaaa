use agora_types::{BlockHeight, KeyId, TokenId};
use serde::{Deserialize, Serialize};

/// A user-issued token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub id: TokenId,
    pub symbol: String,
    pub name: String,
    pub owner: KeyId,
    /// The address the token is bound to; at most one token per address.
    pub token_address: KeyId,
    /// Total supply in raw units (human supply times `10^digits`).
    pub total_amount: u64,
    pub digits: u8,
    pub created_height: BlockHeight,
}

/// Tokens held by `holder` that cannot be spent before `expiry_height`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenLock {
    pub token: TokenId,
    pub holder: KeyId,
    pub expiry_height: BlockHeight,
    pub amount: u64,
}

impl TokenLock {
    pub fn is_matured_at(&self, height: BlockHeight) -> bool {
        height >= self.expiry_height
    }
}
