//! Token creation, transfer and time-locked transfer.

use agora_types::{BlockHeight, KeyId, TokenId};
use serde::{Deserialize, Serialize};

/// Create a token owned by the sender, who receives the whole supply.
///
/// `total_amount` is already scaled: it equals the human supply times
/// `10^digits`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateToken {
    pub symbol: String,
    pub name: String,
    pub token_address: KeyId,
    pub total_amount: u64,
    pub digits: u8,
}

/// Move `amount` of `token` from the sender's available balance to `to`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferToken {
    pub token: TokenId,
    pub to: KeyId,
    pub amount: u64,
    pub comment: String,
}

/// Move `amount` of `token` from the sender into a lock held by `to` that
/// matures at `expiry_height`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockToken {
    pub token: TokenId,
    pub to: KeyId,
    pub amount: u64,
    pub expiry_height: BlockHeight,
    pub comment: String,
}
