//! Confirmed blocks as delivered by chain sync.

use serde::{Deserialize, Serialize};

use agora_types::{BlockHeight, ChainContext, KeyId, Timestamp};

/// A confirmed transaction carrying an operation payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmedTx {
    /// Position of the transaction within its block.
    pub tx_index: u32,
    pub payload: Vec<u8>,
    /// The address that funded the transaction.
    pub sender: KeyId,
    /// Fee attached to the transaction, in raw coin units.
    pub fee: u64,
}

/// A confirmed block: its height, its time and the operation-carrying
/// transactions in it, in ascending index order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmedBlock {
    pub height: BlockHeight,
    pub time: Timestamp,
    pub txs: Vec<ConfirmedTx>,
}

impl ConfirmedBlock {
    pub fn new(height: BlockHeight, time: Timestamp) -> Self {
        Self {
            height,
            time,
            txs: Vec::new(),
        }
    }

    /// Chain position the block's operations are validated at.
    pub fn context(&self) -> ChainContext {
        ChainContext::new(self.height, self.time)
    }

    /// Append a transaction at the next index.
    pub fn with_tx(mut self, payload: Vec<u8>, sender: KeyId, fee: u64) -> Self {
        let tx_index = self.txs.last().map_or(0, |tx| tx.tx_index + 1);
        self.txs.push(ConfirmedTx {
            tx_index,
            payload,
            sender,
            fee,
        });
        self
    }
}
