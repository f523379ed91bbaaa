//! A node over the in-memory store whose "wallet" records submissions, and
//! a miner that confirms whatever was submitted since the last block.

use std::sync::Arc;

use agora_ledger::{BlockReport, ConfirmedBlock};
use agora_node::{AgoraNode, BalanceSheet, ChainUpdate, NodeConfig, SubmissionPipeline, SyncDriver};
use agora_nullables::{NullStore, NullTxBuilder};
use agora_types::{ChainContext, KeyId, Timestamp};

pub struct Harness {
    pub node: AgoraNode<NullStore>,
    pub driver: SyncDriver<NullStore>,
    pub builder: Arc<NullTxBuilder>,
    pub pipeline: SubmissionPipeline<NullStore, BalanceSheet, NullTxBuilder>,
    /// Wall-clock start; block times are offsets from here.
    pub t0: u64,
    height: u64,
    confirmed: usize,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(NodeConfig::default())
    }

    pub fn with_config(config: NodeConfig) -> Self {
        let mut node = AgoraNode::with_store(config, Arc::new(NullStore::new())).unwrap();
        let driver = node.sync_driver();
        let builder = Arc::new(NullTxBuilder::new());
        let pipeline = node.pipeline(Arc::clone(&builder));
        Self {
            node,
            driver,
            builder,
            pipeline,
            t0: Timestamp::now().as_secs(),
            height: 0,
            confirmed: 0,
        }
    }

    /// Confirm every pending submission in one block at `t0 + offset`.
    pub async fn mine(&mut self, offset: u64, balances: &[(KeyId, u64)]) -> BlockReport {
        self.height += 1;
        let mut block = ConfirmedBlock::new(self.height, Timestamp::new(self.t0 + offset));
        let submitted = self.builder.submitted();
        for tx in submitted.iter().skip(self.confirmed) {
            block = block.with_tx(tx.payload.clone(), tx.from, tx.fee);
        }
        self.confirmed = submitted.len();
        let mut update = ChainUpdate::new(block);
        update.balances = balances.to_vec();
        self.driver.apply(update).await.unwrap()
    }

    /// The last mined block, without the wall clock.
    pub fn at(&self) -> ChainContext {
        self.node.tip().last_block()
    }
}
