//! The Agora node: wires the store, the applier, chain sync and submission.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use agora_ledger::{ledger_digest, Applier, LedgerDigest};
use agora_operations::TransactionBuilder;
use agora_store::{ChainClock, LedgerStore, LedgerView};
use agora_store_lmdb::{check_data_dir, LmdbEnvironment};
use agora_types::{ChainContext, ProtocolParams, Timestamp};

use crate::config::NodeConfig;
use crate::error::NodeError;
use crate::events::{EventBus, LedgerEvent};
use crate::metrics::NodeMetrics;
use crate::pipeline::SubmissionPipeline;
use crate::shutdown::{ShutdownController, ShutdownSignal};
use crate::sync::{ChainUpdate, SyncDriver};
use crate::balances::PinnedBalances;
use crate::{BalanceSheet, ChainTip};

/// Named LMDB databases the ledger may open.
const MAX_DBS: u32 = 32;

/// A running node over some ledger backend.
pub struct AgoraNode<S: LedgerStore> {
    config: NodeConfig,
    store: Arc<S>,
    applier: Arc<Mutex<Applier<S>>>,
    balances: Arc<BalanceSheet>,
    tip: Arc<ChainTip>,
    metrics: Arc<NodeMetrics>,
    events: EventBus,
    shutdown: ShutdownController,
}

impl AgoraNode<LmdbEnvironment> {
    /// Open (or create) the LMDB ledger under `config.data_dir`.
    ///
    /// Refuses to start on a database that fails its integrity check.
    pub fn open(config: NodeConfig) -> Result<Self, NodeError> {
        check_data_dir(&config.data_dir).map_err(NodeError::Config)?;
        let env = LmdbEnvironment::open(&config.data_dir, MAX_DBS, config.lmdb_map_size)?;
        let report = env.integrity()?;
        if !report.is_healthy() {
            return Err(NodeError::Other(format!(
                "ledger database failed its integrity check: {}",
                report.errors.join("; ")
            )));
        }
        tracing::info!(
            databases = report.databases_checked,
            entries = report.total_entries,
            "ledger integrity verified"
        );
        Self::with_store(config, Arc::new(env))
    }
}

impl<S: LedgerStore + 'static> AgoraNode<S> {
    /// Build a node over an already opened store.
    pub fn with_store(config: NodeConfig, store: Arc<S>) -> Result<Self, NodeError> {
        let applier = Applier::new(Arc::clone(&store), config.params.clone());
        let tip = ChainTip::new();
        let (synced, recorded) = {
            let snapshot = store.snapshot()?;
            (snapshot.synced_block()?, snapshot.coin_balances()?)
        };
        let balances = match synced {
            Some(block) => {
                tip.advance(block.height, block.time);
                tracing::info!(
                    height = block.height,
                    addresses = recorded.len(),
                    "restored coin balances"
                );
                BalanceSheet::restore(block.height, recorded)
            }
            None => BalanceSheet::new(),
        };
        if let Some(cursor) = applier.cursor()? {
            if synced.is_none() {
                // No block recorded yet; the wall clock covers the gap until
                // chain sync delivers the next one.
                tip.advance(cursor.height, Timestamp::EPOCH);
            }
            tracing::info!(height = cursor.height, next_tx = cursor.next_tx, "resuming ledger");
        }
        Ok(Self {
            config,
            store,
            applier: Arc::new(Mutex::new(applier)),
            balances: Arc::new(balances),
            tip: Arc::new(tip),
            metrics: Arc::new(NodeMetrics::new()),
            events: EventBus::new(),
            shutdown: ShutdownController::new(),
        })
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn params(&self) -> &ProtocolParams {
        &self.config.params
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn balances(&self) -> &Arc<BalanceSheet> {
        &self.balances
    }

    pub fn tip(&self) -> &Arc<ChainTip> {
        &self.tip
    }

    pub fn metrics(&self) -> &Arc<NodeMetrics> {
        &self.metrics
    }

    /// The position a query taken now is pinned to: the last block chain
    /// sync recorded.
    pub fn query_context(&self) -> Result<ChainContext, NodeError> {
        let snapshot = self.store.snapshot()?;
        Ok(PinnedBalances::load(&snapshot)?.context())
    }

    /// Register a ledger event listener. Only listeners added before
    /// [`AgoraNode::start_sync`] are called.
    pub fn subscribe(&mut self, listener: Box<dyn Fn(&LedgerEvent) + Send + Sync>) {
        self.events.subscribe(listener);
    }

    /// A driver for applying blocks directly, bypassing the sync task.
    pub fn sync_driver(&mut self) -> SyncDriver<S> {
        SyncDriver::new(
            Arc::clone(&self.applier),
            Arc::clone(&self.balances),
            Arc::clone(&self.tip),
            Arc::new(std::mem::take(&mut self.events)),
            Arc::clone(&self.metrics),
        )
    }

    /// Spawn the chain sync task. Returns the sender chain sync pushes
    /// confirmed blocks into, and the task handle.
    pub fn start_sync(
        &mut self,
    ) -> (
        mpsc::Sender<ChainUpdate>,
        JoinHandle<Result<(), NodeError>>,
    ) {
        let (tx, rx) = mpsc::channel(self.config.block_queue_capacity.max(1));
        let driver = self.sync_driver();
        let signal = self.shutdown.subscribe();
        let handle = tokio::spawn(driver.run(rx, signal));
        tracing::info!(
            network = self.config.network.as_str(),
            queue = self.config.block_queue_capacity,
            "chain sync started"
        );
        (tx, handle)
    }

    /// A submission pipeline broadcasting through `builder`.
    pub fn pipeline<B: TransactionBuilder>(
        &self,
        builder: Arc<B>,
    ) -> SubmissionPipeline<S, BalanceSheet, B> {
        let clock: Arc<dyn ChainClock> = Arc::clone(&self.tip) as Arc<dyn ChainClock>;
        SubmissionPipeline::new(
            Arc::clone(&self.store),
            Arc::clone(&self.balances),
            builder,
            clock,
            self.config.params.clone(),
        )
        .with_timeout(Duration::from_secs(self.config.submission_timeout_secs))
        .with_metrics(Arc::clone(&self.metrics))
    }

    /// Digest of the committed ledger state.
    pub fn digest(&self) -> Result<LedgerDigest, NodeError> {
        let snapshot = self.store.snapshot()?;
        Ok(ledger_digest(&snapshot)?)
    }

    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.subscribe()
    }

    pub fn shutdown_controller(&self) -> &ShutdownController {
        &self.shutdown
    }

    /// Ask every task to stop.
    pub fn shutdown(&self) {
        tracing::info!("node shutting down");
        self.shutdown.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_nullables::NullStore;
    use agora_store::{ApplyCursor, BalanceOracle, LedgerBatch, SyncedBlock};
    use agora_types::KeyId;

    #[test]
    fn resumes_tip_from_cursor() {
        let store = Arc::new(NullStore::new());
        let mut batch = store.begin_batch().unwrap();
        batch
            .set_apply_cursor(ApplyCursor { height: 42, next_tx: 0 })
            .unwrap();
        batch.commit().unwrap();

        let node = AgoraNode::with_store(NodeConfig::default(), store).unwrap();
        assert_eq!(node.tip().last_block().height, 42);
        assert_eq!(
            node.query_context().unwrap(),
            ChainContext::new(42, Timestamp::EPOCH)
        );
    }

    #[test]
    fn restores_recorded_balances_and_block_time() {
        let store = Arc::new(NullStore::new());
        let mut batch = store.begin_batch().unwrap();
        batch.set_coin_balance(&KeyId::new([5; 20]), 300).unwrap();
        batch
            .set_synced_block(SyncedBlock::new(12, Timestamp::new(7_200)))
            .unwrap();
        batch.set_apply_cursor(ApplyCursor::new(12, 1)).unwrap();
        batch.commit().unwrap();

        let node = AgoraNode::with_store(NodeConfig::default(), store).unwrap();
        assert_eq!(
            node.tip().last_block(),
            ChainContext::new(12, Timestamp::new(7_200))
        );
        assert_eq!(node.balances().spendable_balance(&KeyId::new([5; 20])), 300);
        assert_eq!(node.balances().chain_height(), 12);
        assert_eq!(node.query_context().unwrap().time, Timestamp::new(7_200));
    }

    #[test]
    fn lmdb_node_opens_fresh_directory() {
        let dir = tempfile::tempdir().unwrap();
        let config = NodeConfig {
            data_dir: dir.path().join("ledger"),
            lmdb_map_size: 10 * 1024 * 1024,
            ..NodeConfig::default()
        };
        let node = AgoraNode::open(config).unwrap();
        assert_eq!(node.digest().unwrap().counts.delegates, 0);
    }

    #[tokio::test]
    async fn sync_task_stops_on_shutdown() {
        let mut node = AgoraNode::with_store(NodeConfig::default(), Arc::new(NullStore::new())).unwrap();
        let (_tx, handle) = node.start_sync();
        node.shutdown();
        assert!(handle.await.unwrap().is_ok());
    }
}
