//! Chain sync driver: feeds confirmed blocks to the applier in order.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};

use agora_ledger::{Applier, BlockReport, ConfirmedBlock, LedgerError};
use agora_store::{LedgerBatch, LedgerStore, LedgerView, SyncedBlock};
use agora_types::KeyId;

use crate::{BalanceSheet, ChainTip, EventBus, LedgerEvent, NodeError, NodeMetrics, ShutdownSignal};

/// One confirmed block together with the coin balances it changed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainUpdate {
    pub block: ConfirmedBlock,
    /// Post-block spendable balance of every address the block touched.
    pub balances: Vec<(KeyId, u64)>,
}

impl ChainUpdate {
    pub fn new(block: ConfirmedBlock) -> Self {
        Self {
            block,
            balances: Vec::new(),
        }
    }

    pub fn with_balance(mut self, address: KeyId, amount: u64) -> Self {
        self.balances.push((address, amount));
        self
    }
}

/// The single writer. Owns the applier behind an async mutex and keeps the
/// balance sheet, the chain tip, metrics and subscribers in step with it.
pub struct SyncDriver<S: LedgerStore> {
    applier: Arc<Mutex<Applier<S>>>,
    balances: Arc<BalanceSheet>,
    tip: Arc<ChainTip>,
    events: Arc<EventBus>,
    metrics: Arc<NodeMetrics>,
}

impl<S: LedgerStore> Clone for SyncDriver<S> {
    fn clone(&self) -> Self {
        Self {
            applier: Arc::clone(&self.applier),
            balances: Arc::clone(&self.balances),
            tip: Arc::clone(&self.tip),
            events: Arc::clone(&self.events),
            metrics: Arc::clone(&self.metrics),
        }
    }
}

impl<S: LedgerStore> SyncDriver<S> {
    pub fn new(
        applier: Arc<Mutex<Applier<S>>>,
        balances: Arc<BalanceSheet>,
        tip: Arc<ChainTip>,
        events: Arc<EventBus>,
        metrics: Arc<NodeMetrics>,
    ) -> Self {
        Self {
            applier,
            balances,
            tip,
            events,
            metrics,
        }
    }

    /// Apply one update: check the block can be taken, record its balances,
    /// apply it, then advance the tip and notify.
    ///
    /// A refused block leaves the balances, the store and the tip as they
    /// were.
    pub async fn apply(&self, update: ChainUpdate) -> Result<BlockReport, NodeError> {
        let mut applier = self.applier.lock().await;
        let block = &update.block;
        if let Err(e) = applier.check_block(block) {
            return Err(self.refused(block, e));
        }
        self.record_balances(applier.store().as_ref(), &update)?;

        let started = Instant::now();
        let report = match applier.apply_block(block, self.balances.as_ref()) {
            Ok(report) => report,
            Err(e) => return Err(self.refused(block, e)),
        };
        let elapsed_ms = started.elapsed().as_secs_f64() * 1_000.0;
        drop(applier);

        if !report.skipped {
            self.tip.advance(block.height, block.time);
        }
        self.metrics.record_block(&report, elapsed_ms);
        for event in LedgerEvent::from_report(&report) {
            self.events.emit(&event);
        }
        Ok(report)
    }

    fn refused(&self, block: &ConfirmedBlock, e: LedgerError) -> NodeError {
        if e.is_fatal() {
            error!(height = block.height, error = %e, "applier halted");
            self.events.emit(&LedgerEvent::ApplierHalted {
                height: block.height,
                reason: e.to_string(),
            });
        }
        e.into()
    }

    /// Store the block's balances with its position, then mirror them in the
    /// sheet. A block below the last recorded one is a replay and keeps the
    /// newer balances.
    fn record_balances(&self, store: &S, update: &ChainUpdate) -> Result<(), NodeError> {
        let block = &update.block;
        let synced = store.snapshot()?.synced_block()?;
        if synced.is_some_and(|synced| block.height < synced.height) {
            debug!(height = block.height, "replayed block keeps recorded balances");
            return Ok(());
        }
        let mut batch = store.begin_batch()?;
        for (address, amount) in &update.balances {
            batch.set_coin_balance(address, *amount)?;
        }
        batch.set_synced_block(SyncedBlock::new(block.height, block.time))?;
        batch.commit()?;
        self.balances.update(block.height, &update.balances);
        Ok(())
    }

    /// Drain `updates` until the channel closes or shutdown is requested.
    ///
    /// Ordering violations are logged and the offending block dropped; a
    /// fatal ledger error stops the loop.
    pub async fn run(
        self,
        mut updates: mpsc::Receiver<ChainUpdate>,
        mut shutdown: ShutdownSignal,
    ) -> Result<(), NodeError> {
        loop {
            tokio::select! {
                _ = shutdown.wait() => {
                    info!("chain sync stopping");
                    return Ok(());
                }
                update = updates.recv() => {
                    let Some(update) = update else {
                        info!("chain sync feed closed");
                        return Ok(());
                    };
                    match self.apply(update).await {
                        Ok(_) => {}
                        Err(NodeError::Ledger(e)) if !e.is_fatal() => {
                            warn!(error = %e, "block dropped");
                        }
                        Err(e) => return Err(e),
                    }
                }
            }
        }
    }
}
