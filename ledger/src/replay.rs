//! Replaying a stream of confirmed blocks from genesis.

use agora_store::{BalanceOracle, LedgerStore};

use crate::{Applier, BlockReport, ConfirmedBlock, LedgerError};

/// Totals over a replayed block stream.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub blocks: u64,
    pub skipped_blocks: u64,
    pub applied: u64,
    pub rejected: u64,
    pub malformed: u64,
    pub unrecognized: u64,
    pub bills_finalized: u64,
}

impl ReplaySummary {
    pub fn record(&mut self, report: &BlockReport) {
        self.blocks += 1;
        if report.skipped {
            self.skipped_blocks += 1;
        }
        self.applied += report.applied() as u64;
        self.rejected += report.rejected() as u64;
        self.malformed += report.malformed() as u64;
        self.unrecognized += report.unrecognized() as u64;
        self.bills_finalized += report.finalized.len() as u64;
    }
}

/// Apply each block with the balance oracle pinned to its height.
///
/// Stops at the first error; everything committed before it stays.
pub fn replay<S, O, I>(applier: &mut Applier<S>, blocks: I) -> Result<ReplaySummary, LedgerError>
where
    S: LedgerStore,
    O: BalanceOracle,
    I: IntoIterator<Item = (ConfirmedBlock, O)>,
{
    let mut summary = ReplaySummary::default();
    for (block, oracle) in blocks {
        let report = applier.apply_block(&block, &oracle)?;
        summary.record(&report);
    }
    tracing::info!(
        blocks = summary.blocks,
        applied = summary.applied,
        rejected = summary.rejected,
        "replay finished"
    );
    Ok(summary)
}
