//! The single writer: applies confirmed blocks to the ledger store.
//!
//! Blocks arrive in ascending height order. Each block first freezes the
//! bills whose voting window closed at or before its time, then applies its
//! operations in transaction-index order. Every operation commits in its own
//! batch together with the apply cursor, so a restart resumes exactly after
//! the last committed operation.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use agora_governance::{tally, validate, Effect, GovernanceError, Rejection, TokenDebit};
use agora_operations::{decode, CodecError, Operation};
use agora_store::{
    ApplyCursor, BalanceOracle, BillState, LedgerBatch, LedgerStore, LedgerView, TokenLock,
};
use agora_types::{BillId, BlockHeight, KeyId, ProtocolParams};

use crate::block::{ConfirmedBlock, ConfirmedTx};
use crate::error::Consistent;
use crate::LedgerError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApplierState {
    Idle,
    Applying { height: BlockHeight, tx_index: u32 },
    /// An admitted effect could not be stored. Nothing more is applied.
    Halted,
}

/// What happened to one transaction of a block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TxOutcome {
    Applied { kind: &'static str },
    /// Decoded but refused by the rules. The fee is spent, nothing else changes.
    Rejected(Rejection),
    Malformed(CodecError),
    Unrecognized { opcode: u8 },
    /// Already covered by the apply cursor.
    AlreadyApplied,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockReport {
    pub height: BlockHeight,
    /// Outcomes keyed by transaction index, in block order.
    pub outcomes: Vec<(u32, TxOutcome)>,
    /// Bills frozen at the start of this block.
    pub finalized: Vec<(BillId, BillState)>,
    /// The whole block lay below the apply cursor.
    pub skipped: bool,
}

impl BlockReport {
    fn new(height: BlockHeight) -> Self {
        Self {
            height,
            outcomes: Vec::new(),
            finalized: Vec::new(),
            skipped: false,
        }
    }

    fn skipped(height: BlockHeight) -> Self {
        Self {
            skipped: true,
            ..Self::new(height)
        }
    }

    pub fn applied(&self) -> usize {
        self.count(|o| matches!(o, TxOutcome::Applied { .. }))
    }

    pub fn rejected(&self) -> usize {
        self.count(|o| matches!(o, TxOutcome::Rejected(_)))
    }

    pub fn malformed(&self) -> usize {
        self.count(|o| matches!(o, TxOutcome::Malformed(_)))
    }

    pub fn unrecognized(&self) -> usize {
        self.count(|o| matches!(o, TxOutcome::Unrecognized { .. }))
    }

    fn count(&self, pred: impl Fn(&TxOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, o)| pred(o)).count()
    }
}

pub struct Applier<S: LedgerStore> {
    store: Arc<S>,
    params: ProtocolParams,
    state: ApplierState,
    last_height: Option<BlockHeight>,
}

impl<S: LedgerStore> Applier<S> {
    pub fn new(store: Arc<S>, params: ProtocolParams) -> Self {
        Self {
            store,
            params,
            state: ApplierState::Idle,
            last_height: None,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn params(&self) -> &ProtocolParams {
        &self.params
    }

    pub fn state(&self) -> ApplierState {
        self.state
    }

    /// Position after the last committed operation.
    pub fn cursor(&self) -> Result<Option<ApplyCursor>, LedgerError> {
        Ok(self.store.snapshot()?.apply_cursor()?)
    }

    /// Refuse a block this applier can never take: it has halted, the block
    /// lies below the last applied height, or the block's transactions are
    /// not in ascending index order. Nothing is written.
    pub fn check_block(&self, block: &ConfirmedBlock) -> Result<(), LedgerError> {
        if self.state == ApplierState::Halted {
            return Err(LedgerError::Halted);
        }
        if let Some(last) = self.last_height {
            if block.height < last {
                return Err(LedgerError::BlockOrder {
                    height: block.height,
                    last,
                });
            }
        }
        let mut previous: Option<u32> = None;
        for tx in &block.txs {
            if previous.is_some_and(|p| tx.tx_index <= p) {
                return Err(LedgerError::TxOrder {
                    height: block.height,
                    index: tx.tx_index,
                });
            }
            previous = Some(tx.tx_index);
        }
        Ok(())
    }

    /// Apply one confirmed block. `oracle` must reflect coin balances as of
    /// this block.
    ///
    /// Blocks wholly below the stored cursor are skipped, which makes
    /// replaying chain sync over an existing store idempotent.
    pub fn apply_block<O: BalanceOracle + ?Sized>(
        &mut self,
        block: &ConfirmedBlock,
        oracle: &O,
    ) -> Result<BlockReport, LedgerError> {
        self.check_block(block)?;
        self.last_height = Some(block.height);

        let cursor = self.cursor()?;
        if let Some(cursor) = cursor {
            if block.height < cursor.height {
                warn!(
                    height = block.height,
                    cursor_height = cursor.height,
                    "skipping block below apply cursor"
                );
                return Ok(BlockReport::skipped(block.height));
            }
        }

        let result = self.apply_txs(block, oracle, cursor);
        self.state = match &result {
            Err(LedgerError::InternalInconsistency(reason)) => {
                error!(height = block.height, %reason, "applier halted");
                ApplierState::Halted
            }
            _ => ApplierState::Idle,
        };
        result
    }

    fn apply_txs<O: BalanceOracle + ?Sized>(
        &mut self,
        block: &ConfirmedBlock,
        oracle: &O,
        cursor: Option<ApplyCursor>,
    ) -> Result<BlockReport, LedgerError> {
        let mut report = BlockReport::new(block.height);
        report.finalized = self.freeze_due_bills(block, oracle, cursor)?;

        for tx in &block.txs {
            if cursor.is_some_and(|c| c.covers(block.height, tx.tx_index)) {
                report.outcomes.push((tx.tx_index, TxOutcome::AlreadyApplied));
                continue;
            }
            self.state = ApplierState::Applying {
                height: block.height,
                tx_index: tx.tx_index,
            };
            let outcome = self.apply_tx(block, tx)?;
            report.outcomes.push((tx.tx_index, outcome));
        }

        info!(
            height = block.height,
            applied = report.applied(),
            rejected = report.rejected(),
            malformed = report.malformed(),
            finalized = report.finalized.len(),
            "block applied"
        );
        Ok(report)
    }

    /// Freeze every unfrozen bill whose window closed at or before the
    /// block's time, weighting each vote by the voter's balance now.
    fn freeze_due_bills<O: BalanceOracle + ?Sized>(
        &self,
        block: &ConfirmedBlock,
        oracle: &O,
        cursor: Option<ApplyCursor>,
    ) -> Result<Vec<(BillId, BillState)>, LedgerError> {
        let mut batch = self.store.begin_batch()?;
        let due = batch.bills_due(block.time)?;
        let enter_block = cursor.map_or(true, |c| block.height > c.height);
        if due.is_empty() && !enter_block {
            return Ok(Vec::new());
        }

        let mut finalized = Vec::with_capacity(due.len());
        for id in due {
            let bill = batch.bill(&id)?.ok_or_else(|| {
                LedgerError::InternalInconsistency(format!("bill {id} is due but has no record"))
            })?;
            let votes = batch.bill_votes(&id)?;
            let weights: Vec<(KeyId, u64)> = votes
                .iter()
                .map(|(voter, _)| (*voter, oracle.spendable_balance(voter)))
                .collect();
            let result = tally(
                bill.options.len(),
                votes
                    .iter()
                    .zip(&weights)
                    .map(|((_, vote), (_, weight))| (vote.option, *weight)),
            );
            let state = BillState {
                passed: result.passed,
                winning_option: result.winning_option,
                total_vote: result.total_vote,
                option_totals: result.option_totals,
                finalized_height: block.height,
                finalized_time: block.time,
            };
            batch.freeze_bill(&id, &state, &weights).consistent()?;
            info!(
                bill = %id,
                passed = state.passed,
                total_vote = state.total_vote,
                "bill finalized"
            );
            finalized.push((id, state));
        }

        if enter_block {
            batch.set_apply_cursor(ApplyCursor::new(block.height, 0))?;
        }
        batch.commit()?;
        Ok(finalized)
    }

    fn apply_tx(&self, block: &ConfirmedBlock, tx: &ConfirmedTx) -> Result<TxOutcome, LedgerError> {
        let mut batch = self.store.begin_batch()?;
        let outcome = match decode(&tx.payload) {
            Err(e) => {
                debug!(height = block.height, tx = tx.tx_index, error = %e, "malformed payload");
                TxOutcome::Malformed(e)
            }
            Ok(Operation::Unrecognized { opcode, .. }) => {
                debug!(height = block.height, tx = tx.tx_index, opcode, "unrecognized opcode");
                TxOutcome::Unrecognized { opcode }
            }
            Ok(op) => self.admit(&mut batch, block, tx, &op)?,
        };
        batch.set_apply_cursor(ApplyCursor::new(
            block.height,
            tx.tx_index.saturating_add(1),
        ))?;
        batch.commit()?;
        Ok(outcome)
    }

    fn admit(
        &self,
        batch: &mut S::Batch<'_>,
        block: &ConfirmedBlock,
        tx: &ConfirmedTx,
        op: &Operation,
    ) -> Result<TxOutcome, LedgerError> {
        let required = op.min_fee(&self.params.fees);
        let verdict = if tx.fee < required {
            Err(Rejection::FeeTooLow {
                paid: tx.fee,
                required,
            })
        } else {
            match validate(&*batch, &block.context(), &tx.sender, op) {
                Ok(effect) => Ok(effect),
                Err(GovernanceError::Rejected(r)) => Err(r),
                Err(GovernanceError::Store(e)) => return Err(e.into()),
            }
        };
        match verdict {
            Ok(effect) => {
                apply_effect(batch, &effect)?;
                Ok(TxOutcome::Applied {
                    kind: effect.kind(),
                })
            }
            Err(rejection) => {
                debug!(
                    height = block.height,
                    tx = tx.tx_index,
                    kind = op.kind(),
                    sender = %tx.sender,
                    reason = %rejection,
                    "operation rejected"
                );
                Ok(TxOutcome::Rejected(rejection))
            }
        }
    }
}

/// Perform the store writes for a validated effect.
pub fn apply_effect<B: LedgerBatch>(
    batch: &mut B,
    effect: &Effect,
) -> Result<(), LedgerError> {
    match effect {
        Effect::RegisterDelegate(record) => batch.insert_delegate(record).consistent(),
        Effect::VoteDelegates { voter, delegates } => {
            for delegate in delegates {
                batch.add_delegate_vote(voter, delegate).consistent()?;
            }
            Ok(())
        }
        Effect::RevokeDelegates { voter, delegates } => {
            for delegate in delegates {
                batch.remove_delegate_vote(voter, delegate).consistent()?;
            }
            Ok(())
        }
        Effect::RegisterCommittee(record) => batch.insert_committee(record).consistent(),
        Effect::VoteCommittee { voter, committee } => {
            batch.put_committee_vote(voter, committee).consistent()
        }
        Effect::RevokeCommittee { voter, committee } => {
            batch.remove_committee_vote(voter, committee).consistent()
        }
        Effect::SubmitBill(record) => batch.insert_bill(record).consistent(),
        Effect::VoteBill {
            bill,
            voter,
            option,
        } => batch.put_bill_vote(bill, voter, *option).consistent(),
        Effect::RegisterName { address, name } => batch.insert_name(address, name).consistent(),
        Effect::CreateToken(record) => {
            batch.insert_token(record).consistent()?;
            batch
                .set_token_balance(record.id, &record.owner, record.total_amount)
                .consistent()
        }
        Effect::TransferToken(transfer) => {
            debit(batch, transfer)?;
            let balance = batch.token_balance(transfer.token, &transfer.to)?;
            let credited = balance.checked_add(transfer.amount).ok_or_else(|| {
                overflow(transfer.token.get(), &transfer.to)
            })?;
            batch
                .set_token_balance(transfer.token, &transfer.to, credited)
                .consistent()
        }
        Effect::LockToken {
            debit: transfer,
            expiry_height,
        } => {
            debit(batch, transfer)?;
            batch
                .add_token_lock(&TokenLock {
                    token: transfer.token,
                    holder: transfer.to,
                    expiry_height: *expiry_height,
                    amount: transfer.amount,
                })
                .consistent()
        }
    }
}

/// Fold the sender's matured locks into its balance, then take the amount.
fn debit<B: LedgerBatch>(batch: &mut B, transfer: &TokenDebit) -> Result<(), LedgerError> {
    let mut available = batch.token_balance(transfer.token, &transfer.from)?;
    for lock in &transfer.matured {
        batch
            .remove_token_lock(lock.token, &lock.holder, lock.expiry_height)
            .consistent()?;
        available = available
            .checked_add(lock.amount)
            .ok_or_else(|| overflow(transfer.token.get(), &transfer.from))?;
    }
    let remaining = available.checked_sub(transfer.amount).ok_or_else(|| {
        LedgerError::InternalInconsistency(format!(
            "token {} balance of {} is {available}, below admitted debit {}",
            transfer.token, transfer.from, transfer.amount
        ))
    })?;
    batch
        .set_token_balance(transfer.token, &transfer.from, remaining)
        .consistent()
}

fn overflow(token: u64, holder: &KeyId) -> LedgerError {
    LedgerError::InternalInconsistency(format!("token {token} balance of {holder} overflows"))
}
