//! Events emitted while applying confirmed blocks.

use agora_governance::Rejection;
use agora_ledger::{BlockReport, TxOutcome};
use agora_store::BillState;
use agora_types::{BillId, BlockHeight};

/// Ledger-level events that observers can subscribe to via the [`EventBus`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LedgerEvent {
    /// A block went through the applier.
    BlockApplied {
        height: BlockHeight,
        applied: usize,
        rejected: usize,
    },
    OperationApplied {
        height: BlockHeight,
        tx_index: u32,
        kind: &'static str,
    },
    /// A confirmed operation was dropped by the rules.
    OperationRejected {
        height: BlockHeight,
        tx_index: u32,
        reason: Rejection,
    },
    /// A bill's voting window closed and its outcome was frozen.
    BillFinalized { bill: BillId, state: BillState },
    /// The applier stopped on an internal inconsistency.
    ApplierHalted { height: BlockHeight, reason: String },
}

impl LedgerEvent {
    /// The events describing one applied block, in emission order.
    pub fn from_report(report: &BlockReport) -> Vec<LedgerEvent> {
        let mut events = Vec::with_capacity(report.outcomes.len() + report.finalized.len() + 1);
        for (bill, state) in &report.finalized {
            events.push(LedgerEvent::BillFinalized {
                bill: *bill,
                state: state.clone(),
            });
        }
        for (tx_index, outcome) in &report.outcomes {
            match outcome {
                TxOutcome::Applied { kind } => events.push(LedgerEvent::OperationApplied {
                    height: report.height,
                    tx_index: *tx_index,
                    kind,
                }),
                TxOutcome::Rejected(reason) => events.push(LedgerEvent::OperationRejected {
                    height: report.height,
                    tx_index: *tx_index,
                    reason: reason.clone(),
                }),
                _ => {}
            }
        }
        events.push(LedgerEvent::BlockApplied {
            height: report.height,
            applied: report.applied(),
            rejected: report.rejected(),
        });
        events
    }
}

/// Synchronous fan-out event bus for ledger events.
///
/// Listeners are invoked inline on the applying task; keep handlers fast to
/// avoid stalling chain sync.
pub struct EventBus {
    listeners: Vec<Box<dyn Fn(&LedgerEvent) + Send + Sync>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, listener: Box<dyn Fn(&LedgerEvent) + Send + Sync>) {
        self.listeners.push(listener);
    }

    pub fn emit(&self, event: &LedgerEvent) {
        for listener in &self.listeners {
            listener(event);
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_types::Timestamp;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    #[test]
    fn emit_calls_all_listeners() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut bus = EventBus::new();

        let c1 = Arc::clone(&counter);
        bus.subscribe(Box::new(move |_| {
            c1.fetch_add(1, Ordering::SeqCst);
        }));

        let c2 = Arc::clone(&counter);
        bus.subscribe(Box::new(move |_| {
            c2.fetch_add(10, Ordering::SeqCst);
        }));

        bus.emit(&LedgerEvent::BlockApplied {
            height: 1,
            applied: 0,
            rejected: 0,
        });

        assert_eq!(counter.load(Ordering::SeqCst), 11);
    }

    #[test]
    fn emit_with_no_listeners_is_noop() {
        let bus = EventBus::new();
        bus.emit(&LedgerEvent::ApplierHalted {
            height: 1,
            reason: "test".into(),
        });
    }

    #[test]
    fn report_expands_in_order() {
        let bill = BillId::new([7; 20]);
        let state = BillState {
            passed: true,
            winning_option: Some(0),
            total_vote: 10,
            option_totals: vec![10, 0],
            finalized_height: 4,
            finalized_time: Timestamp::new(100),
        };
        let report = BlockReport {
            height: 4,
            outcomes: vec![
                (0, TxOutcome::Applied { kind: "vote_bill" }),
                (1, TxOutcome::Unrecognized { opcode: 0x02 }),
                (2, TxOutcome::Rejected(Rejection::UnknownBill(bill))),
            ],
            finalized: vec![(bill, state.clone())],
            skipped: false,
        };

        let events = LedgerEvent::from_report(&report);
        assert_eq!(
            events,
            vec![
                LedgerEvent::BillFinalized { bill, state },
                LedgerEvent::OperationApplied { height: 4, tx_index: 0, kind: "vote_bill" },
                LedgerEvent::OperationRejected {
                    height: 4,
                    tx_index: 2,
                    reason: Rejection::UnknownBill(bill),
                },
                LedgerEvent::BlockApplied { height: 4, applied: 1, rejected: 1 },
            ]
        );
    }
}
