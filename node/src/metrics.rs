//! Prometheus metrics for the Agora node.
//!
//! Covers block application, per-operation outcomes, bill finalization and
//! the submission pipeline. The [`NodeMetrics`] struct owns a dedicated
//! [`Registry`] that the RPC `/metrics` endpoint encodes into the Prometheus
//! text exposition format.

use prometheus::{
    register_histogram_with_registry, register_int_counter_with_registry,
    register_int_gauge_with_registry, Encoder, Histogram, HistogramOpts, IntCounter, IntGauge,
    Opts, Registry, TextEncoder,
};

use agora_ledger::BlockReport;

/// Central collection of all node-level Prometheus metrics.
pub struct NodeMetrics {
    /// The Prometheus registry that owns every metric below.
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    /// Blocks handed to the applier, including skipped ones.
    pub blocks_applied: IntCounter,
    pub ops_applied: IntCounter,
    /// Operations refused by the rules at apply time.
    pub ops_rejected: IntCounter,
    pub ops_malformed: IntCounter,
    pub ops_unrecognized: IntCounter,
    pub bills_finalized: IntCounter,
    /// Submissions handed to the transaction builder successfully.
    pub submissions_accepted: IntCounter,
    /// Submissions refused before or by the transaction builder.
    pub submissions_rejected: IntCounter,

    // ── Gauges ──────────────────────────────────────────────────────────
    /// Height of the last applied block.
    pub applied_height: IntGauge,

    // ── Histograms ──────────────────────────────────────────────────────
    /// Time spent applying one block, in milliseconds.
    pub block_apply_time_ms: Histogram,
}

impl NodeMetrics {
    /// Create a fresh set of metrics, all registered under a new
    /// [`Registry`].
    pub fn new() -> Self {
        let registry = Registry::new();

        let blocks_applied = register_int_counter_with_registry!(
            Opts::new("agora_blocks_applied_total", "Confirmed blocks handed to the applier"),
            registry
        )
        .expect("failed to register blocks_applied counter");

        let ops_applied = register_int_counter_with_registry!(
            Opts::new("agora_ops_applied_total", "Operations applied to the ledger"),
            registry
        )
        .expect("failed to register ops_applied counter");

        let ops_rejected = register_int_counter_with_registry!(
            Opts::new(
                "agora_ops_rejected_total",
                "Confirmed operations rejected by validation"
            ),
            registry
        )
        .expect("failed to register ops_rejected counter");

        let ops_malformed = register_int_counter_with_registry!(
            Opts::new("agora_ops_malformed_total", "Payloads that failed to decode"),
            registry
        )
        .expect("failed to register ops_malformed counter");

        let ops_unrecognized = register_int_counter_with_registry!(
            Opts::new(
                "agora_ops_unrecognized_total",
                "Payloads carrying an unknown opcode"
            ),
            registry
        )
        .expect("failed to register ops_unrecognized counter");

        let bills_finalized = register_int_counter_with_registry!(
            Opts::new("agora_bills_finalized_total", "Bills whose outcome was frozen"),
            registry
        )
        .expect("failed to register bills_finalized counter");

        let submissions_accepted = register_int_counter_with_registry!(
            Opts::new(
                "agora_submissions_accepted_total",
                "Operations handed to the transaction builder"
            ),
            registry
        )
        .expect("failed to register submissions_accepted counter");

        let submissions_rejected = register_int_counter_with_registry!(
            Opts::new(
                "agora_submissions_rejected_total",
                "Submissions refused before broadcast"
            ),
            registry
        )
        .expect("failed to register submissions_rejected counter");

        let applied_height = register_int_gauge_with_registry!(
            Opts::new("agora_applied_height", "Height of the last applied block"),
            registry
        )
        .expect("failed to register applied_height gauge");

        // Exponential buckets covering 0.1 ms → ~1.6 s.
        let block_apply_time_ms = register_histogram_with_registry!(
            HistogramOpts::new(
                "agora_block_apply_time_ms",
                "Block application time in milliseconds"
            )
            .buckets(
                prometheus::exponential_buckets(0.1, 2.0, 15)
                    .expect("exponential bucket parameters are valid")
            ),
            registry
        )
        .expect("failed to register block_apply_time_ms histogram");

        Self {
            registry,
            blocks_applied,
            ops_applied,
            ops_rejected,
            ops_malformed,
            ops_unrecognized,
            bills_finalized,
            submissions_accepted,
            submissions_rejected,
            applied_height,
            block_apply_time_ms,
        }
    }

    /// Fold one block's outcome into the counters.
    pub fn record_block(&self, report: &BlockReport, elapsed_ms: f64) {
        self.blocks_applied.inc();
        self.ops_applied.inc_by(report.applied() as u64);
        self.ops_rejected.inc_by(report.rejected() as u64);
        self.ops_malformed.inc_by(report.malformed() as u64);
        self.ops_unrecognized.inc_by(report.unrecognized() as u64);
        self.bills_finalized.inc_by(report.finalized.len() as u64);
        if !report.skipped {
            self.applied_height
                .set(i64::try_from(report.height).unwrap_or(i64::MAX));
        }
        self.block_apply_time_ms.observe(elapsed_ms);
    }

    /// The registry in Prometheus text format.
    pub fn encode(&self) -> String {
        let mut buffer = Vec::new();
        if let Err(e) = TextEncoder::new().encode(&self.registry.gather(), &mut buffer) {
            tracing::warn!(error = %e, "failed to encode metrics");
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

impl Default for NodeMetrics {
    fn default() -> Self {
        Self::new()
    }
}
