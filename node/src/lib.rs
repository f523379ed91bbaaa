//! Agora node: the pieces around the ledger core.
//!
//! - [`SyncDriver`] feeds confirmed blocks from chain sync to the single
//!   [`agora_ledger::Applier`], keeping the [`BalanceSheet`] and
//!   [`ChainTip`] in step.
//! - [`SubmissionPipeline`] turns wallet commands into validated, encoded
//!   payloads for the transaction builder.
//! - [`AgoraNode`] wires both over one store, with configuration, metrics,
//!   ledger events and graceful shutdown.

pub mod balances;
pub mod config;
pub mod error;
pub mod events;
pub mod metrics;
pub mod node;
pub mod pipeline;
pub mod relay;
pub mod shutdown;
pub mod sync;
pub mod tip;

pub use balances::{BalanceSheet, PinnedBalances};
pub use config::NodeConfig;
pub use error::NodeError;
pub use events::{EventBus, LedgerEvent};
pub use metrics::NodeMetrics;
pub use node::AgoraNode;
pub use pipeline::{SubmissionPipeline, DEFAULT_SUBMISSION_TIMEOUT};
pub use relay::{ChannelTxBuilder, OutboundTx};
pub use shutdown::{ShutdownController, ShutdownSignal};
pub use sync::{ChainUpdate, SyncDriver};
pub use tip::ChainTip;
