//! Node configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use agora_types::{NetworkId, ProtocolParams};
use agora_utils::LogFormat;

use crate::NodeError;

/// Configuration for an Agora node.
///
/// Can be loaded from a TOML file via [`NodeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Which network to follow.
    #[serde(default = "default_network")]
    pub network: NetworkId,

    /// Data directory for the ledger database.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// LMDB map size in bytes.
    #[serde(default = "default_map_size")]
    pub lmdb_map_size: usize,

    /// Consensus parameters, selected by `network` and never read from TOML.
    #[serde(skip)]
    pub params: ProtocolParams,

    /// Whether to enable the RPC server.
    #[serde(default = "default_true")]
    pub enable_rpc: bool,

    /// RPC port; 0 means the network's default port.
    #[serde(default)]
    pub rpc_port: u16,

    /// How long a submission may wait on the transaction builder.
    #[serde(default = "default_submission_timeout")]
    pub submission_timeout_secs: u64,

    /// Confirmed blocks buffered between chain sync and the applier.
    #[serde(default = "default_block_queue")]
    pub block_queue_capacity: usize,

    /// Log format: "human" or "json".
    #[serde(default)]
    pub log_format: LogFormat,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Whether to serve Prometheus metrics next to the RPC endpoint.
    #[serde(default)]
    pub enable_metrics: bool,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_network() -> NetworkId {
    NetworkId::Dev
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./agora_data")
}

fn default_map_size() -> usize {
    1 << 30
}

fn default_true() -> bool {
    true
}

fn default_submission_timeout() -> u64 {
    30
}

fn default_block_queue() -> usize {
    64
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl NodeConfig {
    /// A default configuration for `network`.
    pub fn for_network(network: NetworkId) -> Self {
        Self {
            network,
            params: ProtocolParams::for_network(network),
            ..Self::default()
        }
    }

    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &Path) -> Result<Self, NodeError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| NodeError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        let mut config: Self = toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))?;
        config.params = ProtocolParams::for_network(config.network);
        Ok(config)
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, NodeError> {
        toml::to_string_pretty(self).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Switch networks, re-selecting the consensus parameters.
    pub fn set_network(&mut self, network: NetworkId) {
        self.network = network;
        self.params = ProtocolParams::for_network(network);
    }

    /// The configured RPC port, or the network default.
    pub fn effective_rpc_port(&self) -> u16 {
        if self.rpc_port == 0 {
            self.network.default_rpc_port()
        } else {
            self.rpc_port
        }
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            network: default_network(),
            data_dir: default_data_dir(),
            lmdb_map_size: default_map_size(),
            params: ProtocolParams::for_network(default_network()),
            enable_rpc: default_true(),
            rpc_port: 0,
            submission_timeout_secs: default_submission_timeout(),
            block_queue_capacity: default_block_queue(),
            log_format: LogFormat::default(),
            log_level: default_log_level(),
            enable_metrics: false,
        }
    }
}
