//! Network identifier.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::AgoraError;

/// Identifies which chain a node follows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkId {
    /// The production network.
    Live,
    /// The public test network.
    Test,
    /// Local development network.
    Dev,
}

impl NetworkId {
    /// Default RPC port for this network.
    pub fn default_rpc_port(&self) -> u16 {
        match self {
            Self::Live => 9332,
            Self::Test => 19332,
            Self::Dev => 29332,
        }
    }

    /// Human-readable name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::Test => "test",
            Self::Dev => "dev",
        }
    }
}

impl FromStr for NetworkId {
    type Err = AgoraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "live" => Ok(Self::Live),
            "test" => Ok(Self::Test),
            "dev" => Ok(Self::Dev),
            _ => Err(AgoraError::UnknownNetwork(s.to_string())),
        }
    }
}
