//! Protocol parameters: the per-network fee schedule for operation-carrying
//! transactions.
//!
//! These are consensus values. Every node on a network must use the same
//! schedule, so they are selected by [`NetworkId`] and never read from a
//! config file.

use serde::{Deserialize, Serialize};

use crate::{NetworkId, COIN};

/// Minimum fee (raw coin units) a transaction must attach for each
/// operation kind to have any ledger effect.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSchedule {
    pub register_delegate: u64,
    pub vote_delegate: u64,
    pub revoke_delegate: u64,
    pub register_committee: u64,
    pub register_name: u64,
    /// Charged for both committee votes and committee vote revocations.
    pub vote_committee: u64,
    pub submit_bill: u64,
    pub vote_bill: u64,
    pub create_token: u64,
    pub send_token: u64,
    pub lock_token: u64,
}

impl FeeSchedule {
    /// The same fee for every operation.
    pub fn flat(fee: u64) -> Self {
        Self {
            register_delegate: fee,
            vote_delegate: fee,
            revoke_delegate: fee,
            register_committee: fee,
            register_name: fee,
            vote_committee: fee,
            submit_bill: fee,
            vote_bill: fee,
            create_token: fee,
            send_token: fee,
            lock_token: fee,
        }
    }
}

/// All consensus parameters stored by every node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolParams {
    pub network: NetworkId,
    pub fees: FeeSchedule,
}

impl ProtocolParams {
    /// The live network: registrations and token creation are priced to
    /// deter squatting, votes and transfers cost the base relay fee.
    pub fn live_defaults() -> Self {
        let base = COIN / 100;
        Self {
            network: NetworkId::Live,
            fees: FeeSchedule {
                register_delegate: 10 * COIN,
                vote_delegate: base,
                revoke_delegate: base,
                register_committee: 10 * COIN,
                register_name: COIN,
                vote_committee: base,
                submit_bill: COIN,
                vote_bill: base,
                create_token: 10 * COIN,
                send_token: base,
                lock_token: base,
            },
        }
    }

    /// The test network uses the base relay fee for everything.
    pub fn testnet_defaults() -> Self {
        Self {
            network: NetworkId::Test,
            fees: FeeSchedule::flat(COIN / 100),
        }
    }

    /// Development networks charge nothing.
    pub fn dev_defaults() -> Self {
        Self {
            network: NetworkId::Dev,
            fees: FeeSchedule::flat(0),
        }
    }

    pub fn for_network(network: NetworkId) -> Self {
        match network {
            NetworkId::Live => Self::live_defaults(),
            NetworkId::Test => Self::testnet_defaults(),
            NetworkId::Dev => Self::dev_defaults(),
        }
    }
}

/// Default is the development configuration.
impl Default for ProtocolParams {
    fn default() -> Self {
        Self::dev_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dev_network_is_free() {
        assert_eq!(ProtocolParams::dev_defaults().fees, FeeSchedule::flat(0));
    }

    #[test]
    fn for_network_matches_defaults() {
        for net in [NetworkId::Live, NetworkId::Test, NetworkId::Dev] {
            assert_eq!(ProtocolParams::for_network(net).network, net);
        }
    }
}
