//! The chain position a validation or query is pinned to.

use serde::{Deserialize, Serialize};

use crate::{BlockHeight, Timestamp};

/// Block height and block time that validation and queries evaluate against.
///
/// The applier uses the confirmed block's own height and time. Submission
/// uses the next height and the wall clock. Queries use whatever the caller
/// pins, so two queries with the same context see the same answer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainContext {
    pub height: BlockHeight,
    pub time: Timestamp,
}

impl ChainContext {
    pub fn new(height: BlockHeight, time: Timestamp) -> Self {
        Self { height, time }
    }
}
