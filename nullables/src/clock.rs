//! Nullable chain clock: deterministic block heights and times for testing.

use std::sync::atomic::{AtomicU64, Ordering};

use agora_store::ChainClock;
use agora_types::{ChainContext, Timestamp};

/// A deterministic chain tip.
///
/// Heights and block times only advance when you tell them to.
pub struct NullClock {
    height: AtomicU64,
    time: AtomicU64,
    block_interval: u64,
}

impl NullClock {
    /// Start at height 0 and `genesis_secs`, advancing `block_interval`
    /// seconds per block.
    pub fn new(genesis_secs: u64, block_interval: u64) -> Self {
        Self {
            height: AtomicU64::new(0),
            time: AtomicU64::new(genesis_secs),
            block_interval,
        }
    }

    /// The current tip.
    pub fn now(&self) -> ChainContext {
        ChainContext {
            height: self.height.load(Ordering::SeqCst),
            time: Timestamp::new(self.time.load(Ordering::SeqCst)),
        }
    }

    /// Produce the next block and return its context.
    pub fn next_block(&self) -> ChainContext {
        self.height.fetch_add(1, Ordering::SeqCst);
        self.time.fetch_add(self.block_interval, Ordering::SeqCst);
        self.now()
    }

    /// Advance wall time without producing a block.
    pub fn advance(&self, secs: u64) {
        self.time.fetch_add(secs, Ordering::SeqCst);
    }
}

impl ChainClock for NullClock {
    fn tip(&self) -> ChainContext {
        self.now()
    }
}
