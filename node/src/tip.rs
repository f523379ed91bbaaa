//! The chain position submissions are validated against.

use std::sync::atomic::{AtomicU64, Ordering};

use agora_store::ChainClock;
use agora_types::{BlockHeight, ChainContext, Timestamp};

/// Height and time of the last block the node applied.
///
/// [`ChainClock::tip`] reports that height with the later of the block time
/// and the wall clock, so a node that is behind still judges bill windows by
/// the current time.
#[derive(Default)]
pub struct ChainTip {
    height: AtomicU64,
    time: AtomicU64,
}

impl ChainTip {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, height: BlockHeight, time: Timestamp) {
        self.height.store(height, Ordering::SeqCst);
        self.time.store(time.as_secs(), Ordering::SeqCst);
    }

    /// The last applied block, without the wall clock.
    pub fn last_block(&self) -> ChainContext {
        ChainContext::new(
            self.height.load(Ordering::SeqCst),
            Timestamp::new(self.time.load(Ordering::SeqCst)),
        )
    }
}

impl ChainClock for ChainTip {
    fn tip(&self) -> ChainContext {
        let last = self.last_block();
        ChainContext::new(last.height, last.time.max(Timestamp::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tip_follows_applied_blocks() {
        let tip = ChainTip::new();
        tip.advance(7, Timestamp::new(700));
        assert_eq!(tip.last_block(), ChainContext::new(7, Timestamp::new(700)));
        assert_eq!(tip.tip().height, 7);
        assert!(tip.tip().time >= Timestamp::new(700));
    }

    #[test]
    fn future_block_time_wins_over_wall_clock() {
        let tip = ChainTip::new();
        tip.advance(1, Timestamp::new(u64::MAX / 2));
        assert_eq!(tip.tip().time, Timestamp::new(u64::MAX / 2));
    }
}
