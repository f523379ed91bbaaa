//! Ledger limits that depend on state or chain position.
//!
//! Payload-only limits (name lengths, option counts, the delegate vote cap
//! per operation) live with the codec in `agora_operations::validation`.

use agora_types::Timestamp;

pub use agora_operations::validation::{MAX_BILL_DAYS, MAX_DELEGATE_VOTES};

pub const SECS_PER_DAY: u64 = 86_400;

/// Largest token supply in whole (unscaled) units.
pub const MAX_TOKEN_SUPPLY: u64 = 100_000_000_000;

/// End of a bill's voting window opened at `start`.
pub fn bill_end_time(start: Timestamp, duration_days: u16) -> Timestamp {
    start.saturating_add_secs(u64::from(duration_days) * SECS_PER_DAY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_day_window() {
        assert_eq!(
            bill_end_time(Timestamp::new(1_000), 1),
            Timestamp::new(1_000 + SECS_PER_DAY)
        );
    }

    #[test]
    fn end_time_saturates() {
        assert_eq!(
            bill_end_time(Timestamp::new(u64::MAX - 5), MAX_BILL_DAYS),
            Timestamp::new(u64::MAX)
        );
    }
}
