//! Bill vote tallies.
//!
//! The applier tallies once, with balances captured at the freezing block;
//! the query engine tallies live bills the same way at its pinned height.

/// Per-option totals and the derived outcome of a bill.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BillTally {
    pub option_totals: Vec<u64>,
    pub total_vote: u64,
    /// Highest total, lowest index on ties; `None` when no weight was cast.
    pub winning_option: Option<u8>,
    /// Whether any weight was cast at all.
    pub passed: bool,
}

/// Sum `(option, weight)` pairs over a bill with `option_count` options.
///
/// Votes for options out of range are ignored; sums saturate.
pub fn tally<I>(option_count: usize, votes: I) -> BillTally
where
    I: IntoIterator<Item = (u8, u64)>,
{
    let mut option_totals = vec![0u64; option_count];
    for (option, weight) in votes {
        if let Some(total) = option_totals.get_mut(usize::from(option)) {
            *total = total.saturating_add(weight);
        }
    }
    let total_vote = option_totals
        .iter()
        .fold(0u64, |acc, t| acc.saturating_add(*t));

    let mut winning_option = None;
    let mut best = 0u64;
    for (index, total) in option_totals.iter().enumerate() {
        if *total > best {
            best = *total;
            winning_option = u8::try_from(index).ok();
        }
    }

    BillTally {
        option_totals,
        total_vote,
        winning_option,
        passed: total_vote > 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_bill_does_not_pass() {
        let t = tally(2, []);
        assert_eq!(t.option_totals, vec![0, 0]);
        assert_eq!(t.winning_option, None);
        assert!(!t.passed);
    }

    #[test]
    fn ties_go_to_lowest_index() {
        let t = tally(3, [(2, 5), (1, 5), (0, 1)]);
        assert_eq!(t.winning_option, Some(1));
        assert_eq!(t.total_vote, 11);
        assert!(t.passed);
    }

    #[test]
    fn zero_weight_votes_count_nothing() {
        let t = tally(2, [(1, 0), (0, 0)]);
        assert_eq!(t.winning_option, None);
        assert!(!t.passed);
    }

    #[test]
    fn sums_saturate_and_ignore_bad_options() {
        let t = tally(2, [(0, u64::MAX), (0, 1), (1, 3), (9, 100)]);
        assert_eq!(t.option_totals, vec![u64::MAX, 3]);
        assert_eq!(t.total_vote, u64::MAX);
        assert_eq!(t.winning_option, Some(0));
    }
}
