use std::collections::BTreeSet;

use agora_store::{BalanceOracle, LedgerView};
use agora_types::KeyId;

use crate::{CoinHolding, DistributionBucket, QueryEngine, QueryError};

impl<V, O> QueryEngine<'_, V, O>
where
    V: LedgerView + ?Sized,
    O: BalanceOracle + ?Sized,
{
    pub fn address_balance(&self, address: &KeyId) -> u64 {
        self.oracle.spendable_balance(address)
    }

    /// The `n` richest addresses, richest first, ties by address. Empty
    /// addresses never rank.
    pub fn coin_rank(&self, n: usize) -> Vec<CoinHolding> {
        let mut holdings: Vec<CoinHolding> = self
            .oracle
            .balances()
            .into_iter()
            .filter(|(_, balance)| *balance > 0)
            .map(|(address, balance)| CoinHolding { address, balance })
            .collect();
        holdings.sort_by(|a, b| b.balance.cmp(&a.balance).then(a.address.cmp(&b.address)));
        holdings.truncate(n);
        holdings
    }

    /// Count addresses and coins per balance segment. Each threshold opens a
    /// segment that runs up to the next larger threshold; balances below the
    /// smallest threshold are not counted.
    pub fn coin_distribution(
        &self,
        thresholds: &[u64],
    ) -> Result<Vec<DistributionBucket>, QueryError> {
        if thresholds.is_empty() {
            return Err(QueryError::NoThresholds);
        }
        if thresholds.contains(&0) {
            return Err(QueryError::ZeroThreshold);
        }
        let sorted: Vec<u64> = thresholds.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();
        let mut buckets: Vec<DistributionBucket> = sorted
            .iter()
            .map(|&threshold| DistributionBucket {
                threshold,
                addresses: 0,
                coins: 0,
            })
            .collect();

        for (_, balance) in self.oracle.balances() {
            // Index of the last threshold not above the balance.
            let upper = sorted.partition_point(|&t| t <= balance);
            if upper == 0 {
                continue;
            }
            let bucket = &mut buckets[upper - 1];
            bucket.addresses += 1;
            bucket.coins = bucket.coins.saturating_add(balance);
        }
        Ok(buckets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_nullables::{NullBalanceOracle, NullStore};
    use agora_store::LedgerStore;
    use agora_types::{ChainContext, Timestamp};
    use proptest::prelude::*;

    fn key(b: u8) -> KeyId {
        KeyId::new([b; 20])
    }

    fn at() -> ChainContext {
        ChainContext::new(1, Timestamp::new(0))
    }

    #[test]
    fn rank_orders_by_balance_then_address() {
        let store = NullStore::new();
        let snap = store.snapshot().unwrap();
        let oracle =
            NullBalanceOracle::with_balances([(key(3), 10), (key(1), 10), (key(2), 50), (key(4), 0)]);
        let q = QueryEngine::new(&snap, &oracle, at());

        let rank: Vec<(KeyId, u64)> = q
            .coin_rank(crate::DEFAULT_COIN_RANK)
            .into_iter()
            .map(|h| (h.address, h.balance))
            .collect();
        assert_eq!(rank, vec![(key(2), 50), (key(1), 10), (key(3), 10)]);
        assert_eq!(q.coin_rank(1).len(), 1);
        assert_eq!(q.address_balance(&key(2)), 50);
    }

    #[test]
    fn distribution_buckets_by_segment() {
        let store = NullStore::new();
        let snap = store.snapshot().unwrap();
        let oracle = NullBalanceOracle::with_balances([
            (key(1), 5),
            (key(2), 100),
            (key(3), 999),
            (key(4), 1_000),
            (key(5), 50_000),
        ]);
        let q = QueryEngine::new(&snap, &oracle, at());

        let buckets = q.coin_distribution(&[1_000, 100]).unwrap();
        assert_eq!(
            buckets,
            vec![
                DistributionBucket { threshold: 100, addresses: 2, coins: 1_099 },
                DistributionBucket { threshold: 1_000, addresses: 2, coins: 51_000 },
            ]
        );
    }

    #[test]
    fn distribution_rejects_bad_thresholds() {
        let store = NullStore::new();
        let snap = store.snapshot().unwrap();
        let oracle = NullBalanceOracle::new();
        let q = QueryEngine::new(&snap, &oracle, at());
        assert!(matches!(q.coin_distribution(&[]), Err(QueryError::NoThresholds)));
        assert!(matches!(q.coin_distribution(&[10, 0]), Err(QueryError::ZeroThreshold)));
    }

    proptest! {
        /// Every address at or above the smallest threshold lands in exactly
        /// one bucket.
        #[test]
        fn distribution_partitions_holders(
            balances in prop::collection::vec(0u64..1_000_000, 0..40),
            thresholds in prop::collection::vec(1u64..1_000_000, 1..6),
        ) {
            let store = NullStore::new();
            let snap = store.snapshot().unwrap();
            let oracle = NullBalanceOracle::with_balances(
                balances.iter().enumerate().map(|(i, b)| (key(i as u8), *b)),
            );
            let q = QueryEngine::new(&snap, &oracle, at());

            let min = *thresholds.iter().min().unwrap();
            let expected: Vec<u64> = balances.iter().copied().filter(|b| *b >= min).collect();
            let buckets = q.coin_distribution(&thresholds).unwrap();

            let counted: u64 = buckets.iter().map(|b| b.addresses).sum();
            let coins: u64 = buckets.iter().map(|b| b.coins).sum();
            prop_assert_eq!(counted, expected.len() as u64);
            prop_assert_eq!(coins, expected.iter().sum::<u64>());
        }
    }
}
