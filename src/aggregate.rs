//! Offer aggregation
//!
//! Merges cache slots across marketplaces for one direction into a single
//! candidate pool, applying the staleness policy: expired slots contribute
//! nothing, stale slots contribute but are flagged in the per-slot reports.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cache::{Freshness, SnapshotCache};
use crate::types::{Direction, Marketplace, Offer};

/// Per-slot contribution metadata for one pooled read.
#[derive(Debug, Clone, Serialize)]
pub struct SlotReport {
    pub source: Marketplace,
    /// Offers contributed to the pool (zero for expired slots)
    pub count: usize,
    /// Snapshot age in seconds, absent when never captured
    pub age_secs: Option<i64>,
    pub freshness: Freshness,
    pub error: Option<String>,
}

/// Candidate pool for one direction plus how each slot contributed.
#[derive(Debug, Clone)]
pub struct PooledOffers {
    pub offers: Vec<Offer>,
    pub slots: Vec<SlotReport>,
}

/// Pool all registered sources' slots for `direction` as of `now`.
pub async fn pool(cache: &SnapshotCache, direction: Direction, now: DateTime<Utc>) -> PooledOffers {
    let mut offers = Vec::new();
    let mut slots = Vec::new();

    for &source in cache.sources() {
        let Some(view) = cache.view(source, direction).await else {
            continue;
        };
        let freshness = cache.classify(view.captured_at, now);
        let age_secs = view
            .captured_at
            .map(|at| now.signed_duration_since(at).num_seconds());

        let count = if freshness == Freshness::Expired {
            0
        } else {
            offers.extend(view.offers.iter().cloned());
            view.offers.len()
        };

        slots.push(SlotReport {
            source,
            count,
            age_secs,
            freshness,
            error: view.last_error,
        });
    }

    PooledOffers { offers, slots }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Direction;
    use chrono::Duration as ChronoDuration;
    use std::time::Duration;

    fn offer(source: Marketplace, id: &str, direction: Direction) -> Offer {
        Offer {
            id: format!("{source}:{id}"),
            source,
            direction,
            price: 26000.0,
            available_amount: 1000.0,
            min_limit: 100.0,
            max_limit: 2000.0,
            counterparty: "TetherTrader".to_string(),
            completion_rate: 0.98,
            total_orders: 500,
            payment_methods: vec![],
            external_link: String::new(),
        }
    }

    fn cache() -> SnapshotCache {
        SnapshotCache::new(
            &[Marketplace::Binance, Marketplace::Bybit],
            Duration::from_secs(600),
            Duration::from_secs(1800),
        )
    }

    #[tokio::test]
    async fn pools_across_sources_for_one_direction() {
        let cache = cache();
        cache
            .put(Marketplace::Binance, Direction::Buy, vec![offer(Marketplace::Binance, "1", Direction::Buy)])
            .await;
        cache
            .put(Marketplace::Bybit, Direction::Buy, vec![offer(Marketplace::Bybit, "2", Direction::Buy)])
            .await;
        // Sell-side data must not leak into a buy pool.
        cache
            .put(Marketplace::Binance, Direction::Sell, vec![offer(Marketplace::Binance, "3", Direction::Sell)])
            .await;

        let pooled = pool(&cache, Direction::Buy, Utc::now()).await;
        assert_eq!(pooled.offers.len(), 2);
        assert_eq!(pooled.slots.len(), 2);
        assert!(pooled.slots.iter().all(|s| s.count == 1));
    }

    #[tokio::test]
    async fn expired_slot_contributes_zero_offers() {
        let cache = cache();
        let now = Utc::now();
        cache
            .put_at(
                Marketplace::Binance,
                Direction::Buy,
                vec![offer(Marketplace::Binance, "1", Direction::Buy)],
                now - ChronoDuration::seconds(3600),
            )
            .await;

        let pooled = pool(&cache, Direction::Buy, now).await;
        assert!(pooled.offers.is_empty(), "expired data must never be served");
        let report = pooled
            .slots
            .iter()
            .find(|s| s.source == Marketplace::Binance)
            .unwrap();
        assert_eq!(report.count, 0);
        assert_eq!(report.freshness, Freshness::Expired);
        assert_eq!(report.age_secs, Some(3600));
    }

    #[tokio::test]
    async fn stale_slot_still_contributes_but_is_flagged() {
        let cache = cache();
        let now = Utc::now();
        cache
            .put_at(
                Marketplace::Binance,
                Direction::Buy,
                vec![offer(Marketplace::Binance, "1", Direction::Buy)],
                now - ChronoDuration::seconds(1500),
            )
            .await;

        let pooled = pool(&cache, Direction::Buy, now).await;
        assert_eq!(pooled.offers.len(), 1);
        assert_eq!(pooled.slots[0].freshness, Freshness::Stale);
    }

    #[tokio::test]
    async fn empty_slots_are_reported_with_no_age() {
        let cache = cache();
        let pooled = pool(&cache, Direction::Buy, Utc::now()).await;
        assert!(pooled.offers.is_empty());
        assert_eq!(pooled.slots.len(), 2);
        assert!(pooled.slots.iter().all(|s| s.age_secs.is_none()));
        assert!(pooled
            .slots
            .iter()
            .all(|s| s.freshness == Freshness::Expired));
    }
}
