//! Refresh scheduler
//!
//! Drives periodic and on-demand population of the snapshot cache. A cycle
//! spawns one task per (adapter, direction) pair; each pair's outcome lands
//! in its own slot, so one slow or failing marketplace never delays or fails
//! another. Overlapping cycles are safe: slot writes are idempotent
//! replacements, redundant fetches are accepted rather than deduplicated.

use futures_util::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};

use crate::cache::SnapshotCache;
use crate::marketplace::OfferSource;
use crate::types::Direction;

pub struct RefreshScheduler {
    cache: Arc<SnapshotCache>,
    sources: Vec<Arc<dyn OfferSource>>,
    refresh_interval: Duration,
}

impl RefreshScheduler {
    pub fn new(
        cache: Arc<SnapshotCache>,
        sources: Vec<Arc<dyn OfferSource>>,
        refresh_interval: Duration,
    ) -> Self {
        Self {
            cache,
            sources,
            refresh_interval,
        }
    }

    /// Run one full refresh cycle to completion: every (adapter, direction)
    /// pair fetched concurrently, every outcome written to its own slot.
    pub async fn run_cycle(&self) {
        tracing::info!("🔄 Refreshing offer snapshots...");

        let mut tasks = Vec::with_capacity(self.sources.len() * Direction::ALL.len());
        for source in &self.sources {
            for direction in Direction::ALL {
                let cache = Arc::clone(&self.cache);
                let source = Arc::clone(source);
                tasks.push(tokio::spawn(async move {
                    refresh_slot(&cache, source.as_ref(), direction).await;
                }));
            }
        }
        join_all(tasks).await;
    }

    /// Start an extra cycle without waiting for the timer. Fire-and-forget;
    /// safe to call while a timer-driven cycle is in flight.
    pub fn trigger(self: &Arc<Self>) {
        let scheduler = Arc::clone(self);
        tokio::spawn(async move {
            tracing::info!("🔄 On-demand refresh triggered");
            scheduler.run_cycle().await;
        });
    }

    /// Timer loop. Assumes the caller already ran the initial cycle.
    pub async fn run(self: Arc<Self>) {
        let mut ticker = interval(self.refresh_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately; the startup cycle covered it.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            self.run_cycle().await;
        }
    }
}

async fn refresh_slot(cache: &SnapshotCache, source: &dyn OfferSource, direction: Direction) {
    let marketplace = source.marketplace();
    match source.fetch(direction).await {
        Ok(offers) => {
            tracing::info!(
                source = %marketplace,
                direction = %direction,
                count = offers.len(),
                "✅ Snapshot updated"
            );
            cache.put(marketplace, direction, offers).await;
        }
        Err(error) => {
            tracing::warn!(
                source = %marketplace,
                direction = %direction,
                error = %error,
                "❌ Snapshot refresh failed"
            );
            // "{:#}" keeps the context chain in the slot's error detail
            cache
                .put_error(marketplace, direction, format!("{error:#}"))
                .await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marketplace::MockOfferSource;
    use crate::types::{Marketplace, Offer};
    use anyhow::anyhow;

    fn offer(source: Marketplace, direction: Direction) -> Offer {
        Offer {
            id: format!("{source}:1"),
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

    fn source_ok(marketplace: Marketplace) -> MockOfferSource {
        let mut mock = MockOfferSource::new();
        mock.expect_marketplace().return_const(marketplace);
        mock.expect_fetch()
            .returning(move |direction| Ok(vec![offer(marketplace, direction)]));
        mock
    }

    #[tokio::test]
    async fn cycle_populates_every_slot() {
        let cache = Arc::new(SnapshotCache::new(
            &[Marketplace::Binance, Marketplace::Bybit],
            Duration::from_secs(600),
            Duration::from_secs(1800),
        ));
        let sources: Vec<Arc<dyn OfferSource>> = vec![
            Arc::new(source_ok(Marketplace::Binance)),
            Arc::new(source_ok(Marketplace::Bybit)),
        ];
        let scheduler =
            RefreshScheduler::new(Arc::clone(&cache), sources, Duration::from_secs(600));

        scheduler.run_cycle().await;

        for source in [Marketplace::Binance, Marketplace::Bybit] {
            for direction in Direction::ALL {
                let view = cache.view(source, direction).await.unwrap();
                assert_eq!(view.offers.len(), 1);
                assert!(view.captured_at.is_some());
                assert!(view.last_error.is_none());
            }
        }
    }

    #[tokio::test]
    async fn one_failing_pair_does_not_touch_other_slots() {
        let cache = Arc::new(SnapshotCache::new(
            &[Marketplace::Binance, Marketplace::Bybit],
            Duration::from_secs(600),
            Duration::from_secs(1800),
        ));

        let mut flaky = MockOfferSource::new();
        flaky
            .expect_marketplace()
            .return_const(Marketplace::Binance);
        flaky.expect_fetch().returning(|direction| match direction {
            Direction::Buy => Err(anyhow!("HTTP 429 Too Many Requests")),
            Direction::Sell => Ok(vec![offer(Marketplace::Binance, Direction::Sell)]),
        });

        let sources: Vec<Arc<dyn OfferSource>> =
            vec![Arc::new(flaky), Arc::new(source_ok(Marketplace::Bybit))];
        let scheduler =
            RefreshScheduler::new(Arc::clone(&cache), sources, Duration::from_secs(600));

        scheduler.run_cycle().await;

        let failed = cache.view(Marketplace::Binance, Direction::Buy).await.unwrap();
        assert!(failed.offers.is_empty());
        assert!(failed.captured_at.is_none());
        assert_eq!(
            failed.last_error.as_deref(),
            Some("HTTP 429 Too Many Requests")
        );

        let sibling = cache.view(Marketplace::Binance, Direction::Sell).await.unwrap();
        assert_eq!(sibling.offers.len(), 1);
        assert!(sibling.last_error.is_none());

        let other = cache.view(Marketplace::Bybit, Direction::Buy).await.unwrap();
        assert_eq!(other.offers.len(), 1);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_last_known_good_offers() {
        let cache = Arc::new(SnapshotCache::new(
            &[Marketplace::Binance],
            Duration::from_secs(600),
            Duration::from_secs(1800),
        ));
        cache
            .put(Marketplace::Binance, Direction::Buy, vec![offer(Marketplace::Binance, Direction::Buy)])
            .await;

        let mut failing = MockOfferSource::new();
        failing
            .expect_marketplace()
            .return_const(Marketplace::Binance);
        failing
            .expect_fetch()
            .returning(|_| Err(anyhow!("connection reset")));

        let sources: Vec<Arc<dyn OfferSource>> = vec![Arc::new(failing)];
        let scheduler =
            RefreshScheduler::new(Arc::clone(&cache), sources, Duration::from_secs(600));
        scheduler.run_cycle().await;

        let view = cache.view(Marketplace::Binance, Direction::Buy).await.unwrap();
        assert_eq!(view.offers.len(), 1, "stale-but-good data survives the failure");
        assert_eq!(view.last_error.as_deref(), Some("connection reset"));
    }
}
