//! Snapshot cache
//!
//! Process-wide table of the latest offer list per (marketplace, direction)
//! slot. Slots are created for every registered source at startup and live
//! for the whole process; each holds its own lock so refreshes of unrelated
//! slots never serialize on each other. Only the refresh scheduler writes;
//! readers receive cloned views.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::types::{Direction, Marketplace, Offer};

/// Age-based classification of a slot's data.
///
/// Derived from `captured_at` at read time, never actively scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Freshness {
    /// Age within the refresh interval
    Fresh,
    /// Past the refresh interval but still tolerable; usable, flagged
    Stale,
    /// Past the maximum tolerated age, or never captured; must not be served
    Expired,
}

#[derive(Debug, Default)]
struct Slot {
    offers: Vec<Offer>,
    captured_at: Option<DateTime<Utc>>,
    last_error: Option<String>,
}

/// Read-only copy of one slot's state.
#[derive(Debug, Clone)]
pub struct SlotView {
    pub source: Marketplace,
    pub direction: Direction,
    pub offers: Vec<Offer>,
    pub captured_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

/// In-memory snapshot store keyed by (marketplace, direction).
pub struct SnapshotCache {
    slots: HashMap<(Marketplace, Direction), RwLock<Slot>>,
    /// Registered sources in configuration order
    sources: Vec<Marketplace>,
    refresh_interval: Duration,
    max_age: Duration,
}

impl SnapshotCache {
    /// Create empty slots for every (source, direction) pair.
    pub fn new(sources: &[Marketplace], refresh_interval: Duration, max_age: Duration) -> Self {
        let mut slots = HashMap::new();
        for &source in sources {
            for direction in Direction::ALL {
                slots.insert((source, direction), RwLock::new(Slot::default()));
            }
        }
        Self {
            slots,
            sources: sources.to_vec(),
            refresh_interval,
            max_age,
        }
    }

    pub fn sources(&self) -> &[Marketplace] {
        &self.sources
    }

    /// Replace a slot's offers wholesale and clear its error.
    pub async fn put(&self, source: Marketplace, direction: Direction, offers: Vec<Offer>) {
        self.put_at(source, direction, offers, Utc::now()).await;
    }

    /// `put` with an explicit capture timestamp.
    pub async fn put_at(
        &self,
        source: Marketplace,
        direction: Direction,
        offers: Vec<Offer>,
        captured_at: DateTime<Utc>,
    ) {
        let Some(slot) = self.slots.get(&(source, direction)) else {
            tracing::warn!(source = %source, direction = %direction, "put for unregistered slot");
            return;
        };
        let mut slot = slot.write().await;
        slot.offers = offers;
        slot.captured_at = Some(captured_at);
        slot.last_error = None;
    }

    /// Record a fetch failure. Last-known-good offers and their capture time
    /// are preserved.
    pub async fn put_error(&self, source: Marketplace, direction: Direction, error: String) {
        let Some(slot) = self.slots.get(&(source, direction)) else {
            tracing::warn!(source = %source, direction = %direction, "error for unregistered slot");
            return;
        };
        let mut slot = slot.write().await;
        slot.last_error = Some(error);
    }

    /// Snapshot one slot's state.
    pub async fn view(&self, source: Marketplace, direction: Direction) -> Option<SlotView> {
        let slot = self.slots.get(&(source, direction))?;
        let slot = slot.read().await;
        Some(SlotView {
            source,
            direction,
            offers: slot.offers.clone(),
            captured_at: slot.captured_at,
            last_error: slot.last_error.clone(),
        })
    }

    /// Snapshot every registered slot, configuration order, Buy before Sell.
    pub async fn view_all(&self) -> Vec<SlotView> {
        let mut views = Vec::with_capacity(self.slots.len());
        for &source in &self.sources {
            for direction in Direction::ALL {
                if let Some(view) = self.view(source, direction).await {
                    views.push(view);
                }
            }
        }
        views
    }

    /// Classify a capture time against this cache's age thresholds.
    pub fn classify(&self, captured_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Freshness {
        let Some(captured_at) = captured_at else {
            return Freshness::Expired;
        };
        let age = now.signed_duration_since(captured_at);
        if age.num_milliseconds() <= self.refresh_interval.as_millis() as i64 {
            Freshness::Fresh
        } else if age.num_milliseconds() <= self.max_age.as_millis() as i64 {
            Freshness::Stale
        } else {
            Freshness::Expired
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    fn offer(id: &str, direction: Direction) -> Offer {
        Offer {
            id: format!("Binance:{id}"),
            source: Marketplace::Binance,
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
    async fn put_replaces_offers_and_clears_error() {
        let cache = cache();
        cache
            .put_error(Marketplace::Binance, Direction::Buy, "timeout".to_string())
            .await;
        cache
            .put(Marketplace::Binance, Direction::Buy, vec![offer("1", Direction::Buy)])
            .await;

        let view = cache.view(Marketplace::Binance, Direction::Buy).await.unwrap();
        assert_eq!(view.offers.len(), 1);
        assert!(view.captured_at.is_some());
        assert!(view.last_error.is_none());
    }

    #[tokio::test]
    async fn put_error_preserves_last_known_good_data() {
        let cache = cache();
        cache
            .put(Marketplace::Binance, Direction::Buy, vec![offer("1", Direction::Buy)])
            .await;
        let captured = cache
            .view(Marketplace::Binance, Direction::Buy)
            .await
            .unwrap()
            .captured_at;

        cache
            .put_error(Marketplace::Binance, Direction::Buy, "HTTP 429".to_string())
            .await;

        let view = cache.view(Marketplace::Binance, Direction::Buy).await.unwrap();
        assert_eq!(view.offers.len(), 1, "offers must survive a failed refresh");
        assert_eq!(view.captured_at, captured);
        assert_eq!(view.last_error.as_deref(), Some("HTTP 429"));
    }

    #[tokio::test]
    async fn slot_failure_leaves_sibling_slots_untouched() {
        let cache = cache();
        cache
            .put(Marketplace::Binance, Direction::Sell, vec![offer("1", Direction::Sell)])
            .await;
        cache
            .put(Marketplace::Bybit, Direction::Buy, vec![offer("2", Direction::Buy)])
            .await;

        cache
            .put_error(Marketplace::Binance, Direction::Buy, "boom".to_string())
            .await;

        let sell = cache.view(Marketplace::Binance, Direction::Sell).await.unwrap();
        let other = cache.view(Marketplace::Bybit, Direction::Buy).await.unwrap();
        assert_eq!(sell.offers.len(), 1);
        assert!(sell.last_error.is_none());
        assert_eq!(other.offers.len(), 1);
        assert!(other.last_error.is_none());
    }

    #[test]
    fn freshness_classification_is_monotonic_over_age() {
        let cache = cache();
        let now = Utc::now();
        let at = |age_secs: i64| Some(now - ChronoDuration::seconds(age_secs));

        assert_eq!(cache.classify(at(0), now), Freshness::Fresh);
        assert_eq!(cache.classify(at(600), now), Freshness::Fresh);
        assert_eq!(cache.classify(at(601), now), Freshness::Stale);
        assert_eq!(cache.classify(at(1500), now), Freshness::Stale);
        assert_eq!(cache.classify(at(1800), now), Freshness::Stale);
        assert_eq!(cache.classify(at(1801), now), Freshness::Expired);
    }

    #[test]
    fn never_captured_classifies_as_expired() {
        let cache = cache();
        assert_eq!(cache.classify(None, Utc::now()), Freshness::Expired);
    }
}
