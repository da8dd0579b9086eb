//! Offer service
//!
//! Function-level contract consumed by the HTTP layer: `search`, `health`
//! and `trigger_refresh` over the snapshot cache. Requests never touch the
//! network; they see whatever the scheduler last captured, filtered by the
//! staleness policy.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

use crate::aggregate::{self, SlotReport};
use crate::cache::{Freshness, SnapshotCache};
use crate::config::AppConfig;
use crate::rank;
use crate::refresh::RefreshScheduler;
use crate::types::{Direction, Marketplace, ScoredOffer};

/// Denomination of the requested amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestedCurrency {
    /// The traded asset (USDT)
    Asset,
    /// The quote fiat currency
    Fiat,
}

#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub direction: Direction,
    pub amount: f64,
    pub currency: RequestedCurrency,
}

/// Search precondition and availability failures.
///
/// Transient per-source failures never surface here; they stay in slot
/// metadata while last-known-good data keeps serving.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("amount must be a positive number")]
    InvalidAmount,
    #[error("service temporarily unavailable: {0}")]
    Unavailable(String),
}

// ─────────────────────────────────────────────────────────────────
// Response shapes
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct QueryEcho {
    pub direction: Direction,
    pub input_amount: f64,
    pub input_currency: String,
}

/// Counter-amount estimate priced at the best pooled price.
#[derive(Debug, Clone, Serialize)]
pub struct Estimate {
    pub asset_amount: f64,
    pub fiat_amount: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct OfferLimits {
    pub min: f64,
    pub max: f64,
}

/// One ranked offer, shaped for display.
#[derive(Debug, Clone, Serialize)]
pub struct RankedOffer {
    pub id: String,
    pub source: Marketplace,
    pub counterparty: String,
    pub price: f64,
    pub available: f64,
    pub limits: OfferLimits,
    /// Percentage string, e.g. "98.0%"
    pub completion_rate: String,
    pub total_orders: u32,
    pub payment_methods: Vec<String>,
    /// Rounded to one decimal
    pub score: f64,
    pub external_link: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchMeta {
    /// Age of the oldest contributing snapshot, seconds
    pub data_age_secs: i64,
    /// True when any contributing slot is past the fresh window
    pub is_stale: bool,
    /// Pooled offers before the eligibility filter
    pub total_offers: usize,
    /// Offers that passed the eligibility filter
    pub compatible_offers: usize,
    /// Per-slot contribution detail
    pub sources: Vec<SlotReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchReport {
    pub query: QueryEcho,
    pub estimate: Estimate,
    pub offers: Vec<RankedOffer>,
    pub meta: SearchMeta,
}

#[derive(Debug, Clone, Serialize)]
pub struct SlotHealth {
    pub source: Marketplace,
    pub direction: Direction,
    pub count: usize,
    /// "37s" or "never"
    pub age: String,
    pub freshness: Freshness,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: String,
    pub slots: Vec<SlotHealth>,
}

// ─────────────────────────────────────────────────────────────────
// Service
// ─────────────────────────────────────────────────────────────────

pub struct OfferService {
    cache: Arc<SnapshotCache>,
    scheduler: Arc<RefreshScheduler>,
    asset: String,
    fiat: String,
    top_n: usize,
}

impl OfferService {
    pub fn new(
        cache: Arc<SnapshotCache>,
        scheduler: Arc<RefreshScheduler>,
        config: &AppConfig,
    ) -> Self {
        Self {
            cache,
            scheduler,
            asset: config.market.asset.clone(),
            fiat: config.market.fiat.clone(),
            top_n: config.cache.top_n,
        }
    }

    pub fn asset(&self) -> &str {
        &self.asset
    }

    pub fn fiat(&self) -> &str {
        &self.fiat
    }

    /// Start an on-demand refresh cycle. Returns immediately.
    pub fn trigger_refresh(&self) {
        self.scheduler.trigger();
    }

    /// Per-slot observability snapshot.
    pub async fn health(&self) -> HealthReport {
        let now = Utc::now();
        let mut slots = Vec::new();
        for view in self.cache.view_all().await {
            let freshness = self.cache.classify(view.captured_at, now);
            let age = match view.captured_at {
                Some(at) => format!("{}s", now.signed_duration_since(at).num_seconds()),
                None => "never".to_string(),
            };
            slots.push(SlotHealth {
                source: view.source,
                direction: view.direction,
                count: view.offers.len(),
                age,
                freshness,
                error: view.last_error,
            });
        }
        HealthReport {
            status: "ok".to_string(),
            slots,
        }
    }

    /// Rank the cached offer pool against the requested trade.
    pub async fn search(&self, query: SearchQuery) -> Result<SearchReport, SearchError> {
        self.search_at(query, Utc::now()).await
    }

    /// `search` with an explicit clock, the staleness policy evaluated at `now`.
    pub async fn search_at(
        &self,
        query: SearchQuery,
        now: DateTime<Utc>,
    ) -> Result<SearchReport, SearchError> {
        if !query.amount.is_finite() || query.amount <= 0.0 {
            return Err(SearchError::InvalidAmount);
        }

        let pooled = aggregate::pool(&self.cache, query.direction, now).await;
        if pooled.offers.is_empty() {
            return Err(SearchError::Unavailable(unavailable_detail(&pooled.slots)));
        }

        let user_buying = query.direction == Direction::Buy;

        // Best price across the pool: cheapest ask when buying, highest bid
        // when selling. Used only to denominate fiat requests in the asset.
        let best_price = pooled
            .offers
            .iter()
            .map(|o| o.price)
            .fold(if user_buying { f64::INFINITY } else { f64::NEG_INFINITY }, |acc, p| {
                if user_buying {
                    acc.min(p)
                } else {
                    acc.max(p)
                }
            });

        let requested_amount = match query.currency {
            RequestedCurrency::Asset => query.amount,
            RequestedCurrency::Fiat => query.amount / best_price,
        };

        let ranked = rank::rank(&pooled.offers, requested_amount, user_buying);
        let compatible_offers = ranked.len();

        let estimate = Estimate {
            asset_amount: requested_amount,
            fiat_amount: requested_amount * best_price,
        };

        let offers: Vec<RankedOffer> = ranked
            .into_iter()
            .take(self.top_n)
            .map(to_ranked_offer)
            .collect();

        let contributing: Vec<&SlotReport> =
            pooled.slots.iter().filter(|s| s.count > 0).collect();
        let data_age_secs = contributing
            .iter()
            .filter_map(|s| s.age_secs)
            .max()
            .unwrap_or(0);
        let is_stale = contributing
            .iter()
            .any(|s| s.freshness != Freshness::Fresh);

        Ok(SearchReport {
            query: QueryEcho {
                direction: query.direction,
                input_amount: query.amount,
                input_currency: match query.currency {
                    RequestedCurrency::Asset => self.asset.clone(),
                    RequestedCurrency::Fiat => self.fiat.clone(),
                },
            },
            estimate,
            offers,
            meta: SearchMeta {
                data_age_secs,
                is_stale,
                total_offers: pooled.offers.len(),
                compatible_offers,
                sources: pooled.slots,
            },
        })
    }
}

fn unavailable_detail(slots: &[SlotReport]) -> String {
    let errors: Vec<String> = slots
        .iter()
        .filter_map(|s| s.error.as_ref().map(|e| format!("{}: {}", s.source, e)))
        .collect();
    if errors.is_empty() {
        "no usable offer data captured yet".to_string()
    } else {
        errors.join("; ")
    }
}

fn to_ranked_offer(scored: ScoredOffer) -> RankedOffer {
    let offer = scored.offer;
    RankedOffer {
        id: offer.id,
        source: offer.source,
        counterparty: offer.counterparty,
        price: offer.price,
        available: offer.available_amount,
        limits: OfferLimits {
            min: offer.min_limit,
            max: offer.max_limit,
        },
        completion_rate: format!("{:.1}%", offer.completion_rate * 100.0),
        total_orders: offer.total_orders,
        payment_methods: offer.payment_methods,
        score: (scored.score * 10.0).round() / 10.0,
        external_link: offer.external_link,
    }
}
