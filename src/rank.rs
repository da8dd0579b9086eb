//! Ranking engine
//!
//! Filters pooled offers for eligibility against the requested amount and
//! scores the survivors with a deterministic additive formula:
//!
//! - price competitiveness, weight 40 (relative rank within the candidate set)
//! - counterparty completion rate, weight 30
//! - liquidity buffer, weight 15 (full credit at 3x the requested amount)
//! - counterparty experience, weight 15 (full credit at 100+ orders)

use crate::types::{Offer, ScoredOffer};

const PRICE_WEIGHT: f64 = 40.0;
const RELIABILITY_WEIGHT: f64 = 30.0;
const BUFFER_WEIGHT: f64 = 15.0;
const EXPERIENCE_WEIGHT: f64 = 15.0;

/// Full credit once available inventory covers 3x the requested amount.
const BUFFER_CAP: f64 = 3.0;
/// Full experience credit at this many completed orders.
const EXPERIENCE_CAP: u32 = 100;

/// Hard constraint applied before any scoring: the counterparty must be able
/// to fill the requested amount within its own limits.
pub fn is_eligible(offer: &Offer, requested_amount: f64) -> bool {
    offer.available_amount >= requested_amount
        && offer.min_limit <= requested_amount
        && requested_amount <= offer.max_limit
}

/// Price rank within the candidate set: the count of candidates priced at
/// least as well, self-inclusive (<= when buying, >= when selling). Equal
/// prices share one rank at the better end.
fn price_rank(candidates: &[&Offer], offer: &Offer, user_buying: bool) -> usize {
    candidates
        .iter()
        .filter(|c| {
            if user_buying {
                c.price <= offer.price
            } else {
                c.price >= offer.price
            }
        })
        .count()
}

fn score(candidates: &[&Offer], offer: &Offer, requested_amount: f64, user_buying: bool) -> f64 {
    let n = candidates.len() as f64;
    let rank = price_rank(candidates, offer, user_buying) as f64;

    let price = PRICE_WEIGHT * (n - rank + 1.0) / n;
    let reliability = RELIABILITY_WEIGHT * offer.completion_rate;
    let buffer =
        BUFFER_WEIGHT * (offer.available_amount / requested_amount / BUFFER_CAP).min(1.0);
    let experience =
        EXPERIENCE_WEIGHT * (f64::from(offer.total_orders) / f64::from(EXPERIENCE_CAP)).min(1.0);

    price + reliability + buffer + experience
}

/// Rank `offers` for a trade of `requested_amount` (in asset units).
///
/// Ineligible offers are excluded entirely. The result is sorted by score
/// descending; exact ties keep insertion order (stable sort, no secondary
/// key). An empty candidate set yields an empty list, never an error.
pub fn rank(offers: &[Offer], requested_amount: f64, user_buying: bool) -> Vec<ScoredOffer> {
    let candidates: Vec<&Offer> = offers
        .iter()
        .filter(|o| is_eligible(o, requested_amount))
        .collect();

    if candidates.is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<ScoredOffer> = candidates
        .iter()
        .map(|o| ScoredOffer {
            offer: (*o).clone(),
            score: score(&candidates, o, requested_amount, user_buying),
        })
        .collect();

    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    scored
}
