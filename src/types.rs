//! Core types used throughout P2PScout
//!
//! Defines the canonical offer shape and the enums shared by the cache,
//! scheduler, aggregator and ranking engine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Trade direction from the requesting user's perspective.
///
/// `Buy` means the user is buying USDT. Marketplaces label their ads from the
/// merchant's perspective, so each adapter owns an explicit mapping to its
/// provider-side value (see `marketplace::*::provider_side`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Buy,
    Sell,
}

impl Direction {
    /// All directions tracked by the snapshot cache.
    pub const ALL: [Direction; 2] = [Direction::Buy, Direction::Sell];

    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "buy" => Some(Direction::Buy),
            "sell" => Some(Direction::Sell),
            _ => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Buy => write!(f, "buy"),
            Direction::Sell => write!(f, "sell"),
        }
    }
}

/// Supported P2P marketplaces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Marketplace {
    Binance,
    Bybit,
    Okx,
}

impl fmt::Display for Marketplace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Marketplace::Binance => write!(f, "Binance"),
            Marketplace::Bybit => write!(f, "Bybit"),
            Marketplace::Okx => write!(f, "OKX"),
        }
    }
}

/// A normalized tradeable quote from one marketplace counterparty.
///
/// All amounts are denominated in the traded asset (USDT), never in fiat —
/// adapters convert quote-currency limits before offers reach the cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Offer {
    /// Globally unique id (provider ad id prefixed with the marketplace name)
    pub id: String,
    /// Marketplace that produced this offer
    pub source: Marketplace,
    /// Direction from the user's perspective
    pub direction: Direction,
    /// Fiat units per 1 USDT
    pub price: f64,
    /// Inventory the counterparty can fill, in USDT
    pub available_amount: f64,
    /// Minimum order size, in USDT
    pub min_limit: f64,
    /// Maximum order size, in USDT
    pub max_limit: f64,
    /// Counterparty display name
    pub counterparty: String,
    /// Counterparty completion rate as a fraction in [0, 1]
    pub completion_rate: f64,
    /// Completed order count (experience proxy)
    pub total_orders: u32,
    /// Accepted payment methods, provider order preserved
    pub payment_methods: Vec<String>,
    /// Link to complete the trade on the marketplace
    pub external_link: String,
}

/// An offer with its computed ranking score. Per-request, never cached.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredOffer {
    pub offer: Offer,
    /// Additive 0–100 score (price + reliability + liquidity + experience)
    pub score: f64,
}
