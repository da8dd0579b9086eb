//! Marketplace adapters (Binance, Bybit, OKX)
//!
//! Each adapter fetches one marketplace's P2P order book over HTTPS and emits
//! normalized offers. The core only sees the `OfferSource` capability; request
//! shaping, anti-bot headers and provider quirks stay adapter-private.

mod binance;
mod bybit;
mod okx;

pub use binance::BinanceP2p;
pub use bybit::BybitP2p;
pub use okx::OkxP2p;

use crate::types::{Direction, Marketplace, Offer};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, USER_AGENT};
use std::time::Duration;

#[cfg(test)]
use mockall::automock;

/// Capability implemented by every marketplace adapter.
///
/// `fetch` returns the normalized offers for one user direction, or an error
/// carrying a human-readable reason. Adapters enforce their own network
/// timeout; the core never blocks beyond it.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait OfferSource: Send + Sync {
    /// Which marketplace this adapter serves
    fn marketplace(&self) -> Marketplace;

    /// Fetch and normalize offers for the user's direction
    async fn fetch(&self, direction: Direction) -> Result<Vec<Offer>>;
}

/// Shared HTTP client for adapter requests. P2P endpoints reject requests
/// without a browser-ish User-Agent.
pub(crate) fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(USER_AGENT, HeaderValue::from_static("Mozilla/5.0"));

    reqwest::Client::builder()
        .timeout(timeout)
        .default_headers(headers)
        .build()
        .context("Failed to create HTTP client")
}
