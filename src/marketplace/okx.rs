//! OKX P2P adapter
//!
//! Reads the public C2C order book. OKX keys the two books by the merchant's
//! side, so a buying user reads the `sell` book and vice versa. Per-order
//! limits are quote-denominated.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use super::{build_client, OfferSource};
use crate::normalize::{normalize, RawOffer};
use crate::types::{Direction, Marketplace, Offer};

const BOOKS_URL: &str = "https://www.okx.com/v3/c2c/tradingOrders/books";

/// Map the user's direction onto the merchant-side book to read.
pub fn provider_side(direction: Direction) -> &'static str {
    match direction {
        Direction::Buy => "sell",
        Direction::Sell => "buy",
    }
}

#[derive(Debug, Deserialize)]
struct BooksResponse {
    code: i64,
    #[serde(default)]
    msg: String,
    data: Option<Books>,
}

#[derive(Debug, Deserialize)]
struct Books {
    #[serde(default)]
    buy: Vec<BookAd>,
    #[serde(default)]
    sell: Vec<BookAd>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BookAd {
    id: String,
    price: String,
    /// Remaining tradable quantity, in the asset
    available_amount: String,
    /// Per-order limits, in the quote currency
    quote_min_amount_per_order: String,
    quote_max_amount_per_order: String,
    nick_name: String,
    #[serde(default)]
    public_user_id: String,
    /// Fraction in [0, 1], shipped as a string
    #[serde(default)]
    completed_rate: String,
    #[serde(default)]
    completed_order_quantity: u32,
    #[serde(default)]
    payment_methods: Vec<String>,
}

pub struct OkxP2p {
    client: reqwest::Client,
    asset: String,
    fiat: String,
}

impl OkxP2p {
    pub fn new(asset: &str, fiat: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            asset: asset.to_string(),
            fiat: fiat.to_string(),
        })
    }

    fn convert(ads: Vec<BookAd>, direction: Direction) -> Vec<Offer> {
        ads.into_iter()
            .filter_map(|ad| {
                let raw = RawOffer {
                    id: ad.id,
                    counterparty: ad.nick_name,
                    price: ad.price,
                    available_amount: ad.available_amount,
                    min_limit: ad.quote_min_amount_per_order,
                    max_limit: ad.quote_max_amount_per_order,
                    limits_in_quote: true,
                    completion_rate: ad.completed_rate,
                    total_orders: ad.completed_order_quantity.to_string(),
                    payment_methods: ad.payment_methods,
                    external_link: format!(
                        "https://www.okx.com/p2p/ads-merchant?publicUserId={}",
                        ad.public_user_id
                    ),
                };
                normalize(raw, Marketplace::Okx, direction)
            })
            .collect()
    }
}

#[async_trait]
impl OfferSource for OkxP2p {
    fn marketplace(&self) -> Marketplace {
        Marketplace::Okx
    }

    async fn fetch(&self, direction: Direction) -> Result<Vec<Offer>> {
        let side = provider_side(direction);
        let response = self
            .client
            .get(BOOKS_URL)
            .query(&[
                ("quoteCurrency", self.fiat.as_str()),
                ("baseCurrency", self.asset.as_str()),
                ("side", side),
            ])
            .send()
            .await
            .context("OKX P2P request failed")?;

        if !response.status().is_success() {
            bail!("OKX P2P returned error: {}", response.status());
        }

        let body: BooksResponse = response
            .json()
            .await
            .context("Failed to parse OKX P2P response")?;

        if body.code != 0 {
            bail!("OKX P2P rejected request: {} ({})", body.msg, body.code);
        }

        let books = body.data.context("Invalid response structure")?;
        let ads = match direction {
            Direction::Buy => books.sell,
            Direction::Sell => books.buy,
        };
        let offers = Self::convert(ads, direction);

        tracing::debug!(
            direction = %direction,
            count = offers.len(),
            "OKX P2P ads fetched"
        );
        Ok(offers)
    }
}
