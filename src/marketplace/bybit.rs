//! Bybit P2P adapter
//!
//! Queries the fiat OTC item listing. Bybit reports per-order limits in the
//! quote currency, so normalization converts them to asset units.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{build_client, OfferSource};
use crate::normalize::{normalize, RawOffer};
use crate::types::{Direction, Marketplace, Offer};

const LISTING_URL: &str = "https://api2.bybit.com/fiat/otc/item/online";

/// Map the user's direction onto Bybit's listing side.
///
/// `"1"` lists merchant sell ads (the user buys), `"0"` lists merchant buy
/// ads (the user sells).
pub fn provider_side(direction: Direction) -> &'static str {
    match direction {
        Direction::Buy => "1",
        Direction::Sell => "0",
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ListingPayload<'a> {
    token_id: &'a str,
    currency_id: &'a str,
    side: &'a str,
    size: String,
    page: String,
    payment: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListingResponse {
    ret_code: i64,
    #[serde(default)]
    ret_msg: String,
    result: Option<ListingResult>,
}

#[derive(Debug, Deserialize)]
struct ListingResult {
    #[serde(default)]
    items: Vec<ListingItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListingItem {
    id: String,
    price: String,
    /// Remaining tradable quantity, in the asset
    last_quantity: String,
    /// Per-order limits, in the quote currency
    min_amount: String,
    max_amount: String,
    nick_name: String,
    /// Percentage in [0, 100]
    #[serde(default)]
    recent_execute_rate: f64,
    #[serde(default)]
    recent_order_num: u32,
    #[serde(default)]
    payments: Vec<String>,
}

pub struct BybitP2p {
    client: reqwest::Client,
    asset: String,
    fiat: String,
    rows: u32,
}

impl BybitP2p {
    pub fn new(asset: &str, fiat: &str, rows: u32, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            asset: asset.to_string(),
            fiat: fiat.to_string(),
            rows,
        })
    }

    fn convert(items: Vec<ListingItem>, direction: Direction, asset: &str, fiat: &str) -> Vec<Offer> {
        items
            .into_iter()
            .filter_map(|item| {
                let raw = RawOffer {
                    id: item.id,
                    counterparty: item.nick_name,
                    price: item.price,
                    available_amount: item.last_quantity,
                    min_limit: item.min_amount,
                    max_limit: item.max_amount,
                    limits_in_quote: true,
                    // recentExecuteRate is 0-100, canonical form is a fraction
                    completion_rate: (item.recent_execute_rate / 100.0).to_string(),
                    total_orders: item.recent_order_num.to_string(),
                    payment_methods: item.payments,
                    external_link: format!(
                        "https://www.bybit.com/fiat/trade/otc?actionType={}&token={}&fiat={}",
                        provider_side(direction),
                        asset,
                        fiat
                    ),
                };
                normalize(raw, Marketplace::Bybit, direction)
            })
            .collect()
    }
}

#[async_trait]
impl OfferSource for BybitP2p {
    fn marketplace(&self) -> Marketplace {
        Marketplace::Bybit
    }

    async fn fetch(&self, direction: Direction) -> Result<Vec<Offer>> {
        let payload = ListingPayload {
            token_id: &self.asset,
            currency_id: &self.fiat,
            side: provider_side(direction),
            size: self.rows.to_string(),
            page: "1".to_string(),
            payment: Vec::new(),
        };

        let response = self
            .client
            .post(LISTING_URL)
            .json(&payload)
            .send()
            .await
            .context("Bybit P2P request failed")?;

        if !response.status().is_success() {
            bail!("Bybit P2P returned error: {}", response.status());
        }

        let body: ListingResponse = response
            .json()
            .await
            .context("Failed to parse Bybit P2P response")?;

        if body.ret_code != 0 {
            bail!("Bybit P2P rejected request: {} ({})", body.ret_msg, body.ret_code);
        }

        let items = body.result.context("Invalid response structure")?.items;
        let offers = Self::convert(items, direction, &self.asset, &self.fiat);

        tracing::debug!(
            direction = %direction,
            count = offers.len(),
            "Bybit P2P ads fetched"
        );
        Ok(offers)
    }
}
