//! Binance P2P adapter
//!
//! Queries the public ad search endpoint. Binance labels ads from the
//! merchant's side, so the user's direction is inverted once, here, and
//! nowhere else.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{build_client, OfferSource};
use crate::normalize::{normalize, RawOffer};
use crate::types::{Direction, Marketplace, Offer};

const SEARCH_URL: &str = "https://p2p.binance.com/bapi/c2c/v2/friendly/c2c/adv/search";

/// Map the user's direction onto Binance's merchant-side trade type.
///
/// A user buying USDT fills a merchant SELL ad, and vice versa.
pub fn provider_side(direction: Direction) -> &'static str {
    match direction {
        Direction::Buy => "SELL",
        Direction::Sell => "BUY",
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchPayload<'a> {
    asset: &'a str,
    fiat: &'a str,
    merchant_check: bool,
    page: u32,
    pay_types: Vec<String>,
    publisher_type: Option<String>,
    rows: u32,
    trade_type: &'a str,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    data: Option<Vec<AdEntry>>,
}

#[derive(Debug, Deserialize)]
struct AdEntry {
    #[serde(default)]
    adv: Option<Adv>,
    #[serde(default)]
    advertiser: Option<Advertiser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Adv {
    adv_no: String,
    price: String,
    surplus_amount: String,
    min_single_trans_amount: String,
    dynamic_max_single_trans_amount: String,
    #[serde(default)]
    trade_methods: Vec<TradeMethod>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TradeMethod {
    #[serde(default)]
    trade_method_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Advertiser {
    nick_name: String,
    user_no: String,
    #[serde(default)]
    month_finish_rate: f64,
    #[serde(default)]
    month_order_count: u32,
}

pub struct BinanceP2p {
    client: reqwest::Client,
    asset: String,
    fiat: String,
    rows: u32,
}

impl BinanceP2p {
    pub fn new(asset: &str, fiat: &str, rows: u32, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            asset: asset.to_string(),
            fiat: fiat.to_string(),
            rows,
        })
    }

    fn convert(ads: Vec<AdEntry>, direction: Direction, side: &str) -> Vec<Offer> {
        ads.into_iter()
            .filter_map(|entry| {
                let adv = entry.adv?;
                let advertiser = entry.advertiser?;
                let raw = RawOffer {
                    id: adv.adv_no,
                    counterparty: advertiser.nick_name,
                    price: adv.price,
                    available_amount: adv.surplus_amount,
                    min_limit: adv.min_single_trans_amount,
                    max_limit: adv.dynamic_max_single_trans_amount,
                    // Binance reports single-transaction limits in the asset
                    limits_in_quote: false,
                    completion_rate: advertiser.month_finish_rate.to_string(),
                    total_orders: advertiser.month_order_count.to_string(),
                    payment_methods: adv
                        .trade_methods
                        .into_iter()
                        .filter_map(|m| m.trade_method_name)
                        .collect(),
                    external_link: format!(
                        "https://p2p.binance.com/en/advertiserDetail?advertiserNo={}&tradeType={}",
                        advertiser.user_no,
                        side.to_lowercase()
                    ),
                };
                normalize(raw, Marketplace::Binance, direction)
            })
            .collect()
    }
}

#[async_trait]
impl OfferSource for BinanceP2p {
    fn marketplace(&self) -> Marketplace {
        Marketplace::Binance
    }

    async fn fetch(&self, direction: Direction) -> Result<Vec<Offer>> {
        let side = provider_side(direction);
        let payload = SearchPayload {
            asset: &self.asset,
            fiat: &self.fiat,
            merchant_check: false,
            page: 1,
            pay_types: Vec::new(),
            publisher_type: None,
            rows: self.rows,
            trade_type: side,
        };

        let response = self
            .client
            .post(SEARCH_URL)
            .json(&payload)
            .send()
            .await
            .context("Binance P2P request failed")?;

        if !response.status().is_success() {
            bail!("Binance P2P returned error: {}", response.status());
        }

        let body: SearchResponse = response
            .json()
            .await
            .context("Failed to parse Binance P2P response")?;

        let ads = body.data.context("Invalid response structure")?;
        let offers = Self::convert(ads, direction, side);

        tracing::debug!(
            direction = %direction,
            count = offers.len(),
            "Binance P2P ads fetched"
        );
        Ok(offers)
    }
}
