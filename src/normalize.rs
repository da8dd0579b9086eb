//! Offer normalization
//!
//! Converts provider-shaped raw ads into the canonical `Offer` and unit
//! system. Every marketplace ships its numerics as JSON strings; parsing is
//! defensive and drops individual ads, never whole batches.

use crate::types::{Direction, Marketplace, Offer};

/// Provider-shaped offer fields, before validation and unit conversion.
///
/// `price`, `available_amount`, `min_limit` and `max_limit` are required —
/// an unparseable value drops the ad. `completion_rate` and `total_orders`
/// are quality signals only and default to zero when missing or malformed.
#[derive(Debug, Clone)]
pub struct RawOffer {
    /// Provider ad id (unprefixed)
    pub id: String,
    pub counterparty: String,
    pub price: String,
    pub available_amount: String,
    pub min_limit: String,
    pub max_limit: String,
    /// True when the provider reports limits in the quote currency; they are
    /// converted to asset units by dividing by the ad price.
    pub limits_in_quote: bool,
    /// Completion rate as reported; interpreted as a [0, 1] fraction
    pub completion_rate: String,
    pub total_orders: String,
    pub payment_methods: Vec<String>,
    pub external_link: String,
}

fn parse_positive(raw: &str) -> Option<f64> {
    let value = raw.trim().parse::<f64>().ok()?;
    if !value.is_finite() || value <= 0.0 {
        return None;
    }
    Some(value)
}

fn parse_non_negative(raw: &str) -> Option<f64> {
    let value = raw.trim().parse::<f64>().ok()?;
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    Some(value)
}

/// Normalize one raw ad into the canonical `Offer`, or drop it.
///
/// Dropped when any required numeric field fails to parse, or when the
/// normalized values violate `price > 0`, `available_amount > 0` or
/// `min_limit <= max_limit`. Deterministic: the same input always yields the
/// same outcome.
pub fn normalize(raw: RawOffer, source: Marketplace, direction: Direction) -> Option<Offer> {
    let price = parse_positive(&raw.price)?;
    let available_amount = parse_positive(&raw.available_amount)?;
    let mut min_limit = parse_non_negative(&raw.min_limit)?;
    let mut max_limit = parse_non_negative(&raw.max_limit)?;

    if raw.limits_in_quote {
        min_limit /= price;
        max_limit /= price;
    }

    if min_limit > max_limit {
        return None;
    }

    let completion_rate = raw
        .completion_rate
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|r| r.is_finite())
        .unwrap_or(0.0)
        .clamp(0.0, 1.0);

    let total_orders = raw.total_orders.trim().parse::<u32>().unwrap_or(0);

    Some(Offer {
        id: format!("{}:{}", source, raw.id),
        source,
        direction,
        price,
        available_amount,
        min_limit,
        max_limit,
        counterparty: raw.counterparty,
        completion_rate,
        total_orders,
        payment_methods: raw.payment_methods,
        external_link: raw.external_link,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(price: &str, available: &str, min: &str, max: &str) -> RawOffer {
        RawOffer {
            id: "12345".to_string(),
            counterparty: "TetherTrader".to_string(),
            price: price.to_string(),
            available_amount: available.to_string(),
            min_limit: min.to_string(),
            max_limit: max.to_string(),
            limits_in_quote: false,
            completion_rate: "0.98".to_string(),
            total_orders: "500".to_string(),
            payment_methods: vec!["Bank Transfer".to_string()],
            external_link: "https://example.com/ad/12345".to_string(),
        }
    }

    #[test]
    fn normalized_offer_satisfies_invariants() {
        let offer = normalize(raw("26000", "1000", "100", "2000"), Marketplace::Binance, Direction::Buy)
            .expect("offer should survive normalization");
        assert!(offer.price > 0.0);
        assert!(offer.available_amount > 0.0);
        assert!(offer.min_limit <= offer.max_limit);
        assert_eq!(offer.id, "Binance:12345");
        assert!((offer.completion_rate - 0.98).abs() < 1e-9);
        assert_eq!(offer.total_orders, 500);
    }

    #[test]
    fn unparseable_required_field_drops_offer() {
        assert!(normalize(raw("n/a", "1000", "100", "2000"), Marketplace::Binance, Direction::Buy).is_none());
        assert!(normalize(raw("26000", "", "100", "2000"), Marketplace::Binance, Direction::Buy).is_none());
        assert!(normalize(raw("26000", "1000", "abc", "2000"), Marketplace::Binance, Direction::Buy).is_none());
        assert!(normalize(raw("26000", "1000", "100", "NaN"), Marketplace::Binance, Direction::Buy).is_none());
    }

    #[test]
    fn non_positive_price_or_inventory_drops_offer() {
        assert!(normalize(raw("0", "1000", "100", "2000"), Marketplace::Binance, Direction::Buy).is_none());
        assert!(normalize(raw("-26000", "1000", "100", "2000"), Marketplace::Binance, Direction::Buy).is_none());
        assert!(normalize(raw("26000", "0", "100", "2000"), Marketplace::Binance, Direction::Buy).is_none());
    }

    #[test]
    fn inverted_limits_drop_offer() {
        assert!(normalize(raw("26000", "1000", "2000", "100"), Marketplace::Binance, Direction::Buy).is_none());
    }

    #[test]
    fn quote_denominated_limits_convert_to_asset_units() {
        let mut ad = raw("26000", "1000", "2600000", "52000000");
        ad.limits_in_quote = true;
        let offer = normalize(ad, Marketplace::Bybit, Direction::Sell).expect("offer");
        assert!((offer.min_limit - 100.0).abs() < 1e-9);
        assert!((offer.max_limit - 2000.0).abs() < 1e-9);
    }

    #[test]
    fn malformed_quality_fields_default_to_zero() {
        let mut ad = raw("26000", "1000", "100", "2000");
        ad.completion_rate = "unknown".to_string();
        ad.total_orders = "-3".to_string();
        let offer = normalize(ad, Marketplace::Okx, Direction::Buy).expect("offer");
        assert_eq!(offer.completion_rate, 0.0);
        assert_eq!(offer.total_orders, 0);
    }

    #[test]
    fn completion_rate_is_clamped_to_unit_interval() {
        let mut ad = raw("26000", "1000", "100", "2000");
        ad.completion_rate = "1.7".to_string();
        let offer = normalize(ad, Marketplace::Binance, Direction::Buy).expect("offer");
        assert_eq!(offer.completion_rate, 1.0);
    }

    #[test]
    fn normalization_is_deterministic() {
        let a = normalize(raw("26000", "1000", "100", "2000"), Marketplace::Binance, Direction::Buy);
        let b = normalize(raw("26000", "1000", "100", "2000"), Marketplace::Binance, Direction::Buy);
        assert_eq!(format!("{:?}", a), format!("{:?}", b));
    }
}
