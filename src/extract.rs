//! Price extraction from raw scraper payloads.
//!
//! Backend result shapes vary: some payloads carry a top-level nightly or
//! total price, others bury prices one or two levels deep in room-option
//! collections. Extraction is an ordered list of strategies applied in
//! sequence; the first strategy that produces a price wins, and a payload
//! that defeats all of them yields `None` ("unresolved", never zero).

use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::Value;
use tracing::debug;

use crate::models::JobOutcome;

/// Inputs the strategies need besides the payload itself.
#[derive(Debug, Clone, Copy)]
pub struct ExtractContext {
    /// Stay length in nights, >= 1 by StayWindow construction.
    pub nights: i64,
    /// Requested adult count, matched against room-option occupancy.
    pub adults: u32,
    /// When false (apartments, mobile homes) occupancy matching is
    /// bypassed and the first extractable option wins.
    pub occupancy_strict: bool,
}

type Strategy = fn(&Value, &ExtractContext) -> Option<Decimal>;

/// Fallback chain, in priority order. Each entry is independently testable.
const STRATEGIES: &[(&str, Strategy)] = &[
    ("direct_average", direct_average),
    ("direct_total", direct_total),
    ("room_collections", room_collections),
];

/// Payload fields holding an already-per-night price.
const AVERAGE_FIELDS: &[&str] = &[
    "avgPricePerNight",
    "avg_price_per_night",
    "pricePerNight",
    "price_per_night",
    "averagePrice",
];

/// Payload fields holding a whole-stay price, to be divided by nights.
const TOTAL_FIELDS: &[&str] = &["totalPrice", "total_price", "total"];

/// Fields declaring how many persons a room option sleeps.
const OCCUPANCY_FIELDS: &[&str] = &[
    "occupancy",
    "maxOccupancy",
    "max_occupancy",
    "adults",
    "b_max_persons",
];

/// Room-option collections observed at the payload top level.
const ROOM_COLLECTIONS: &[&str] = &["rooms", "roomOptions"];

/// Derive the canonical nightly price from one job outcome.
///
/// Deterministic and idempotent: the same outcome always yields the same
/// price, and no payload shape can make it panic.
pub fn extract_price(outcome: &JobOutcome, ctx: &ExtractContext) -> Option<Decimal> {
    let payload = match outcome {
        JobOutcome::Completed(payload) => payload,
        JobOutcome::Failed(reason) => {
            debug!("no extraction from failed job: {}", reason);
            return None;
        }
    };

    for (name, strategy) in STRATEGIES {
        if let Some(price) = strategy(payload, ctx) {
            debug!("extracted {} per night via {}", price, name);
            return Some(price);
        }
    }

    debug!("no strategy matched payload");
    None
}

// ── Strategies ────────────────────────────────────────────────────────

/// Top-level average-per-night field, returned as-is.
fn direct_average(payload: &Value, _ctx: &ExtractContext) -> Option<Decimal> {
    average_of(payload)
}

/// Top-level total field, divided across the stay.
fn direct_total(payload: &Value, ctx: &ExtractContext) -> Option<Decimal> {
    total_of(payload).and_then(|total| per_night(total, ctx.nights))
}

/// Nested room-option collections, one or two levels deep.
fn room_collections(payload: &Value, ctx: &ExtractContext) -> Option<Decimal> {
    for collection in ROOM_COLLECTIONS {
        let Some(options) = payload.get(*collection).and_then(Value::as_array) else {
            continue;
        };
        for option in options {
            if let Some(price) = option_price(option, ctx) {
                return Some(price);
            }
            // Booking-style options nest per-stay prices one level deeper.
            if let Some(stays) = option.get("b_stay_prices").and_then(Value::as_array) {
                for stay in stays {
                    if let Some(price) = option_price(stay, ctx) {
                        return Some(price);
                    }
                }
            }
        }
    }
    None
}

/// Price of a single room option, honoring occupancy matching.
fn option_price(option: &Value, ctx: &ExtractContext) -> Option<Decimal> {
    if ctx.occupancy_strict {
        if let Some(persons) = occupancy_of(option) {
            if persons != u64::from(ctx.adults) {
                return None;
            }
        }
    }

    average_of(option)
        .or_else(|| total_of(option).and_then(|total| per_night(total, ctx.nights)))
}

// ── Field readers ─────────────────────────────────────────────────────

fn average_of(node: &Value) -> Option<Decimal> {
    for field in AVERAGE_FIELDS {
        if let Some(price) = node.get(*field).and_then(amount) {
            return Some(price);
        }
    }
    // An object-valued "price" may carry the average under a subkey.
    if let Some(price) = node.get("price") {
        for field in ["perNight", "avg", "average"] {
            if let Some(value) = price.get(field).and_then(amount) {
                return Some(value);
            }
        }
    }
    None
}

fn total_of(node: &Value) -> Option<Decimal> {
    for field in TOTAL_FIELDS {
        if let Some(total) = node.get(*field).and_then(amount) {
            return Some(total);
        }
    }
    match node.get("price") {
        // Scalar "price" is a whole-stay amount.
        Some(price @ (Value::Number(_) | Value::String(_))) => amount(price),
        // Object "price" carries the total under a subkey.
        Some(price) => price.get("total").and_then(amount).or_else(|| {
            price
                .get("gross_price")
                .or_else(|| price.get("gross_amount"))
                .and_then(amount)
        }),
        None => node
            .get("b_price")
            .and_then(amount)
            .or_else(|| {
                node.get("b_price_breakdown")
                    .and_then(|b| b.get("gross_price").or_else(|| b.get("gross_amount")))
                    .and_then(amount)
            }),
    }
}

fn occupancy_of(option: &Value) -> Option<u64> {
    for field in OCCUPANCY_FIELDS {
        if let Some(persons) = option.get(*field).and_then(Value::as_u64) {
            return Some(persons);
        }
    }
    None
}

fn per_night(total: Decimal, nights: i64) -> Option<Decimal> {
    // nights >= 1 is guaranteed upstream; checked_div keeps this total.
    total.checked_div(Decimal::from(nights)).map(round2)
}

fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Parse a currency amount from a JSON number or string.
fn amount(value: &Value) -> Option<Decimal> {
    let parsed = match value {
        Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        Value::String(s) => parse_amount(s),
        _ => None,
    };
    parsed.filter(|d| !d.is_sign_negative())
}

/// Parse a human-formatted currency string: strips currency symbols,
/// ordinary and non-breaking spaces, and thousands separators. Returns
/// `None` on anything unparseable rather than erroring.
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let has_dot = cleaned.contains('.');
    let has_comma = cleaned.contains(',');
    let normalized = if has_dot && has_comma {
        // The right-most mark is the decimal separator.
        if cleaned.rfind('.') > cleaned.rfind(',') {
            cleaned.replace(',', "")
        } else {
            cleaned.replace('.', "").replace(',', ".")
        }
    } else if has_comma {
        // A lone comma is a decimal mark when at most two digits follow,
        // a thousands separator otherwise.
        let after_last = cleaned.rsplit(',').next().unwrap_or("");
        if cleaned.matches(',').count() == 1 && after_last.len() <= 2 {
            cleaned.replace(',', ".")
        } else {
            cleaned.replace(',', "")
        }
    } else {
        cleaned
    };

    Decimal::from_str(&normalized).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn ctx(nights: i64, adults: u32) -> ExtractContext {
        ExtractContext {
            nights,
            adults,
            occupancy_strict: true,
        }
    }

    fn completed(payload: Value) -> JobOutcome {
        JobOutcome::Completed(payload)
    }

    #[test]
    fn direct_average_is_returned_without_division() {
        let outcome = completed(json!({ "avgPricePerNight": "119.90" }));
        assert_eq!(extract_price(&outcome, &ctx(7, 2)), Some(dec!(119.90)));
    }

    #[test]
    fn total_is_divided_by_nights_and_rounded_half_up() {
        let outcome = completed(json!({ "price": { "total": 700 } }));
        assert_eq!(extract_price(&outcome, &ctx(3, 2)), Some(dec!(233.33)));

        // 100 / 3 = 33.333... -> 33.33; 200 / 3 = 66.666... -> 66.67
        let outcome = completed(json!({ "totalPrice": 200 }));
        assert_eq!(extract_price(&outcome, &ctx(3, 2)), Some(dec!(66.67)));
    }

    #[test]
    fn scalar_price_field_is_a_stay_total() {
        let outcome = completed(json!({ "price": "€ 500" }));
        assert_eq!(extract_price(&outcome, &ctx(5, 2)), Some(dec!(100.00)));
    }

    #[test]
    fn average_beats_total_when_both_present() {
        let outcome = completed(json!({
            "avgPricePerNight": 120,
            "price": { "total": 700 }
        }));
        assert_eq!(extract_price(&outcome, &ctx(7, 2)), Some(dec!(120)));
    }

    #[test]
    fn rooms_collection_matches_requested_occupancy() {
        let outcome = completed(json!({
            "rooms": [
                { "adults": 3, "totalPrice": 300 },
                { "adults": 2, "totalPrice": 200 }
            ]
        }));
        assert_eq!(extract_price(&outcome, &ctx(2, 2)), Some(dec!(100.00)));
    }

    #[test]
    fn occupancy_bypass_takes_first_extractable_option() {
        let outcome = completed(json!({
            "rooms": [
                { "adults": 3, "totalPrice": 300 },
                { "adults": 2, "totalPrice": 200 }
            ]
        }));
        let relaxed = ExtractContext {
            nights: 2,
            adults: 1,
            occupancy_strict: false,
        };
        assert_eq!(
            extract_price(&outcome, &relaxed),
            Some(dec!(150.00)),
            "first option wins when occupancy matching is bypassed"
        );
        // Under strict matching the same payload has no option for 1 adult.
        assert_eq!(extract_price(&outcome, &ctx(2, 1)), None);
    }

    #[test]
    fn booking_style_stay_prices_are_reached_two_levels_deep() {
        let outcome = completed(json!({
            "roomOptions": [
                {
                    "b_stay_prices": [
                        { "b_max_persons": 3, "b_price": "€ 900" },
                        { "b_max_persons": 2, "b_price": "€ 400" }
                    ]
                }
            ]
        }));
        assert_eq!(extract_price(&outcome, &ctx(4, 2)), Some(dec!(100.00)));
    }

    #[test]
    fn gross_price_breakdown_is_a_total() {
        let outcome = completed(json!({
            "roomOptions": [
                {
                    "b_stay_prices": [
                        {
                            "b_max_persons": 2,
                            "b_price_breakdown": { "gross_price": 361 }
                        }
                    ]
                }
            ]
        }));
        assert_eq!(extract_price(&outcome, &ctx(2, 2)), Some(dec!(180.50)));
    }

    #[test]
    fn unparseable_option_does_not_stop_the_chain() {
        let outcome = completed(json!({
            "rooms": [
                { "adults": 2, "totalPrice": "call us" },
                { "adults": 2, "totalPrice": "€ 240" }
            ]
        }));
        assert_eq!(extract_price(&outcome, &ctx(2, 2)), Some(dec!(120.00)));
    }

    #[test]
    fn failed_jobs_and_unmatched_payloads_are_unresolved() {
        let failed = JobOutcome::Failed("timed out".into());
        assert_eq!(extract_price(&failed, &ctx(2, 2)), None);

        let empty = completed(json!({}));
        assert_eq!(extract_price(&empty, &ctx(2, 2)), None);

        let noise = completed(json!({ "name": "Hotel Adria", "stars": 4 }));
        assert_eq!(extract_price(&noise, &ctx(2, 2)), None);
    }

    #[test]
    fn extraction_is_idempotent() {
        let outcome = completed(json!({ "price": { "total": 700 } }));
        let first = extract_price(&outcome, &ctx(3, 2));
        let second = extract_price(&outcome, &ctx(3, 2));
        assert_eq!(first, second);
    }

    #[test]
    fn currency_strings_are_normalized() {
        assert_eq!(parse_amount("€ 1.234,56"), Some(dec!(1234.56)));
        assert_eq!(parse_amount("$1,234.56"), Some(dec!(1234.56)));
        assert_eq!(parse_amount("1\u{a0}234,50 kn"), Some(dec!(1234.50)));
        assert_eq!(parse_amount("EUR 89"), Some(dec!(89)));
        assert_eq!(parse_amount("12,5"), Some(dec!(12.5)));
        assert_eq!(parse_amount("1,200"), Some(dec!(1200)));
        assert_eq!(parse_amount("free cancellation"), None);
        assert_eq!(parse_amount(""), None);
    }

    #[test]
    fn negative_amounts_are_rejected() {
        let outcome = completed(json!({ "avgPricePerNight": -10 }));
        assert_eq!(extract_price(&outcome, &ctx(2, 2)), None);
    }
}
