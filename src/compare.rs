//! Group comparison: diffs against the own property, competitor ranking,
//! and change detection against the previous snapshot.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::config::ComparisonPolicy;
use crate::error::Error;
use crate::models::{
    ChangeEvent, ComparisonRow, GroupKey, PriceQuote, PriceSnapshot, Role,
};

/// Everything one group comparison produces. The snapshot replaces the
/// previous one wholesale; entries for properties no longer in the group
/// are dropped.
#[derive(Debug, Clone)]
pub struct GroupComparison {
    pub rows: Vec<ComparisonRow>,
    pub changes: Vec<ChangeEvent>,
    pub snapshot: PriceSnapshot,
}

/// Compare one group of quotes against its own property and its previous
/// snapshot. `previous = None` means no prior data and yields zero change
/// events. Quotes keep their input order throughout.
pub fn compare(
    key: &GroupKey,
    quotes: &[PriceQuote],
    previous: Option<&PriceSnapshot>,
    policy: &ComparisonPolicy,
) -> Result<GroupComparison, Error> {
    validate_composition(key, quotes, policy)?;

    let own_price = quotes
        .iter()
        .find(|q| q.role == Role::Own)
        .and_then(|q| q.price_per_night);

    let cheapest_idx = cheapest_competitor(quotes);

    let rows = quotes
        .iter()
        .enumerate()
        .map(|(idx, quote)| {
            let (diff_abs, diff_pct) = match (quote.price_per_night, own_price) {
                (Some(price), Some(own)) => {
                    let diff = price - own;
                    (Some(diff), percent_of(diff, own))
                }
                _ => (None, None),
            };
            ComparisonRow {
                property_name: quote.property_name.clone(),
                role: quote.role,
                price_per_night: quote.price_per_night,
                diff_vs_own_absolute: diff_abs,
                diff_vs_own_percent: diff_pct,
                cheapest_competitor: Some(idx) == cheapest_idx,
            }
        })
        .collect();

    let changes = match previous {
        Some(snapshot) => detect_changes(key, quotes, snapshot),
        None => Vec::new(),
    };

    Ok(GroupComparison {
        rows,
        changes,
        snapshot: PriceSnapshot::from_quotes(quotes),
    })
}

fn validate_composition(
    key: &GroupKey,
    quotes: &[PriceQuote],
    policy: &ComparisonPolicy,
) -> Result<(), Error> {
    let own_count = quotes.iter().filter(|q| q.role == Role::Own).count();
    if own_count != 1 {
        return Err(Error::InvalidGroupComposition {
            unit: key.unit_name.clone(),
            room_type: key.room_type.label().to_string(),
            own_count,
        });
    }

    if let Some(expected) = policy.expected_competitors {
        let competitors = quotes.len() - own_count;
        if competitors != expected {
            return Err(Error::UnexpectedCompetitorCount {
                unit: key.unit_name.clone(),
                room_type: key.room_type.label().to_string(),
                competitors,
                expected,
            });
        }
    }

    Ok(())
}

/// Index of the cheapest resolved competitor; ties go to the first in
/// input order so runs stay reproducible.
fn cheapest_competitor(quotes: &[PriceQuote]) -> Option<usize> {
    let mut cheapest: Option<(usize, Decimal)> = None;
    for (idx, quote) in quotes.iter().enumerate() {
        if quote.role != Role::Competitor {
            continue;
        }
        let Some(price) = quote.price_per_night else {
            continue;
        };
        match cheapest {
            Some((_, best)) if price >= best => {}
            _ => cheapest = Some((idx, price)),
        }
    }
    cheapest.map(|(idx, _)| idx)
}

fn detect_changes(
    key: &GroupKey,
    quotes: &[PriceQuote],
    previous: &PriceSnapshot,
) -> Vec<ChangeEvent> {
    quotes
        .iter()
        .filter_map(|quote| {
            let old_price = previous.price_of(&quote.property_name);
            let new_price = quote.price_per_night;
            // Unresolved counts as a value distinct from any number;
            // unresolved on both sides is not a change.
            if old_price == new_price {
                return None;
            }
            Some(ChangeEvent {
                unit_name: key.unit_name.clone(),
                room_type: key.room_type.clone(),
                property_name: quote.property_name.clone(),
                old_price,
                new_price,
            })
        })
        .collect()
}

fn percent_of(diff: Decimal, own: Decimal) -> Option<Decimal> {
    diff.checked_div(own).map(|ratio| {
        (ratio * Decimal::from(100)).round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero)
    })
}
