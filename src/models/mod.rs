use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::Error;

/// Role of a property within a comparison group
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Own,
    Competitor,
}

impl Role {
    /// Parse from a source-sheet cell (case-insensitive, trimmed)
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "own" => Some(Role::Own),
            "competitor" => Some(Role::Competitor),
            _ => None,
        }
    }
}

/// Room type of a listing; unrecognized labels are preserved for reporting
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum RoomType {
    Double,
    Triple,
    Family,
    Single,
    Other(String),
}

impl RoomType {
    /// Parse from a source-sheet cell (case-insensitive, trimmed)
    pub fn parse(raw: &str) -> Self {
        let normalized = raw.trim().to_lowercase();
        match normalized.as_str() {
            "double" => RoomType::Double,
            "triple" => RoomType::Triple,
            "family" => RoomType::Family,
            "single" => RoomType::Single,
            _ => RoomType::Other(normalized),
        }
    }

    /// Canonical lowercase label, used for display and snapshot keys
    pub fn label(&self) -> &str {
        match self {
            RoomType::Double => "double",
            RoomType::Triple => "triple",
            RoomType::Family => "family",
            RoomType::Single => "single",
            RoomType::Other(label) => label,
        }
    }
}

impl fmt::Display for RoomType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Category of the listed property
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum PropertyCategory {
    Hotel,
    Apartment,
    MobileHome,
}

impl PropertyCategory {
    /// Parse from a source-sheet cell (case-insensitive, trimmed)
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "hotel" => Some(PropertyCategory::Hotel),
            "apartment" => Some(PropertyCategory::Apartment),
            "mobile-home" | "mobile home" | "mobile" => Some(PropertyCategory::MobileHome),
            _ => None,
        }
    }

    /// Apartments and mobile homes have no per-guest room variants,
    /// so occupancy mapping and occupancy matching are bypassed for them.
    pub fn has_room_variants(&self) -> bool {
        matches!(self, PropertyCategory::Hotel)
    }
}

/// One competitor or reference property from the source sheet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyRow {
    pub unit_name: String,
    pub room_type: RoomType,
    pub property_category: PropertyCategory,
    pub role: Role,
    pub property_name: String,
    pub target_url: Url,
}

impl PropertyRow {
    pub fn group_key(&self) -> GroupKey {
        GroupKey {
            unit_name: self.unit_name.clone(),
            room_type: self.room_type.clone(),
        }
    }
}

/// Party composition submitted with a scrape job
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct OccupancyRequest {
    pub adults: u32,
    pub children: u32,
}

/// Validated check-in/check-out pair; always spans at least one night
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StayWindow {
    check_in: NaiveDate,
    check_out: NaiveDate,
}

impl StayWindow {
    /// Rejects windows where check-out is not strictly after check-in.
    pub fn new(check_in: NaiveDate, check_out: NaiveDate) -> Result<Self, Error> {
        if check_out <= check_in {
            return Err(Error::InvalidStayWindow {
                check_in,
                check_out,
            });
        }
        Ok(Self {
            check_in,
            check_out,
        })
    }

    pub fn check_in(&self) -> NaiveDate {
        self.check_in
    }

    pub fn check_out(&self) -> NaiveDate {
        self.check_out
    }

    /// Number of nights, >= 1 by construction
    pub fn nights(&self) -> i64 {
        (self.check_out - self.check_in).num_days()
    }
}

/// Outcome of one scraper invocation
#[derive(Debug, Clone)]
pub enum JobOutcome {
    /// Raw result payload as returned by the scraping service
    Completed(serde_json::Value),
    Failed(String),
}

/// Job outcome tagged with its originating property, so results can be
/// recombined with rows by name rather than by array index.
#[derive(Debug, Clone)]
pub struct PropertyJobResult {
    pub property_name: String,
    pub outcome: JobOutcome,
}

/// Canonical nightly price per property; `None` means unresolved, never zero
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceQuote {
    pub property_name: String,
    pub role: Role,
    pub price_per_night: Option<Decimal>,
}

/// A quote augmented with its comparison against the group's own property
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonRow {
    pub property_name: String,
    pub role: Role,
    pub price_per_night: Option<Decimal>,
    /// Present only when both this row's and the own row's price resolved
    pub diff_vs_own_absolute: Option<Decimal>,
    pub diff_vs_own_percent: Option<Decimal>,
    pub cheapest_competitor: bool,
}

/// Grouping and snapshot key: unit + room type
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct GroupKey {
    pub unit_name: String,
    pub room_type: RoomType,
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.unit_name, self.room_type)
    }
}

/// Last persisted nightly prices for one group, keyed by property name.
/// An entry with `None` records a property that was present but unresolved;
/// a missing entry records a property absent from the previous run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceSnapshot {
    /// When these prices were recorded.
    #[serde(default = "Utc::now")]
    pub recorded_at: DateTime<Utc>,
    pub prices: BTreeMap<String, Option<Decimal>>,
}

impl Default for PriceSnapshot {
    fn default() -> Self {
        Self {
            recorded_at: Utc::now(),
            prices: BTreeMap::new(),
        }
    }
}

impl PriceSnapshot {
    pub fn from_quotes(quotes: &[PriceQuote]) -> Self {
        Self {
            recorded_at: Utc::now(),
            prices: quotes
                .iter()
                .map(|q| (q.property_name.clone(), q.price_per_night))
                .collect(),
        }
    }

    /// Previous price for a property; absent entries collapse to `None`,
    /// matching the change-detection equality rule.
    pub fn price_of(&self, property_name: &str) -> Option<Decimal> {
        self.prices.get(property_name).copied().flatten()
    }
}

/// Price movement detected between two runs for one property
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub unit_name: String,
    pub room_type: RoomType,
    pub property_name: String,
    pub old_price: Option<Decimal>,
    pub new_price: Option<Decimal>,
}
