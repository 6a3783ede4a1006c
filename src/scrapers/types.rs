use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::models::{OccupancyRequest, PropertyRow, StayWindow};

/// Input for one scrape job: target listing plus stay and party details.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeJob {
    /// Listing page to price.
    pub target_url: Url,
    /// Check-in date (ISO).
    pub check_in: NaiveDate,
    /// Check-out date (ISO).
    pub check_out: NaiveDate,
    /// Number of adults.
    pub adults: u32,
    /// Number of children.
    pub children: u32,
    /// Currency code requested from the scraper.
    pub currency: String,
    /// Room count, when the target service supports it.
    pub rooms: Option<u32>,
}

impl ScrapeJob {
    pub fn for_property(
        row: &PropertyRow,
        occupancy: OccupancyRequest,
        stay: &StayWindow,
        currency: &str,
    ) -> Self {
        Self {
            target_url: row.target_url.clone(),
            check_in: stay.check_in(),
            check_out: stay.check_out(),
            adults: occupancy.adults,
            children: occupancy.children,
            currency: currency.to_string(),
            rooms: None,
        }
    }
}
