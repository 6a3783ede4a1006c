//! Unified error type for rate-scout.

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Source sheet is missing required columns: {0:?}")]
    MissingColumns(Vec<String>),

    #[error("No occupancy mapping for room type '{0}'")]
    UnknownRoomType(String),

    #[error("Invalid stay window: check-out {check_out} must be after check-in {check_in}")]
    InvalidStayWindow {
        check_in: NaiveDate,
        check_out: NaiveDate,
    },

    #[error("Invalid group composition for {unit}/{room_type}: {own_count} own properties (expected exactly 1)")]
    InvalidGroupComposition {
        unit: String,
        room_type: String,
        own_count: usize,
    },

    #[error("Group {unit}/{room_type} has {competitors} competitors, policy expects {expected}")]
    UnexpectedCompetitorCount {
        unit: String,
        room_type: String,
        competitors: usize,
        expected: usize,
    },

    #[error("Scrape job failed: {0}")]
    Job(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Notification failed: {0}")]
    Notify(String),
}
