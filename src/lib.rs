//! rate-scout: competitor booking-price monitor.
//!
//! Pipeline: property rows -> scrape jobs -> raw payloads -> canonical
//! nightly prices -> comparison against the own property -> change events
//! against the previous snapshot.

pub mod compare;
pub mod config;
pub mod error;
pub mod extract;
pub mod models;
pub mod notify;
pub mod pipeline;
pub mod request;
pub mod scrapers;
pub mod snapshot;
pub mod source;
