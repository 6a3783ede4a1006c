//! End-to-end pipeline runs against a stubbed scraping service.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use url::Url;

use rate_scout::config::{ComparisonPolicy, OccupancyConfig, RunnerConfig};
use rate_scout::error::Error;
use rate_scout::models::{PropertyCategory, PropertyRow, Role, RoomType, StayWindow};
use rate_scout::pipeline::Monitor;
use rate_scout::scrapers::{JobClient, JobRunner, ScrapeJob};
use rate_scout::snapshot::JsonSnapshotStore;

/// Serves canned payloads keyed by the job's target URL path; paths with
/// no payload fail like a scraper job with an empty result set.
struct CannedService {
    payloads: HashMap<String, Value>,
}

impl CannedService {
    fn new(payloads: Vec<(&str, Value)>) -> Self {
        Self {
            payloads: payloads
                .into_iter()
                .map(|(path, payload)| (path.to_string(), payload))
                .collect(),
        }
    }
}

#[async_trait]
impl JobClient for CannedService {
    async fn fetch_listing(&self, job: &ScrapeJob) -> Result<Value, Error> {
        match self.payloads.get(job.target_url.path()) {
            Some(payload) => Ok(payload.clone()),
            None => Err(Error::Job("empty result set".into())),
        }
    }

    fn service_name(&self) -> &'static str {
        "canned"
    }
}

fn row(unit: &str, room: RoomType, role: Role, name: &str, path: &str) -> PropertyRow {
    PropertyRow {
        unit_name: unit.into(),
        room_type: room,
        property_category: PropertyCategory::Hotel,
        role,
        property_name: name.into(),
        target_url: Url::parse(&format!("https://example.com{path}")).unwrap(),
    }
}

fn stay_two_nights() -> StayWindow {
    StayWindow::new(
        NaiveDate::from_ymd_opt(2025, 7, 10).unwrap(),
        NaiveDate::from_ymd_opt(2025, 7, 12).unwrap(),
    )
    .unwrap()
}

fn monitor_with(service: CannedService, snapshot_dir: &std::path::Path) -> Monitor {
    let runner = JobRunner::new(
        Arc::new(service),
        RunnerConfig {
            max_concurrent: 4,
            min_spacing_ms: 0,
            retries: 0,
            retry_backoff_ms: 0,
        },
        "EUR".into(),
        Duration::from_secs(5),
    );
    Monitor::new(
        runner,
        Box::new(JsonSnapshotStore::new(snapshot_dir.to_path_buf())),
        OccupancyConfig::default(),
        ComparisonPolicy::default(),
    )
}

fn temp_dir(test_name: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "rate-scout-it-{}-{}",
        test_name,
        std::process::id()
    ));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

fn villa_rows() -> Vec<PropertyRow> {
    vec![
        row("Villa Mare", RoomType::Double, Role::Own, "Villa Mare", "/own"),
        row("Villa Mare", RoomType::Double, Role::Competitor, "Hotel A", "/a"),
        row("Villa Mare", RoomType::Double, Role::Competitor, "Hotel B", "/b"),
        row("Villa Mare", RoomType::Double, Role::Competitor, "Hotel C", "/c"),
    ]
}

fn baseline_payloads() -> Vec<(&'static str, Value)> {
    vec![
        // 180 over two nights -> 90 per night.
        ("/own", json!({ "price": { "total": 180 } })),
        // 160 over two nights -> 80 per night.
        ("/a", json!({ "price": { "total": 160 } })),
        // Already per-night.
        ("/b", json!({ "avgPricePerNight": 80 })),
        // "/c" has no payload and fails.
    ]
}

#[tokio::test]
async fn first_run_compares_and_seeds_the_snapshot() {
    let dir = temp_dir("first-run");
    let monitor = monitor_with(CannedService::new(baseline_payloads()), &dir);

    let report = monitor.run(villa_rows(), stay_two_nights()).await.unwrap();

    assert_eq!(report.groups.len(), 1);
    assert!(report.skipped_groups.is_empty());
    // First run has no prior snapshot, so no change events.
    assert!(report.changes.is_empty());

    let rows = &report.groups[0].1;
    assert_eq!(rows.len(), 4);

    assert_eq!(rows[0].property_name, "Villa Mare");
    assert_eq!(rows[0].price_per_night, Some(dec!(90.00)));

    // Hotel A and Hotel B tie at 80; the first by input order is flagged.
    assert_eq!(rows[1].price_per_night, Some(dec!(80.00)));
    assert!(rows[1].cheapest_competitor);
    assert_eq!(rows[1].diff_vs_own_absolute, Some(dec!(-10.00)));
    assert_eq!(rows[1].diff_vs_own_percent, Some(dec!(-11.1)));
    assert!(!rows[2].cheapest_competitor);

    // The failed job stays in the table as unresolved, not dropped.
    assert_eq!(rows[3].property_name, "Hotel C");
    assert_eq!(rows[3].price_per_night, None);
    assert_eq!(rows[3].diff_vs_own_absolute, None);
}

#[tokio::test]
async fn second_run_detects_exactly_the_moved_price() {
    let dir = temp_dir("second-run");

    let monitor = monitor_with(CannedService::new(baseline_payloads()), &dir);
    monitor.run(villa_rows(), stay_two_nights()).await.unwrap();

    // Hotel A moves from 160 to 170 per stay (80 -> 85 per night);
    // everything else, including the still-failing Hotel C, is unchanged.
    let mut moved = baseline_payloads();
    moved[1] = ("/a", json!({ "price": { "total": 170 } }));
    let monitor = monitor_with(CannedService::new(moved), &dir);

    let report = monitor.run(villa_rows(), stay_two_nights()).await.unwrap();

    assert_eq!(report.changes.len(), 1);
    let change = &report.changes[0];
    assert_eq!(change.property_name, "Hotel A");
    assert_eq!(change.old_price, Some(dec!(80.00)));
    assert_eq!(change.new_price, Some(dec!(85.00)));
}

#[tokio::test]
async fn recovered_price_is_a_change_from_unavailable() {
    let dir = temp_dir("recovered");

    let monitor = monitor_with(CannedService::new(baseline_payloads()), &dir);
    monitor.run(villa_rows(), stay_two_nights()).await.unwrap();

    let mut healed = baseline_payloads();
    healed.push(("/c", json!({ "avgPricePerNight": 75 })));
    let monitor = monitor_with(CannedService::new(healed), &dir);

    let report = monitor.run(villa_rows(), stay_two_nights()).await.unwrap();

    assert_eq!(report.changes.len(), 1);
    let change = &report.changes[0];
    assert_eq!(change.property_name, "Hotel C");
    assert_eq!(change.old_price, None);
    assert_eq!(change.new_price, Some(dec!(75)));
}

#[tokio::test]
async fn a_group_without_an_own_row_is_skipped_not_fatal() {
    let dir = temp_dir("skipped-group");

    let mut rows = villa_rows();
    // Second group with competitors only.
    rows.push(row("Villa Sol", RoomType::Double, Role::Competitor, "Hotel X", "/a"));
    rows.push(row("Villa Sol", RoomType::Double, Role::Competitor, "Hotel Y", "/b"));

    let monitor = monitor_with(CannedService::new(baseline_payloads()), &dir);
    let report = monitor.run(rows, stay_two_nights()).await.unwrap();

    assert_eq!(report.groups.len(), 1);
    assert_eq!(report.groups[0].0.unit_name, "Villa Mare");
    assert_eq!(report.skipped_groups.len(), 1);
    assert_eq!(report.skipped_groups[0].0.unit_name, "Villa Sol");
}

#[tokio::test]
async fn unknown_room_type_aborts_before_any_job() {
    let dir = temp_dir("unknown-room");

    let mut rows = villa_rows();
    rows.push(row(
        "Villa Mare",
        RoomType::Other("suite".into()),
        Role::Competitor,
        "Hotel S",
        "/a",
    ));

    let monitor = monitor_with(CannedService::new(baseline_payloads()), &dir);
    let result = monitor.run(rows, stay_two_nights()).await;

    assert!(matches!(result, Err(Error::UnknownRoomType(_))));
    // The run aborted during planning, so no snapshot was written.
    assert!(!dir.exists());
}
