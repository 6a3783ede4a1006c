//! Run orchestration: rows -> jobs -> raw payloads -> canonical prices ->
//! comparison rows -> change events.
//!
//! Groups are processed one after another; within a group jobs fan out
//! concurrently and fan back in before the comparison runs. Loading,
//! comparing against and replacing a group's snapshot happen as one unit
//! before the next group's snapshot is touched.

use tracing::{info, warn};

use crate::compare::{compare, GroupComparison};
use crate::config::{ComparisonPolicy, OccupancyConfig};
use crate::error::Error;
use crate::extract::{extract_price, ExtractContext};
use crate::models::{
    ChangeEvent, ComparisonRow, GroupKey, OccupancyRequest, PriceQuote, PropertyRow, StayWindow,
};
use crate::request::build_request;
use crate::scrapers::JobRunner;
use crate::snapshot::SnapshotStore;

/// Everything one monitoring run produces.
#[derive(Debug, Default)]
pub struct RunReport {
    /// Comparison table per group, in first-seen group order.
    pub groups: Vec<(GroupKey, Vec<ComparisonRow>)>,
    /// Change events across all groups.
    pub changes: Vec<ChangeEvent>,
    /// Groups whose comparison was rejected, with the reason.
    pub skipped_groups: Vec<(GroupKey, String)>,
}

pub struct Monitor {
    runner: JobRunner,
    store: Box<dyn SnapshotStore>,
    occupancy: OccupancyConfig,
    policy: ComparisonPolicy,
}

impl Monitor {
    pub fn new(
        runner: JobRunner,
        store: Box<dyn SnapshotStore>,
        occupancy: OccupancyConfig,
        policy: ComparisonPolicy,
    ) -> Self {
        Self {
            runner,
            store,
            occupancy,
            policy,
        }
    }

    /// Run the full pipeline over all groups in `rows`.
    ///
    /// Every occupancy request is built before any job is submitted, so a
    /// configuration error (unknown room type) aborts the run with zero
    /// network traffic. Group-scoped failures are recorded in the report
    /// and never stop the remaining groups.
    pub async fn run(&self, rows: Vec<PropertyRow>, stay: StayWindow) -> Result<RunReport, Error> {
        let groups = plan_groups(rows, &self.occupancy)?;
        info!(
            "starting run: {} groups, {} nights",
            groups.len(),
            stay.nights()
        );

        let mut report = RunReport::default();
        for (key, requests) in groups {
            let comparison = match self.run_group(&key, &requests, &stay).await {
                Ok(comparison) => comparison,
                Err(
                    e @ (Error::InvalidGroupComposition { .. }
                    | Error::UnexpectedCompetitorCount { .. }),
                ) => {
                    warn!("skipping group {}: {}", key, e);
                    report.skipped_groups.push((key, e.to_string()));
                    continue;
                }
                Err(e) => return Err(e),
            };

            report.changes.extend(comparison.changes);
            report.groups.push((key, comparison.rows));
        }

        info!(
            "run finished: {} groups compared, {} changes, {} groups skipped",
            report.groups.len(),
            report.changes.len(),
            report.skipped_groups.len()
        );
        Ok(report)
    }

    async fn run_group(
        &self,
        key: &GroupKey,
        requests: &[(PropertyRow, OccupancyRequest)],
        stay: &StayWindow,
    ) -> Result<GroupComparison, Error> {
        let results = self.runner.run_jobs(requests, stay).await;

        let quotes: Vec<PriceQuote> = requests
            .iter()
            .zip(&results)
            .map(|((row, occupancy), result)| {
                let ctx = ExtractContext {
                    nights: stay.nights(),
                    adults: occupancy.adults,
                    occupancy_strict: row.property_category.has_room_variants(),
                };
                PriceQuote {
                    property_name: row.property_name.clone(),
                    role: row.role,
                    price_per_night: extract_price(&result.outcome, &ctx),
                }
            })
            .collect();

        // A corrupt or unreadable snapshot degrades to "no prior data";
        // the overwrite below restores a usable file for the next run.
        let previous = match self.store.load(key) {
            Ok(previous) => previous,
            Err(e) => {
                warn!("could not read snapshot for {}: {}", key, e);
                None
            }
        };

        let comparison = compare(key, &quotes, previous.as_ref(), &self.policy)?;

        if let Err(e) = self.store.store(key, &comparison.snapshot) {
            warn!("could not persist snapshot for {}: {}", key, e);
        }

        Ok(comparison)
    }
}

/// Group rows by (unit, room type) preserving first-seen order, and build
/// every occupancy request up front.
fn plan_groups(
    rows: Vec<PropertyRow>,
    occupancy: &OccupancyConfig,
) -> Result<Vec<(GroupKey, Vec<(PropertyRow, OccupancyRequest)>)>, Error> {
    let mut groups: Vec<(GroupKey, Vec<(PropertyRow, OccupancyRequest)>)> = Vec::new();
    for row in rows {
        let request = build_request(&row, occupancy)?;
        let key = row.group_key();
        match groups.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, members)) => members.push((row, request)),
            None => groups.push((key, vec![(row, request)])),
        }
    }
    Ok(groups)
}
