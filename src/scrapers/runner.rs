//! Concurrent job fan-out.
//!
//! One task per property, bounded by a concurrency cap and a minimum
//! inter-job spacing so a batch of submissions does not hammer the
//! external service. A job that times out or fails yields `Failed` for
//! its property only; siblings keep running.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, Semaphore};
use tokio::time::{sleep, sleep_until, timeout, Instant};
use tracing::{info, warn};

use crate::config::RunnerConfig;
use crate::models::{JobOutcome, OccupancyRequest, PropertyJobResult, PropertyRow, StayWindow};
use crate::scrapers::traits::JobClient;
use crate::scrapers::types::ScrapeJob;

/// Called after each job completes with `(done, total)`.
pub type ProgressHook = Arc<dyn Fn(usize, usize) + Send + Sync>;

pub struct JobRunner {
    client: Arc<dyn JobClient>,
    cfg: RunnerConfig,
    currency: String,
    attempt_timeout: Duration,
    progress: Option<ProgressHook>,
}

impl JobRunner {
    pub fn new(
        client: Arc<dyn JobClient>,
        cfg: RunnerConfig,
        currency: String,
        attempt_timeout: Duration,
    ) -> Self {
        Self {
            client,
            cfg,
            currency,
            attempt_timeout,
            progress: None,
        }
    }

    pub fn with_progress(mut self, hook: ProgressHook) -> Self {
        self.progress = Some(hook);
        self
    }

    /// Run one job per property and return one result per input, in input
    /// order. Results are tied to their originating row by the paired
    /// task handle, never by completion order.
    pub async fn run_jobs(
        &self,
        requests: &[(PropertyRow, OccupancyRequest)],
        stay: &StayWindow,
    ) -> Vec<PropertyJobResult> {
        let total = requests.len();
        let semaphore = Arc::new(Semaphore::new(self.cfg.max_concurrent.max(1)));
        let launch_gate = Arc::new(Mutex::new(Instant::now()));
        let done = Arc::new(AtomicUsize::new(0));
        let spacing = Duration::from_millis(self.cfg.min_spacing_ms);

        info!(
            "running {} jobs via {} (cap {}, spacing {}ms, retries {})",
            total,
            self.client.service_name(),
            self.cfg.max_concurrent.max(1),
            self.cfg.min_spacing_ms,
            self.cfg.retries,
        );

        let mut handles = Vec::with_capacity(total);
        for (row, occupancy) in requests {
            let job = ScrapeJob::for_property(row, *occupancy, stay, &self.currency);
            let property_name = row.property_name.clone();
            let client = self.client.clone();
            let semaphore = semaphore.clone();
            let launch_gate = launch_gate.clone();
            let done = done.clone();
            let progress = self.progress.clone();
            let retries = self.cfg.retries;
            let backoff = Duration::from_millis(self.cfg.retry_backoff_ms);
            let attempt_timeout = self.attempt_timeout;

            let handle = tokio::spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return JobOutcome::Failed("runner shut down".into()),
                };
                wait_for_slot(&launch_gate, spacing).await;

                let outcome = run_with_policy(
                    client.as_ref(),
                    &job,
                    &property_name,
                    retries,
                    backoff,
                    attempt_timeout,
                )
                .await;

                let finished = done.fetch_add(1, Ordering::SeqCst) + 1;
                if let Some(hook) = progress {
                    hook(finished, total);
                }
                outcome
            });
            handles.push((row.property_name.clone(), handle));
        }

        let mut results = Vec::with_capacity(total);
        for (property_name, handle) in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!("job task for {} panicked: {}", property_name, e);
                    JobOutcome::Failed(format!("job task failed: {e}"))
                }
            };
            results.push(PropertyJobResult {
                property_name,
                outcome,
            });
        }
        results
    }
}

/// Serialize job launches so consecutive submissions stay `spacing` apart.
async fn wait_for_slot(gate: &Mutex<Instant>, spacing: Duration) {
    if spacing.is_zero() {
        return;
    }
    let slot = {
        let mut next = gate.lock().await;
        let slot = (*next).max(Instant::now());
        *next = slot + spacing;
        slot
    };
    sleep_until(slot).await;
}

/// One job under the explicit retry policy: `retries` extra attempts with
/// linear backoff, each attempt bounded by `attempt_timeout`.
async fn run_with_policy(
    client: &dyn JobClient,
    job: &ScrapeJob,
    property_name: &str,
    retries: u32,
    backoff: Duration,
    attempt_timeout: Duration,
) -> JobOutcome {
    let mut last_failure = String::new();
    for attempt in 0..=retries {
        if attempt > 0 {
            sleep(backoff * attempt).await;
            info!("retrying {} (attempt {})", property_name, attempt + 1);
        }
        match timeout(attempt_timeout, client.fetch_listing(job)).await {
            Ok(Ok(payload)) => return JobOutcome::Completed(payload),
            Ok(Err(e)) => {
                warn!("job for {} failed: {}", property_name, e);
                last_failure = e.to_string();
            }
            Err(_) => {
                warn!(
                    "job for {} timed out after {:?}",
                    property_name, attempt_timeout
                );
                last_failure = format!("timed out after {attempt_timeout:?}");
            }
        }
    }
    JobOutcome::Failed(last_failure)
}
