//! Apify-style scraping-service client.
//!
//! One job is: start an actor run with the job input, poll the run status
//! until it reaches a terminal state or the job deadline elapses, then
//! fetch the run's default dataset and take the first item.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use crate::config::ScraperConfig;
use crate::error::Error;
use crate::scrapers::traits::JobClient;
use crate::scrapers::types::ScrapeJob;

/// HTTP client for the external job-submission API.
pub struct ApifyClient {
    client: Client,
    cfg: ScraperConfig,
}

#[derive(Debug, Deserialize)]
struct RunEnvelope {
    data: RunState,
}

#[derive(Debug, Deserialize)]
struct RunState {
    id: String,
    status: String,
    #[serde(rename = "defaultDatasetId")]
    default_dataset_id: String,
}

#[derive(Debug, Deserialize)]
struct DatasetItems(Vec<Value>);

impl ApifyClient {
    pub fn new(cfg: ScraperConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, cfg })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.cfg.base_url.trim_end_matches('/'), path)
    }

    fn run_input(&self, job: &ScrapeJob) -> Value {
        let mut input = json!({
            "startUrls": [{ "url": job.target_url.as_str() }],
            "checkIn": job.check_in.to_string(),
            "checkOut": job.check_out.to_string(),
            "adults": job.adults,
            "children": job.children,
            "currency": job.currency,
            "maxListings": 1
        });
        if let Some(rooms) = job.rooms {
            input["rooms"] = json!(rooms);
        }
        input
    }

    async fn start_run(&self, job: &ScrapeJob) -> Result<RunState, Error> {
        let path = format!("/v2/acts/{}/runs", self.cfg.actor);
        let resp = self
            .client
            .post(self.url(&path))
            .query(&[("token", self.cfg.token.as_str())])
            .json(&self.run_input(job))
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Job(format!(
                "actor run not accepted (status {status}): {body}"
            )));
        }

        let envelope: RunEnvelope = resp.json().await.map_err(|e| Error::Http(e.to_string()))?;
        debug!("started run {} for {}", envelope.data.id, job.target_url);
        Ok(envelope.data)
    }

    async fn run_state(&self, run_id: &str) -> Result<RunState, Error> {
        let path = format!("/v2/actor-runs/{run_id}");
        let resp = self
            .client
            .get(self.url(&path))
            .query(&[("token", self.cfg.token.as_str())])
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(Error::Job(format!(
                "run status query failed (status {})",
                resp.status()
            )));
        }

        let envelope: RunEnvelope = resp.json().await.map_err(|e| Error::Http(e.to_string()))?;
        Ok(envelope.data)
    }

    async fn dataset_items(&self, dataset_id: &str) -> Result<Vec<Value>, Error> {
        let path = format!("/v2/datasets/{dataset_id}/items");
        let resp = self
            .client
            .get(self.url(&path))
            .query(&[("token", self.cfg.token.as_str()), ("format", "json")])
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(Error::Job(format!(
                "dataset fetch failed (status {})",
                resp.status()
            )));
        }

        let items: DatasetItems = resp.json().await.map_err(|e| Error::Http(e.to_string()))?;
        Ok(items.0)
    }
}

#[async_trait]
impl JobClient for ApifyClient {
    async fn fetch_listing(&self, job: &ScrapeJob) -> Result<Value, Error> {
        let deadline = Instant::now() + Duration::from_secs(self.cfg.job_timeout_secs);
        let poll_interval = Duration::from_secs(self.cfg.poll_interval_secs.max(1));

        let mut run = self.start_run(job).await?;

        loop {
            match run.status.as_str() {
                "SUCCEEDED" => break,
                "FAILED" | "ABORTED" | "TIMED-OUT" => {
                    return Err(Error::Job(format!(
                        "run {} ended with status {}",
                        run.id, run.status
                    )));
                }
                // READY / RUNNING keep polling.
                other => debug!("run {} status {}", run.id, other),
            }

            if Instant::now() >= deadline {
                warn!("run {} exceeded job deadline", run.id);
                return Err(Error::Job(format!(
                    "run {} did not finish within {}s",
                    run.id, self.cfg.job_timeout_secs
                )));
            }

            sleep(poll_interval).await;
            run = self.run_state(&run.id).await?;
        }

        let items = self.dataset_items(&run.default_dataset_id).await?;
        items
            .into_iter()
            .next()
            .ok_or_else(|| Error::Job(format!("run {} returned an empty result set", run.id)))
    }

    fn service_name(&self) -> &'static str {
        "apify"
    }
}
