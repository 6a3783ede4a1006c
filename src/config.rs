//! Monitor configuration types.
//!
//! Loaded from a TOML file with serde defaults for every knob; secrets
//! (scraper token, webhook URL) can be overridden from the environment.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::models::{OccupancyRequest, RoomType};

/// Top-level monitor configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Scraping service settings.
    #[serde(default)]
    pub scraper: ScraperConfig,

    /// Job fan-out settings.
    #[serde(default)]
    pub runner: RunnerConfig,

    /// Group composition and ranking policy.
    #[serde(default)]
    pub comparison: ComparisonPolicy,

    /// Room-type to party-composition mapping.
    #[serde(default)]
    pub occupancy: OccupancyConfig,

    /// Snapshot storage settings.
    #[serde(default)]
    pub snapshot: SnapshotConfig,

    /// Change notification settings.
    #[serde(default)]
    pub notify: NotifyConfig,
}

/// Settings for the external job-submission service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    /// API base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Actor identifier to run per property.
    #[serde(default = "default_actor")]
    pub actor: String,

    /// API token; usually supplied via the APIFY_TOKEN env var.
    #[serde(default)]
    pub token: String,

    /// Currency requested from the scraper.
    #[serde(default = "default_currency")]
    pub currency: String,

    /// Run status poll interval (seconds).
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Deadline for a single job attempt (seconds).
    #[serde(default = "default_job_timeout")]
    pub job_timeout_secs: u64,
}

/// Fan-out policy for running many jobs against the same service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Concurrency cap across in-flight jobs.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Minimum spacing between job submissions (milliseconds).
    #[serde(default = "default_min_spacing")]
    pub min_spacing_ms: u64,

    /// Additional attempts after a failed job. Zero preserves the
    /// no-retry behavior; raising it is a deliberate policy change.
    #[serde(default)]
    pub retries: u32,

    /// Linear backoff between attempts (milliseconds).
    #[serde(default = "default_retry_backoff")]
    pub retry_backoff_ms: u64,
}

/// Validation and ranking policy for comparison groups.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComparisonPolicy {
    /// When set, every group must contain exactly this many competitors.
    #[serde(default)]
    pub expected_competitors: Option<usize>,
}

/// Room-type occupancy table, keyed by room-type label. A table given in
/// the config file replaces the built-in mapping wholesale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OccupancyConfig {
    #[serde(flatten)]
    pub rooms: HashMap<String, OccupancyRequest>,
}

impl OccupancyConfig {
    pub fn lookup(&self, room_type: &RoomType) -> Option<OccupancyRequest> {
        self.rooms.get(room_type.label()).copied()
    }
}

/// Snapshot storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotConfig {
    /// Directory holding one snapshot file per group.
    #[serde(default = "default_snapshot_dir")]
    pub dir: PathBuf,
}

/// Change notification settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Chat webhook URL; notifications are skipped when unset.
    #[serde(default)]
    pub webhook_url: Option<String>,
}

impl MonitorConfig {
    /// Load from a TOML file, falling back to defaults when `path` is None,
    /// then apply environment overrides for secrets.
    pub fn load(path: Option<&Path>) -> Result<Self, Error> {
        let mut cfg: MonitorConfig = match path {
            Some(p) => {
                let raw = std::fs::read_to_string(p)?;
                toml::from_str(&raw).map_err(|e| Error::Config(e.to_string()))?
            }
            None => MonitorConfig::default(),
        };

        if let Ok(token) = std::env::var("APIFY_TOKEN") {
            if !token.trim().is_empty() {
                cfg.scraper.token = token.trim().to_string();
            }
        }
        if let Ok(url) = std::env::var("RATE_SCOUT_WEBHOOK_URL") {
            if !url.trim().is_empty() {
                cfg.notify.webhook_url = Some(url.trim().to_string());
            }
        }

        Ok(cfg)
    }
}

// ── Defaults ──────────────────────────────────────────────────────────

fn default_base_url() -> String {
    "https://api.apify.com".to_string()
}

fn default_actor() -> String {
    "apify~booking-scraper".to_string()
}

fn default_currency() -> String {
    "EUR".to_string()
}

fn default_poll_interval() -> u64 {
    5
}

fn default_job_timeout() -> u64 {
    180
}

fn default_max_concurrent() -> usize {
    4
}

fn default_min_spacing() -> u64 {
    250
}

fn default_retry_backoff() -> u64 {
    1000
}

fn default_snapshot_dir() -> PathBuf {
    PathBuf::from("snapshots")
}

fn default_rooms() -> HashMap<String, OccupancyRequest> {
    HashMap::from([
        (
            "double".to_string(),
            OccupancyRequest {
                adults: 2,
                children: 0,
            },
        ),
        (
            "triple".to_string(),
            OccupancyRequest {
                adults: 3,
                children: 0,
            },
        ),
        (
            "family".to_string(),
            OccupancyRequest {
                adults: 2,
                children: 2,
            },
        ),
        (
            "single".to_string(),
            OccupancyRequest {
                adults: 1,
                children: 0,
            },
        ),
    ])
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            actor: default_actor(),
            token: String::new(),
            currency: default_currency(),
            poll_interval_secs: default_poll_interval(),
            job_timeout_secs: default_job_timeout(),
        }
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            min_spacing_ms: default_min_spacing(),
            retries: 0,
            retry_backoff_ms: default_retry_backoff(),
        }
    }
}

impl Default for OccupancyConfig {
    fn default() -> Self {
        Self {
            rooms: default_rooms(),
        }
    }
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            dir: default_snapshot_dir(),
        }
    }
}
