use async_trait::async_trait;

use crate::error::Error;
use crate::scrapers::types::ScrapeJob;

/// Common trait for scraping-service backends.
/// The pipeline and its tests depend only on this seam, so the external
/// service stays swappable (and mockable).
#[async_trait]
pub trait JobClient: Send + Sync {
    /// Run one scrape job to completion and return its raw result payload.
    async fn fetch_listing(&self, job: &ScrapeJob) -> Result<serde_json::Value, Error>;

    /// Name of the backing service, for logs.
    fn service_name(&self) -> &'static str;
}
