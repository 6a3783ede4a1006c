pub mod apify;
pub mod runner;
pub mod traits;
pub mod types;

pub use apify::ApifyClient;
pub use runner::JobRunner;
pub use traits::JobClient;
pub use types::ScrapeJob;
