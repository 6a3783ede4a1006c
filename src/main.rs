use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::NaiveDate;
use clap::Parser;
use rust_decimal::Decimal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use rate_scout::config::MonitorConfig;
use rate_scout::models::{ComparisonRow, Role, RoomType, StayWindow};
use rate_scout::notify::WebhookNotifier;
use rate_scout::pipeline::Monitor;
use rate_scout::scrapers::{ApifyClient, JobRunner};
use rate_scout::snapshot::JsonSnapshotStore;
use rate_scout::source;

/// Competitor booking-price monitor
#[derive(Parser)]
#[command(name = "rate-scout", about = "Competitor booking-price monitor")]
struct Cli {
    /// CSV sheet with competitor properties.
    #[arg(long, default_value = "competitors.csv")]
    sheet: PathBuf,

    /// Restrict the run to one unit.
    #[arg(long)]
    unit: Option<String>,

    /// Restrict the run to one room type.
    #[arg(long)]
    room_type: Option<String>,

    /// Check-in date (YYYY-MM-DD).
    #[arg(long)]
    check_in: NaiveDate,

    /// Check-out date (YYYY-MM-DD).
    #[arg(long)]
    check_out: NaiveDate,

    /// TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Skip the change-notification webhook.
    #[arg(long)]
    no_notify: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "rate_scout=info".into()),
        )
        .init();

    let cli = Cli::parse();

    // Validate the stay window before anything touches the network.
    let stay = StayWindow::new(cli.check_in, cli.check_out)
        .context("Invalid check-in/check-out dates")?;

    let cfg = MonitorConfig::load(cli.config.as_deref()).context("Failed to load config")?;

    let rows = source::load_rows_from_path(&cli.sheet)
        .with_context(|| format!("Failed to load sheet {}", cli.sheet.display()))?;
    let room_type = cli.room_type.as_deref().map(RoomType::parse);
    let rows = source::filter_rows(rows, cli.unit.as_deref(), room_type.as_ref());

    if rows.is_empty() {
        warn!("no property rows match the selection, nothing to do");
        return Ok(());
    }

    info!(
        "comparing {} properties, {} -> {} ({} nights)",
        rows.len(),
        stay.check_in(),
        stay.check_out(),
        stay.nights()
    );

    let client = Arc::new(ApifyClient::new(cfg.scraper.clone())?);
    let runner = JobRunner::new(
        client,
        cfg.runner.clone(),
        cfg.scraper.currency.clone(),
        Duration::from_secs(cfg.scraper.job_timeout_secs),
    )
    .with_progress(Arc::new(|done, total| {
        info!("fetched {}/{} properties", done, total);
    }));
    let store = Box::new(JsonSnapshotStore::new(cfg.snapshot.dir.clone()));
    let monitor = Monitor::new(runner, store, cfg.occupancy.clone(), cfg.comparison.clone());

    let report = monitor.run(rows, stay).await?;

    for (key, rows) in &report.groups {
        println!("\n=== {} ===", key);
        print_group(rows, &cfg.scraper.currency);
    }

    for (key, reason) in &report.skipped_groups {
        warn!("group {} skipped: {}", key, reason);
    }

    if report.changes.is_empty() {
        println!("\nNo price changes since the last run.");
    } else {
        println!("\n{}", WebhookNotifier::format_message(&report.changes));
    }

    if !cli.no_notify && !report.changes.is_empty() {
        match &cfg.notify.webhook_url {
            Some(url) => {
                let notifier = WebhookNotifier::new(url.clone())?;
                if let Err(e) = notifier.notify(&report.changes).await {
                    warn!("notification failed: {}", e);
                }
            }
            None => info!("no webhook configured, skipping notification"),
        }
    }

    Ok(())
}

fn print_group(rows: &[ComparisonRow], currency: &str) {
    println!(
        "{:<30} {:<10} {:>14} {:>10} {:>8}",
        "Property", "Role", "Price/night", "vs own", "%"
    );
    for row in rows {
        let role = match row.role {
            Role::Own => "own",
            Role::Competitor => "competitor",
        };
        let marker = if row.cheapest_competitor { " *" } else { "" };
        println!(
            "{:<30} {:<10} {:>14} {:>10} {:>8}{}",
            row.property_name,
            role,
            format_price(row.price_per_night, currency),
            format_diff(row.diff_vs_own_absolute),
            format_diff(row.diff_vs_own_percent),
            marker,
        );
    }
}

fn format_price(price: Option<Decimal>, currency: &str) -> String {
    match price {
        Some(value) => format!("{value} {currency}"),
        None => "unavailable".to_string(),
    }
}

fn format_diff(diff: Option<Decimal>) -> String {
    match diff {
        Some(value) if value.is_sign_positive() && !value.is_zero() => format!("+{value}"),
        Some(value) => format!("{value}"),
        None => "-".to_string(),
    }
}
