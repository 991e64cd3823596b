//! Operational jobs CLI for Payrail.
//!
//! Usage:
//!   jobs rebuild                         - Run one full index rebuild
//!   jobs rebuild --loop                  - Rebuild on the configured interval
//!   jobs export <format> <start> <end>   - Materialize one export file
//!
//! Formats are `nacha`, `wire`, or `checks`; `<start>` and `<end>` are
//! `YYYY-MM-DD` dates bounding the window inclusively.
//!
//! Tenant request data is external to this service; the CLI hydrates an
//! in-memory tenant store from the JSON snapshot named by `TENANT_FEED`
//! (an array of request records). The central index and check sequence
//! counter live in Postgres, addressed by `DATABASE_URL` via config.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use payrail_core::crypto::FieldCodec;
use payrail_core::index::{IndexMaintainer, InMemoryTenantStore};
use payrail_core::rates::{CachedRates, RateProvider};
use payrail_core::request::request_from_feed;
use payrail_db::{CheckSequenceRepository, IndexRowRepository};
use payrail_shared::{AppConfig, AppError};
use payrail_svc::{scheduler, ExportFormat, ExportRunner, HttpRateProvider};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "payrail=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;
    let args: Vec<String> = std::env::args().skip(1).collect();

    match args.first().map(String::as_str) {
        Some("rebuild") => {
            let looped = args.get(1).map(String::as_str) == Some("--loop");
            run_rebuild(&config, looped).await
        }
        Some("export") => {
            let [_, format, start, end] = args.as_slice() else {
                bail!("Usage: jobs export <nacha|wire|checks> <start> <end>");
            };
            run_export(&config, format, start, end).await
        }
        _ => bail!("Usage: jobs <rebuild [--loop] | export <format> <start> <end>>"),
    }
}

async fn run_rebuild(config: &AppConfig, looped: bool) -> anyhow::Result<()> {
    let tenants = Arc::new(load_tenant_feed()?);
    let db = payrail_db::connect(&config.database.url).await?;
    let index = Arc::new(IndexRowRepository::new(db));

    let maintainer = Arc::new(IndexMaintainer::new(
        tenants,
        index,
        config.index.tenant_page_size,
        config.index.request_page_size,
    ));

    if looped {
        let every = Duration::from_secs(config.index.rebuild_interval_secs);
        info!(interval_secs = every.as_secs(), "starting rebuild loop");
        scheduler::run_rebuild_loop(maintainer, every).await
    } else {
        let stats = scheduler::rebuild_once(&maintainer).await?;
        println!(
            "Rebuilt index: {} rows from {} tenants",
            stats.rows_indexed, stats.tenants_scanned
        );
        Ok(())
    }
}

async fn run_export(
    config: &AppConfig,
    format: &str,
    start: &str,
    end: &str,
) -> anyhow::Result<()> {
    let format: ExportFormat = format.parse().map_err(|e: String| anyhow::anyhow!(e))?;
    let start = day_start(start)?;
    let end = day_end(end)?;

    let tenants = Arc::new(load_tenant_feed()?);
    let db = payrail_db::connect(&config.database.url).await?;
    let index = Arc::new(IndexRowRepository::new(db.clone()));
    let counter = Arc::new(CheckSequenceRepository::new(db));
    let codec = Arc::new(FieldCodec::from_config(&config.encryption));

    let rates: Option<Arc<dyn RateProvider>> = match HttpRateProvider::new(&config.rates) {
        Ok(provider) => Some(Arc::new(CachedRates::new(
            Arc::new(provider),
            Duration::from_secs(config.rates.cache_ttl_secs),
        ))),
        Err(e) => {
            warn!(error = %e, "rate provider unavailable, converted amounts omitted");
            None
        }
    };

    let runner = ExportRunner::new(
        tenants,
        index,
        codec,
        counter,
        rates,
        config.exports.clone(),
    );
    match runner.run(format, start, end).await {
        Ok(path) => {
            println!("Wrote {}", path.display());
            Ok(())
        }
        Err(e) => {
            let app = AppError::from(e);
            tracing::error!(
                code = app.error_code(),
                retryable = app.is_retryable(),
                "export failed"
            );
            Err(app.into())
        }
    }
}

/// Loads the external tenant snapshot named by `TENANT_FEED`.
fn load_tenant_feed() -> anyhow::Result<InMemoryTenantStore> {
    let path = std::env::var("TENANT_FEED").context("TENANT_FEED must be set in environment")?;
    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("Cannot read tenant feed {path}"))?;
    let records: Vec<serde_json::Value> =
        serde_json::from_str(&raw).with_context(|| format!("Malformed tenant feed {path}"))?;

    // Status slugs in the snapshot may be historical; hydration remaps
    // them to the current vocabulary record by record.
    let store = InMemoryTenantStore::new();
    let count = records.len();
    for record in records {
        store.put(request_from_feed(record).with_context(|| format!("Bad record in {path}"))?);
    }
    info!(requests = count, feed = %path, "tenant feed loaded");
    Ok(store)
}

fn day_start(date: &str) -> anyhow::Result<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .with_context(|| format!("Invalid date {date}, expected YYYY-MM-DD"))?;
    Ok(date.and_time(NaiveTime::MIN).and_utc())
}

fn day_end(date: &str) -> anyhow::Result<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .with_context(|| format!("Invalid date {date}, expected YYYY-MM-DD"))?;
    let end = date
        .and_hms_opt(23, 59, 59)
        .context("date has no end of day")?;
    Ok(end.and_utc())
}
