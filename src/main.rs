//! Flylat collector: daily airline data collection.
//!
//! Single-binary Tokio application that:
//! 1. Collects each airline's company-data document into daily/monthly history
//! 2. Fetches each airline's routes
//! 3. Enriches route endpoints with airport metadata (cache first, airportdb on miss)
//! 4. Writes one route snapshot per airline and persists the airport cache

mod config;
mod journal;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use clap::Parser;
use serde_json::json;
use tracing::{error, info, warn};

use airportdb_client::AirportDbClient;
use common::config::CollectorConfig;
use common::{AirlineList, EntityId, Error};
use enrichment::{
    enrich_airlines, AirportCache, AirportResolver, CacheStart, CacheStore, FetchCoordinator,
    FileCacheStore, RouteEnrichmentPipeline,
};
use flylat_client::FlylatClient;
use journal::RunJournal;
use snapshot_store::{CompanyDataStore, SnapshotStore};

/// Flylat airline data collector
#[derive(Parser)]
#[command(name = "flylat-collector", about = "Collect flylat company data and enriched routes")]
struct Cli {
    /// Only collect company data.
    #[arg(long, conflicts_with = "routes_only")]
    company_only: bool,

    /// Only collect and enrich routes.
    #[arg(long)]
    routes_only: bool,

    /// Restrict the run to these airline ids instead of the airline list.
    #[arg(long = "airline", value_name = "ID")]
    airlines: Vec<EntityId>,
}

impl Cli {
    fn collects_company(&self) -> bool {
        !self.routes_only
    }

    fn collects_routes(&self) -> bool {
        !self.company_only
    }
}

/// Totals for the route phase, reported in the run summary.
#[derive(Debug, Default)]
struct RouteSummary {
    succeeded: usize,
    failed: usize,
    missing_airports: usize,
    external_lookups: usize,
    cache_size: usize,
    cache_saved: bool,
}

fn load_airline_ids(path: &Path) -> Result<Vec<EntityId>, Error> {
    let contents = std::fs::read(path)
        .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
    let list: AirlineList = serde_json::from_slice(&contents).map_err(|e| {
        Error::Config(format!(
            "{} is not an airline list: {}",
            path.display(),
            e
        ))
    })?;

    if list.skipped() > 0 {
        warn!("Skipped {} airline entries without an id", list.skipped());
    }
    Ok(list.ids())
}

#[tokio::main]
async fn main() {
    // Initialize logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "flylat_collector=info,flylat_client=info,airportdb_client=info,enrichment=info,snapshot_store=info".into()
            }),
        )
        .with_target(true)
        .init();

    let cli = Cli::parse();

    info!("Flylat collector starting at {}", Utc::now().to_rfc3339());

    // Load configuration.
    let cfg = match config::load_config(cli.collects_routes()) {
        Ok(c) => c,
        Err(e) => {
            error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let mut journal = match RunJournal::open(cfg.log_dir.clone()) {
        Ok(j) => j,
        Err(e) => {
            error!("Failed to initialize run journal: {}", e);
            std::process::exit(1);
        }
    };
    info!(
        "Run {} journal: {}",
        journal.run_id(),
        journal.path().display()
    );

    let airlines = if cli.airlines.is_empty() {
        match load_airline_ids(&cfg.airlines_path()) {
            Ok(ids) => ids,
            Err(e) => {
                error!("{}", e);
                journal.record("run_aborted", json!({ "error": e.to_string() }));
                std::process::exit(1);
            }
        }
    } else {
        cli.airlines.clone()
    };
    info!("Airlines: {}", airlines.len());

    journal.record(
        "run_start",
        json!({
            "airlines": airlines.len(),
            "company_data": cli.collects_company(),
            "routes": cli.collects_routes(),
            "max_concurrent_fetches": cfg.max_concurrent_fetches,
            "data_dir": cfg.data_dir.display().to_string()
        }),
    );

    let timeout = Duration::from_secs(cfg.http_timeout_secs);
    let flylat = match FlylatClient::new(&cfg.flylat_base_url, timeout) {
        Ok(c) => c,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    let mut exit_code = 0;

    if cli.collects_company() {
        run_company_collection(&cfg, &flylat, airlines.clone(), &mut journal).await;
    }

    if cli.collects_routes() {
        match run_route_collection(&cfg, &flylat, airlines.clone(), &mut journal).await {
            Ok(summary) => {
                info!(
                    "Routes: {} airlines ok, {} failed, missing airports: {}, airportdb lookups: {}, cached airports: {}",
                    summary.succeeded,
                    summary.failed,
                    summary.missing_airports,
                    summary.external_lookups,
                    summary.cache_size
                );
                journal.record(
                    "run_summary",
                    json!({
                        "airlines": airlines.len(),
                        "succeeded": summary.succeeded,
                        "failed": summary.failed,
                        "missing_airports": summary.missing_airports,
                        "external_lookups": summary.external_lookups,
                        "cache_size": summary.cache_size,
                        "cache_saved": summary.cache_saved
                    }),
                );
                if !summary.cache_saved {
                    exit_code = 1;
                }
            }
            Err(e) => {
                error!("Route collection failed: {}", e);
                journal.record("run_aborted", json!({ "error": e.to_string() }));
                exit_code = 1;
            }
        }
    }

    info!("Flylat collector finished in {}s.", journal.elapsed_secs());
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

// ── Collection phases ───────────────────────────────────────────────

async fn run_company_collection(
    cfg: &CollectorConfig,
    flylat: &FlylatClient,
    airlines: Vec<EntityId>,
    journal: &mut RunJournal,
) {
    // The source publishes the previous day's figures.
    let collected_on =
        (Utc::now() - chrono::Duration::hours(cfg.collection_offset_hours)).date_naive();
    info!("Collecting company data for {}", collected_on);

    let coordinator = FetchCoordinator::new(cfg.max_concurrent_fetches);
    let client = flylat.clone();
    let outcome = coordinator
        .run(airlines, move |id| {
            let client = client.clone();
            async move {
                client
                    .fetch_company_data(id)
                    .await
                    .map_err(|e| Error::entity_fetch(id, e))
            }
        })
        .await;

    for failure in &outcome.failures {
        journal.record(
            "entity_failed",
            json!({
                "phase": "company_fetch",
                "entity_id": failure.entity_id,
                "reason": &failure.reason
            }),
        );
    }

    let store = CompanyDataStore::new(&cfg.data_dir);
    let mut written = 0usize;
    let mut monthly = 0usize;
    for (id, data) in &outcome.succeeded {
        match store.record(*id, collected_on, data) {
            Ok(wrote_monthly) => {
                written += 1;
                if wrote_monthly {
                    monthly += 1;
                }
            }
            Err(e) => {
                warn!("Failed to store company data for {}: {}", id, e);
                journal.record(
                    "entity_failed",
                    json!({
                        "phase": "company_write",
                        "entity_id": id,
                        "reason": e.to_string()
                    }),
                );
            }
        }
    }

    info!(
        "Company data: {} stored ({} monthly), {} failed",
        written,
        monthly,
        outcome.total() - written
    );
    journal.record(
        "company_summary",
        json!({
            "date": collected_on.to_string(),
            "stored": written,
            "monthly": monthly,
            "failed": outcome.total() - written
        }),
    );
}

async fn run_route_collection(
    cfg: &CollectorConfig,
    flylat: &FlylatClient,
    airlines: Vec<EntityId>,
    journal: &mut RunJournal,
) -> Result<RouteSummary, Error> {
    let store = FileCacheStore::new(cfg.airport_cache_path());
    let (cache, start) = AirportCache::load_or_empty(&store);
    if let Some(e) = start.error() {
        journal.record(
            "cache_load_failed",
            json!({ "error": e.to_string(), "save_allowed": start.allows_save() }),
        );
    }

    let airportdb = AirportDbClient::new(
        &cfg.airportdb_base_url,
        cfg.airportdb_api_token.clone(),
        Duration::from_secs(cfg.http_timeout_secs),
        cfg.airportdb_requests_per_sec,
    )?;
    let resolver = Arc::new(AirportResolver::new(cache.clone(), Arc::new(airportdb)));
    let pipeline = RouteEnrichmentPipeline::new(resolver.clone());
    let coordinator = FetchCoordinator::new(cfg.max_concurrent_fetches);

    let outcome = enrich_airlines(
        &coordinator,
        Arc::new(flylat.clone()),
        pipeline,
        airlines,
    )
    .await;

    let mut summary = RouteSummary::default();

    for failure in &outcome.failures {
        summary.failed += 1;
        journal.record(
            "entity_failed",
            json!({
                "phase": "route_fetch",
                "entity_id": failure.entity_id,
                "reason": &failure.reason
            }),
        );
    }

    let snapshots = SnapshotStore::new(&cfg.data_dir);
    for (id, (snapshot, missing)) in &outcome.succeeded {
        summary.missing_airports += missing;
        match snapshots.write_route_snapshot(snapshot) {
            Ok(path) => {
                summary.succeeded += 1;
                info!(
                    "Data has been retrieved for airline {} ({} routes, {} unresolved endpoints)",
                    id,
                    snapshot.routes.len(),
                    missing
                );
                journal.record(
                    "snapshot_written",
                    json!({
                        "entity_id": id,
                        "routes": snapshot.routes.len(),
                        "missing_airports": missing,
                        "path": path.display().to_string()
                    }),
                );
            }
            Err(e) => {
                summary.failed += 1;
                warn!("Failed to write snapshot for airline {}: {}", id, e);
                journal.record(
                    "entity_failed",
                    json!({
                        "phase": "snapshot_write",
                        "entity_id": id,
                        "reason": e.to_string()
                    }),
                );
            }
        }
    }

    summary.external_lookups = resolver.external_calls();
    summary.cache_size = cache.len();

    // Every task has joined; the cache is no longer shared.
    summary.cache_saved = persist_cache(&cache, &store, &start, journal);

    Ok(summary)
}

/// Save the cache at the end of a run. Returns whether it was written.
fn persist_cache(
    cache: &AirportCache,
    store: &dyn CacheStore,
    start: &CacheStart,
    journal: &mut RunJournal,
) -> bool {
    if !start.allows_save() {
        error!(
            "Not saving airport cache: {} could not be read at startup",
            store.describe()
        );
        journal.record(
            "cache_save_skipped",
            json!({ "airports": cache.len(), "store": store.describe() }),
        );
        return false;
    }

    match cache.save(store) {
        Ok(count) => {
            journal.record("cache_saved", json!({ "airports": count }));
            true
        }
        Err(e) => {
            error!("{}", e);
            journal.record("cache_save_failed", json!({ "error": e.to_string() }));
            false
        }
    }
}
