mod config;
mod error;
mod fetcher;
mod persister;
mod reconciler;
mod retention;
mod serde_util;
mod store;
mod sync;
mod types;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::{utc_today, Config};
use crate::error::Result;
use crate::fetcher::FloorsheetClient;
use crate::store::{FloorsheetStore, RestStore, SqliteStore};
use crate::sync::FloorsheetSync;
use crate::types::RunSummary;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

/// Only bootstrap failures surface here; everything after is logged and absorbed.
async fn run(cfg: Config) -> Result<()> {
    let source = FloorsheetClient::new(&cfg.api_url)?;

    let summary = match &cfg.rest_store {
        Some(rest) => {
            info!("Store: REST at {}", rest.url);
            sync_with(&cfg, source, RestStore::new(rest)?).await
        }
        None => {
            let store = SqliteStore::connect(&cfg.db_path).await?;
            info!("Store: SQLite at {}", cfg.db_path);
            sync_with(&cfg, source, store).await
        }
    };

    log_summary(&summary);
    Ok(())
}

async fn sync_with<St: FloorsheetStore>(
    cfg: &Config,
    source: FloorsheetClient,
    store: St,
) -> RunSummary {
    let sync = FloorsheetSync::new(source, store, cfg.mode(), cfg.retention_days);
    sync.run(utc_today()).await
}

fn log_summary(s: &RunSummary) {
    info!(
        event = "SYNC_COMPLETE",
        dates = s.dates.len(),
        dates_aborted = s.dates_aborted,
        pages = s.pages,
        rows = s.rows_seen,
        rejected = s.rows_rejected,
        inserted = s.persist.inserted,
        failed_batches = s.persist.failed_batches,
        pruned = s.pruned,
        "Floorsheet sync complete | dates: {} ({} aborted) | pages: {} | rows: {} | inserted: {} | failed batches: {} | pruned: {}",
        s.dates.len(),
        s.dates_aborted,
        s.pages,
        s.rows_seen,
        s.persist.inserted,
        s.persist.failed_batches,
        s.pruned,
    );
}
