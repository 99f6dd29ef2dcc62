use chrono::NaiveDate;
use tracing::info;

use crate::config::RunMode;
use crate::fetcher::{fetch_day, FloorsheetSource};
use crate::reconciler::get_missing_dates;
use crate::retention;
use crate::store::FloorsheetStore;
use crate::types::RunSummary;

/// One fetch-and-persist cycle: resolve dates, fetch each in order, prune.
pub struct FloorsheetSync<S, St> {
    source: S,
    store: St,
    mode: RunMode,
    retention_days: u32,
}

impl<S, St> FloorsheetSync<S, St>
where
    S: FloorsheetSource,
    St: FloorsheetStore,
{
    pub fn new(source: S, store: St, mode: RunMode, retention_days: u32) -> Self {
        Self { source, store, mode, retention_days }
    }

    /// Dates this run will fetch, oldest first.
    pub async fn resolve_dates(&self, today: NaiveDate) -> Vec<NaiveDate> {
        match self.mode {
            RunMode::Daily => vec![today],
            RunMode::Backfill(target) => get_missing_dates(&self.store, today, target).await,
        }
    }

    /// Runs to completion. Per-date failures are contained in `fetch_day`;
    /// the prune step always runs, once.
    pub async fn run(&self, today: NaiveDate) -> RunSummary {
        info!(mode = %self.mode, %today, "Floorsheet sync starting in {} mode", self.mode);

        let dates = self.resolve_dates(today).await;
        let mut summary = RunSummary::default();

        for date in dates {
            info!("Fetching: {date}");
            let day = fetch_day(&self.source, &self.store, date).await;
            summary.record_day(date, &day);
        }

        summary.pruned = retention::prune(&self.store, self.retention_days).await;
        summary
    }

    #[cfg(test)]
    pub fn store(&self) -> &St {
        &self.store
    }
}
