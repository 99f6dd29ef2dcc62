use std::collections::HashSet;

use chrono::{Days, NaiveDate};
use tracing::{error, info};

use crate::config::MAX_LOOKBACK_DAYS;
use crate::store::FloorsheetStore;

/// Dates in the trailing window `today - (target - 1) ..= today` that are not
/// in `existing`, oldest first. The window never reaches back more than
/// `max_lookback` days.
pub fn missing_dates(
    existing: &HashSet<NaiveDate>,
    today: NaiveDate,
    target: u32,
    max_lookback: u32,
) -> Vec<NaiveDate> {
    let span = target.min(max_lookback);
    let mut missing = Vec::with_capacity(span as usize);

    for offset in 0..span {
        let Some(date) = today.checked_sub_days(Days::new(u64::from(offset))) else {
            break;
        };
        if !existing.contains(&date) {
            missing.push(date);
        }
    }

    missing.reverse();
    missing
}

/// Dates in the last `target` calendar days not yet in the store, oldest first.
/// A failed store query yields an empty list so the run becomes a no-op.
pub async fn get_missing_dates<St: FloorsheetStore>(
    store: &St,
    today: NaiveDate,
    target: u32,
) -> Vec<NaiveDate> {
    let existing: HashSet<NaiveDate> = match store.distinct_dates().await {
        Ok(dates) => dates.into_iter().collect(),
        Err(e) => {
            error!("Could not load stored dates, skipping backfill: {e}");
            return Vec::new();
        }
    };

    let missing = missing_dates(&existing, today, target, MAX_LOOKBACK_DAYS);
    info!(
        stored = existing.len(),
        missing = missing.len(),
        target,
        "Backfill window: {} of {target} dates missing",
        missing.len(),
    );
    missing
}
