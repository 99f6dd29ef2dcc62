//! Persistence backends for floorsheet rows.

pub mod rest;
pub mod sqlite;

use std::future::Future;

use chrono::NaiveDate;

use crate::error::Result;
use crate::types::TradeRecord;

pub use rest::RestStore;
pub use sqlite::SqliteStore;

/// The three store capabilities a sync run needs.
pub trait FloorsheetStore: Send + Sync {
    /// Insert rows, silently skipping any whose `contract_id` already exists.
    /// Returns how many rows the store reports as written.
    fn insert_ignore(&self, rows: &[TradeRecord]) -> impl Future<Output = Result<u64>> + Send;

    /// Every distinct trade date currently stored.
    fn distinct_dates(&self) -> impl Future<Output = Result<Vec<NaiveDate>>> + Send;

    /// Delete rows dated more than `retention_days` before today.
    fn prune(&self, retention_days: u32) -> impl Future<Output = Result<()>> + Send;
}
