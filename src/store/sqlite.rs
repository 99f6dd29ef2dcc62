use chrono::{Days, NaiveDate};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::{info, warn};

use super::FloorsheetStore;
use crate::config::utc_today;
use crate::error::Result;
use crate::types::TradeRecord;

const DATE_FMT: &str = "%Y-%m-%d";
const TIME_FMT: &str = "%H:%M:%S";

/// Local SQLite store. `contract_id` is the primary key, so `INSERT OR IGNORE`
/// gives the insert-or-skip conflict policy natively.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if needed) the database file and apply migrations.
    pub async fn connect(path: &str) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;
        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: SqlitePool) -> Result<Self> {
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    /// Delete every row dated strictly before `cutoff`. Returns rows removed.
    pub async fn prune_before(&self, cutoff: NaiveDate) -> Result<u64> {
        let res = sqlx::query("DELETE FROM floorsheet WHERE date < ?")
            .bind(cutoff.format(DATE_FMT).to_string())
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected())
    }

    #[cfg(test)]
    pub async fn in_memory() -> Result<Self> {
        // One connection: every new connection to :memory: is a fresh database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        Self::from_pool(pool).await
    }

    #[cfg(test)]
    pub async fn count(&self) -> Result<i64> {
        Ok(sqlx::query_scalar("SELECT COUNT(*) FROM floorsheet")
            .fetch_one(&self.pool)
            .await?)
    }
}

impl FloorsheetStore for SqliteStore {
    async fn insert_ignore(&self, rows: &[TradeRecord]) -> Result<u64> {
        if rows.is_empty() {
            return Ok(0);
        }

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "INSERT OR IGNORE INTO floorsheet (
                contract_id, date, time, symbol,
                buyer_member_id, seller_member_id,
                quantity, rate, amount
            ) ",
        );
        qb.push_values(rows, |mut b, r| {
            b.push_bind(r.contract_id.clone())
                .push_bind(r.date.format(DATE_FMT).to_string())
                .push_bind(r.time.format(TIME_FMT).to_string())
                .push_bind(r.symbol.clone())
                .push_bind(r.buyer_member_id.clone())
                .push_bind(r.seller_member_id.clone())
                .push_bind(r.quantity)
                .push_bind(r.rate)
                .push_bind(r.amount);
        });

        let res = qb.build().execute(&self.pool).await?;
        Ok(res.rows_affected())
    }

    async fn distinct_dates(&self) -> Result<Vec<NaiveDate>> {
        let raw: Vec<String> =
            sqlx::query_scalar("SELECT DISTINCT date FROM floorsheet ORDER BY date")
                .fetch_all(&self.pool)
                .await?;

        Ok(raw
            .iter()
            .filter_map(|s| match NaiveDate::parse_from_str(s, DATE_FMT) {
                Ok(d) => Some(d),
                Err(e) => {
                    warn!("Skipping unparseable stored date {s:?}: {e}");
                    None
                }
            })
            .collect())
    }

    async fn prune(&self, retention_days: u32) -> Result<()> {
        let today = utc_today();
        let cutoff = today
            .checked_sub_days(Days::new(u64::from(retention_days)))
            .unwrap_or(NaiveDate::MIN);
        let removed = self.prune_before(cutoff).await?;
        info!(removed, %cutoff, "Pruned {removed} rows dated before {cutoff}");
        Ok(())
    }
}
