use crate::error::{AppError, Result};

pub const FLOORSHEET_API_URL: &str = "https://sharehubnepal.com/live/api/v2/floorsheet";

/// Records requested per API page (`Size` query parameter).
pub const PAGE_SIZE: u32 = 100;

/// Rows per store write. Keeps each request under the store's payload limit.
pub const WRITE_BATCH_SIZE: usize = 200;

/// Per-request timeout for the floorsheet API and the REST store (seconds).
pub const REQUEST_TIMEOUT_SECS: u64 = 15;

/// Safety cap on the backfill window, in days.
pub const MAX_LOOKBACK_DAYS: u32 = 60;

/// Default retention window handed to the pruner (calendar days).
pub const RETENTION_DAYS: u32 = 21;

pub const FLOORSHEET_TABLE: &str = "floorsheet";
pub const CONFLICT_KEY: &str = "contractId";
pub const DISTINCT_DATES_RPC: &str = "get_distinct_floorsheet_dates";
pub const CLEANUP_RPC: &str = "cleanup_old_floorsheet";

/// Today's calendar date in UTC; every window and cutoff is computed from it.
pub fn utc_today() -> chrono::NaiveDate {
    chrono::Utc::now().date_naive()
}

/// Which dates a run fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Today only.
    Daily,
    /// Dates in the last N calendar days that are missing from the store.
    Backfill(u32),
}

impl RunMode {
    pub fn from_backfill(days: u32) -> Self {
        if days > 0 {
            RunMode::Backfill(days)
        } else {
            RunMode::Daily
        }
    }
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunMode::Daily => write!(f, "daily"),
            RunMode::Backfill(n) => write!(f, "backfill({n})"),
        }
    }
}

/// Credentials for a PostgREST-compatible store (Supabase).
#[derive(Debug, Clone)]
pub struct RestStoreConfig {
    pub url: String,
    pub service_key: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub log_level: String,
    /// SQLite file used when no REST store is configured (DB_PATH)
    pub db_path: String,
    /// Set when SUPABASE_URL is present; takes precedence over `db_path`
    pub rest_store: Option<RestStoreConfig>,
    /// Backfill target in days; 0 selects daily mode (BACKFILL)
    pub backfill: u32,
    /// Rows older than this many days are pruned after each run (RETENTION_DAYS)
    pub retention_days: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable source.
    pub fn from_lookup<F>(get: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let rest_store = match get("SUPABASE_URL").filter(|s| !s.trim().is_empty()) {
            Some(url) => {
                let service_key = get("SUPABASE_SERVICE_KEY")
                    .filter(|s| !s.trim().is_empty())
                    .ok_or_else(|| {
                        AppError::Config(
                            "SUPABASE_SERVICE_KEY must be set when SUPABASE_URL is set".to_string(),
                        )
                    })?;
                Some(RestStoreConfig {
                    url: url.trim().trim_end_matches('/').to_string(),
                    service_key,
                })
            }
            None => None,
        };

        Ok(Self {
            api_url: get("FLOORSHEET_API_URL").unwrap_or_else(|| FLOORSHEET_API_URL.to_string()),
            log_level: get("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            db_path: get("DB_PATH").unwrap_or_else(|| "floorsheet.db".to_string()),
            rest_store,
            backfill: parse_days(get("BACKFILL"), "BACKFILL", 0)?,
            retention_days: parse_days(get("RETENTION_DAYS"), "RETENTION_DAYS", RETENTION_DAYS)?,
        })
    }

    pub fn mode(&self) -> RunMode {
        RunMode::from_backfill(self.backfill)
    }
}

fn parse_days(value: Option<String>, name: &str, default: u32) -> Result<u32> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(default),
        Some(v) => v
            .parse::<u32>()
            .map_err(|_| AppError::Config(format!("{name} must be a non-negative integer, got {v:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|k| vars.get(k).cloned())
    }

    #[test]
    fn today_is_the_utc_date() {
        let before = chrono::Utc::now().date_naive();
        let today = utc_today();
        let after = chrono::Utc::now().date_naive();
        assert!(before <= today && today <= after);
    }

    #[test]
    fn unset_backfill_is_daily() {
        let cfg = config_from(&[]).unwrap();
        assert_eq!(cfg.mode(), RunMode::Daily);
        assert_eq!(cfg.retention_days, RETENTION_DAYS);
        assert_eq!(cfg.api_url, FLOORSHEET_API_URL);
        assert!(cfg.rest_store.is_none());
    }

    #[test]
    fn zero_backfill_is_daily() {
        let cfg = config_from(&[("BACKFILL", "0")]).unwrap();
        assert_eq!(cfg.mode(), RunMode::Daily);
    }

    #[test]
    fn positive_backfill_selects_backfill_mode() {
        let cfg = config_from(&[("BACKFILL", "5")]).unwrap();
        assert_eq!(cfg.mode(), RunMode::Backfill(5));
    }

    #[test]
    fn malformed_backfill_is_rejected() {
        let err = config_from(&[("BACKFILL", "five")]).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn rest_store_requires_service_key() {
        let err = config_from(&[("SUPABASE_URL", "https://x.supabase.co")]).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));

        let cfg = config_from(&[
            ("SUPABASE_URL", "https://x.supabase.co/"),
            ("SUPABASE_SERVICE_KEY", "secret"),
        ])
        .unwrap();
        let rest = cfg.rest_store.unwrap();
        assert_eq!(rest.url, "https://x.supabase.co");
        assert_eq!(rest.service_key, "secret");
    }
}
