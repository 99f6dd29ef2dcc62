use std::time::Duration;

use chrono::NaiveDate;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use super::FloorsheetStore;
use crate::config::{
    RestStoreConfig, CLEANUP_RPC, CONFLICT_KEY, DISTINCT_DATES_RPC, FLOORSHEET_TABLE,
    REQUEST_TIMEOUT_SECS,
};
use crate::error::{AppError, Result};
use crate::types::TradeRecord;

/// PostgREST-compatible store (Supabase). Writes go through the table
/// endpoint with `ignore-duplicates` resolution and echo back only the keys
/// actually inserted; queries and cleanup go
/// through RPC functions (see `sql/supabase.sql`).
#[derive(Clone)]
pub struct RestStore {
    client: Client,
    base_url: String,
    service_key: String,
}

#[derive(Debug, Deserialize)]
struct DateRow {
    d: NaiveDate,
}

impl RestStore {
    pub fn new(cfg: &RestStoreConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            base_url: cfg.url.trim_end_matches('/').to_string(),
            service_key: cfg.service_key.clone(),
        })
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.client
            .post(format!("{}/rest/v1/{}", self.base_url, path))
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }

    fn rpc(&self, name: &str) -> RequestBuilder {
        self.post(&format!("rpc/{name}"))
    }
}

/// Map a non-success response to `AppError::Store`, keeping the body text
/// so duplicate-key rejections can be recognised by the caller.
async fn check(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or(body);
    Err(AppError::Store { status: status.as_u16(), message })
}

impl FloorsheetStore for RestStore {
    async fn insert_ignore(&self, rows: &[TradeRecord]) -> Result<u64> {
        if rows.is_empty() {
            return Ok(0);
        }
        let resp = self
            .post(FLOORSHEET_TABLE)
            .query(&[("on_conflict", CONFLICT_KEY), ("select", CONFLICT_KEY)])
            .header("Prefer", "resolution=ignore-duplicates,return=representation")
            .json(rows)
            .send()
            .await?;
        // Ignored duplicates are left out of the representation.
        let written: Vec<serde_json::Value> = check(resp).await?.json().await?;
        Ok(written.len() as u64)
    }

    async fn distinct_dates(&self) -> Result<Vec<NaiveDate>> {
        let resp = self.rpc(DISTINCT_DATES_RPC).json(&json!({})).send().await?;
        let rows: Vec<DateRow> = check(resp).await?.json().await?;
        Ok(rows.into_iter().map(|r| r.d).collect())
    }

    async fn prune(&self, retention_days: u32) -> Result<()> {
        let resp = self
            .rpc(CLEANUP_RPC)
            .json(&json!({ "days": retention_days }))
            .send()
            .await?;
        check(resp).await?;
        info!(retention_days, "Store cleanup ({CLEANUP_RPC}) complete");
        Ok(())
    }
}
