use std::future::Future;
use std::time::Duration;

use chrono::{NaiveDate, NaiveTime};
use reqwest::Client;
use tracing::{debug, error, info, warn};

use crate::config::{PAGE_SIZE, REQUEST_TIMEOUT_SECS};
use crate::error::Result;
use crate::persister::persist;
use crate::store::FloorsheetStore;
use crate::types::{DayStats, FloorsheetPage, FloorsheetResponse, RawTrade, TradeRecord};

/// Rejected records logged per date before going quiet.
const REJECTION_SAMPLE_LIMIT: usize = 3;

/// One page of floorsheet data for a date.
pub trait FloorsheetSource: Send + Sync {
    /// `Ok(None)` when the response carries no `data` envelope.
    fn fetch_page(
        &self,
        date: NaiveDate,
        page: u32,
    ) -> impl Future<Output = Result<Option<FloorsheetPage>>> + Send;
}

/// HTTP client for the floorsheet API.
#[derive(Clone)]
pub struct FloorsheetClient {
    client: Client,
    base_url: String,
}

impl FloorsheetClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

impl FloorsheetSource for FloorsheetClient {
    async fn fetch_page(&self, date: NaiveDate, page: u32) -> Result<Option<FloorsheetPage>> {
        let date = date.format("%Y-%m-%d").to_string();
        let resp: FloorsheetResponse = self
            .client
            .get(&self.base_url)
            .query(&[
                ("Size", PAGE_SIZE.to_string()),
                ("date", date),
                ("page", page.to_string()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(resp.data)
    }
}

#[derive(Debug, PartialEq)]
pub enum Rejection {
    Malformed(String),
    NoSymbol,
    BadTradeTime(Option<String>),
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rejection::Malformed(e) => write!(f, "malformed record: {e}"),
            Rejection::NoSymbol => write!(f, "missing symbol"),
            Rejection::BadTradeTime(t) => write!(f, "unusable tradeTime {t:?}"),
        }
    }
}

/// Time-of-day part of an ISO timestamp, without fraction or zone.
/// `2024-01-04T11:00:02.517+05:45` → `11:00:02`.
pub fn trade_time_of_day(ts: &str) -> Option<NaiveTime> {
    let (_, rest) = ts.trim().split_once(['T', ' '])?;
    let end = rest.find(['.', 'Z', 'z', '+', '-']).unwrap_or(rest.len());
    NaiveTime::parse_from_str(&rest[..end], "%H:%M:%S").ok()
}

/// Map one raw API record onto the stored row shape.
pub fn map_record(date: NaiveDate, raw: &serde_json::Value) -> std::result::Result<TradeRecord, Rejection> {
    let raw: RawTrade =
        serde_json::from_value(raw.clone()).map_err(|e| Rejection::Malformed(e.to_string()))?;

    let time = raw
        .trade_time
        .as_deref()
        .and_then(trade_time_of_day)
        .ok_or_else(|| Rejection::BadTradeTime(raw.trade_time.clone()))?;

    let symbol = raw
        .symbol
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or(Rejection::NoSymbol)?;

    let contract_id = match raw.contract_id {
        Some(id) => id,
        None => TradeRecord::synthetic_key(
            date,
            time,
            &symbol,
            raw.buyer_member_id.as_deref(),
            raw.seller_member_id.as_deref(),
            raw.contract_quantity,
            raw.contract_rate,
        ),
    };

    Ok(TradeRecord {
        date,
        time,
        symbol,
        contract_id,
        buyer_member_id: raw.buyer_member_id,
        seller_member_id: raw.seller_member_id,
        quantity: raw.contract_quantity,
        rate: raw.contract_rate,
        amount: raw.contract_amount,
    })
}

/// Fetch every page for `date`, persisting each page before requesting the next.
///
/// Pagination runs from page 1 while `page <= totalPages` (taken from the first
/// response). It stops early on a missing `data` envelope, an empty page, or a
/// request failure; failures are logged and never propagate past this date.
pub async fn fetch_day<S, St>(source: &S, store: &St, date: NaiveDate) -> DayStats
where
    S: FloorsheetSource,
    St: FloorsheetStore,
{
    let mut stats = DayStats::default();
    let mut page = 1u32;
    let mut total_pages: Option<u32> = None;

    while page <= total_pages.unwrap_or(1) {
        let data = match source.fetch_page(date, page).await {
            Ok(Some(data)) => data,
            Ok(None) => {
                debug!(%date, page, "No data envelope, stopping");
                break;
            }
            Err(e) => {
                error!(%date, page, "Fetch error for {date} page {page}: {e}");
                stats.aborted = true;
                break;
            }
        };
        stats.pages += 1;

        let total = *total_pages.get_or_insert(data.total_pages.unwrap_or(1));

        if data.content.is_empty() {
            debug!(%date, page, total, "Empty page, stopping");
            break;
        }

        let mut rows = Vec::with_capacity(data.content.len());
        for raw in &data.content {
            stats.rows_seen += 1;
            match map_record(date, raw) {
                Ok(row) => {
                    if row.has_synthetic_key() {
                        stats.synthetic_keys += 1;
                    }
                    rows.push(row);
                }
                Err(rejection) => {
                    stats.rows_rejected += 1;
                    if stats.rows_rejected <= REJECTION_SAMPLE_LIMIT {
                        warn!(%date, page, "Skipping record: {rejection}");
                    }
                }
            }
        }

        stats.persist.absorb(persist(store, &rows).await);
        page += 1;
    }

    if stats.synthetic_keys > 0 {
        warn!(
            %date,
            synthetic_keys = stats.synthetic_keys,
            "{} records had no contractId; stored under synthetic keys",
            stats.synthetic_keys,
        );
    }
    info!(
        %date,
        pages = stats.pages,
        rows = stats.rows_seen,
        rejected = stats.rows_rejected,
        inserted = stats.persist.inserted,
        failed_batches = stats.persist.failed_batches,
        aborted = stats.aborted,
        "Fetched {date}: {} pages, {} rows, {} inserted",
        stats.pages, stats.rows_seen, stats.persist.inserted,
    );
    stats
}

#[cfg(test)]
pub mod scripted {
    //! Source double replaying canned page responses.

    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;
    use crate::error::AppError;

    pub enum Reply {
        Page(FloorsheetPage),
        NoData,
        Fail,
    }

    #[derive(Default)]
    pub struct ScriptedSource {
        pub replies: Mutex<HashMap<(NaiveDate, u32), Reply>>,
        pub requests: Mutex<Vec<(NaiveDate, u32)>>,
    }

    impl ScriptedSource {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn reply(self, date: NaiveDate, page: u32, reply: Reply) -> Self {
            self.replies.lock().unwrap().insert((date, page), reply);
            self
        }

        pub fn requests(&self) -> Vec<(NaiveDate, u32)> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl FloorsheetSource for ScriptedSource {
        async fn fetch_page(&self, date: NaiveDate, page: u32) -> Result<Option<FloorsheetPage>> {
            self.requests.lock().unwrap().push((date, page));
            match self.replies.lock().unwrap().get(&(date, page)) {
                Some(Reply::Page(p)) => Ok(Some(p.clone())),
                Some(Reply::Fail) => Err(AppError::Store {
                    status: 502,
                    message: "bad gateway".to_string(),
                }),
                Some(Reply::NoData) | None => Ok(None),
            }
        }
    }

    /// A page of `n` well-formed trades with ids `<tag>-<i>`.
    pub fn page(tag: &str, n: usize, total_pages: u32) -> FloorsheetPage {
        FloorsheetPage {
            total_pages: Some(total_pages),
            content: (0..n)
                .map(|i| {
                    serde_json::json!({
                        "tradeTime": "2024-01-04T11:00:02.517",
                        "symbol": "NABIL",
                        "contractId": format!("{tag}-{i}"),
                        "buyerMemberId": 58,
                        "sellerMemberId": 34,
                        "contractQuantity": 10,
                        "contractRate": 512.0,
                        "contractAmount": 5120.0
                    })
                })
                .collect(),
        }
    }
}
