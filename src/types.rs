use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Persisted row
// ---------------------------------------------------------------------------

/// One executed trade contract as stored in the `floorsheet` table.
/// Rows are insert-only: a re-submitted `contract_id` is ignored, never updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeRecord {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub symbol: String,
    /// Conflict key. Synthesized from the row contents when the API omits it.
    pub contract_id: String,
    pub buyer_member_id: Option<String>,
    pub seller_member_id: Option<String>,
    pub quantity: i64,
    pub rate: f64,
    pub amount: f64,
}

pub const SYNTHETIC_KEY_PREFIX: &str = "syn:";

impl TradeRecord {
    /// Deterministic stand-in for a missing contract id. Identical trades
    /// reported twice collapse onto the same key.
    pub fn synthetic_key(
        date: NaiveDate,
        time: NaiveTime,
        symbol: &str,
        buyer: Option<&str>,
        seller: Option<&str>,
        quantity: i64,
        rate: f64,
    ) -> String {
        format!(
            "{SYNTHETIC_KEY_PREFIX}{}|{}|{}|{}|{}|{}|{}",
            date.format("%Y-%m-%d"),
            time.format("%H:%M:%S"),
            symbol,
            buyer.unwrap_or(""),
            seller.unwrap_or(""),
            quantity,
            rate,
        )
    }

    pub fn has_synthetic_key(&self) -> bool {
        self.contract_id.starts_with(SYNTHETIC_KEY_PREFIX)
    }
}

// ---------------------------------------------------------------------------
// Floorsheet API wire shapes
// ---------------------------------------------------------------------------

/// Top-level API response. A missing `data` envelope means "no data for this date".
#[derive(Debug, Deserialize)]
pub struct FloorsheetResponse {
    #[serde(default)]
    pub data: Option<FloorsheetPage>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FloorsheetPage {
    /// Absent or `null` means a single page.
    #[serde(default)]
    pub total_pages: Option<u32>,
    /// Kept as raw JSON so one malformed record cannot sink the whole page.
    #[serde(default)]
    pub content: Vec<serde_json::Value>,
}

/// A single record in `data.content`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTrade {
    #[serde(default)]
    pub trade_time: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default, with = "crate::serde_util::opt_string_or_number")]
    pub contract_id: Option<String>,
    #[serde(default, with = "crate::serde_util::opt_string_or_number")]
    pub buyer_member_id: Option<String>,
    #[serde(default, with = "crate::serde_util::opt_string_or_number")]
    pub seller_member_id: Option<String>,
    #[serde(default, with = "crate::serde_util::lenient_i64")]
    pub contract_quantity: i64,
    #[serde(default, with = "crate::serde_util::lenient_f64")]
    pub contract_rate: f64,
    #[serde(default, with = "crate::serde_util::lenient_f64")]
    pub contract_amount: f64,
}

// ---------------------------------------------------------------------------
// Run statistics
// ---------------------------------------------------------------------------

/// Outcome of writing one set of rows through the batched persister.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PersistStats {
    pub batches: usize,
    pub inserted: u64,
    /// Batches rejected as duplicates (expected, silent).
    pub conflict_batches: usize,
    /// Batches that failed for any other reason.
    pub failed_batches: usize,
}

impl PersistStats {
    pub fn absorb(&mut self, other: PersistStats) {
        self.batches += other.batches;
        self.inserted += other.inserted;
        self.conflict_batches += other.conflict_batches;
        self.failed_batches += other.failed_batches;
    }
}

/// Outcome of fetching one date.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DayStats {
    pub pages: u32,
    pub rows_seen: usize,
    pub rows_rejected: usize,
    pub synthetic_keys: usize,
    pub persist: PersistStats,
    /// Pagination stopped early on a request or response failure.
    pub aborted: bool,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub dates: Vec<NaiveDate>,
    pub dates_aborted: usize,
    pub pages: u32,
    pub rows_seen: usize,
    pub rows_rejected: usize,
    pub persist: PersistStats,
    pub pruned: bool,
}

impl RunSummary {
    pub fn record_day(&mut self, date: NaiveDate, day: &DayStats) {
        self.dates.push(date);
        if day.aborted {
            self.dates_aborted += 1;
        }
        self.pages += day.pages;
        self.rows_seen += day.rows_seen;
        self.rows_rejected += day.rows_rejected;
        self.persist.absorb(day.persist);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_serializes_with_store_column_names() {
        let rec = TradeRecord {
            date: NaiveDate::from_ymd_opt(2024, 1, 4).unwrap(),
            time: NaiveTime::from_hms_opt(11, 0, 2).unwrap(),
            symbol: "NABIL".to_string(),
            contract_id: "2024010401000123".to_string(),
            buyer_member_id: Some("58".to_string()),
            seller_member_id: Some("34".to_string()),
            quantity: 10,
            rate: 512.0,
            amount: 5120.0,
        };
        let v = serde_json::to_value(&rec).unwrap();
        assert_eq!(v["date"], "2024-01-04");
        assert_eq!(v["time"], "11:00:02");
        assert_eq!(v["contractId"], "2024010401000123");
        assert_eq!(v["buyerMemberId"], "58");
        assert_eq!(v["sellerMemberId"], "34");
        assert_eq!(v["quantity"], 10);
    }

    #[test]
    fn synthetic_key_is_deterministic_and_tagged() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 4).unwrap();
        let time = NaiveTime::from_hms_opt(11, 0, 2).unwrap();
        let a = TradeRecord::synthetic_key(date, time, "NABIL", Some("58"), Some("34"), 10, 512.0);
        let b = TradeRecord::synthetic_key(date, time, "NABIL", Some("58"), Some("34"), 10, 512.0);
        let c = TradeRecord::synthetic_key(date, time, "NABIL", Some("58"), Some("34"), 11, 512.0);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, "syn:2024-01-04|11:00:02|NABIL|58|34|10|512");
    }

    #[test]
    fn missing_data_envelope_deserializes_to_none() {
        let r: FloorsheetResponse = serde_json::from_str(r#"{"message":"not found"}"#).unwrap();
        assert!(r.data.is_none());
        let r: FloorsheetResponse = serde_json::from_str(r#"{"data":null}"#).unwrap();
        assert!(r.data.is_none());
    }

    #[test]
    fn null_total_pages_still_yields_the_page() {
        let r: FloorsheetResponse = serde_json::from_str(
            r#"{"data":{"totalPages":null,"content":[{"symbol":"NABIL"}]}}"#,
        )
        .unwrap();
        let page = r.data.unwrap();
        assert_eq!(page.total_pages, None);
        assert_eq!(page.content.len(), 1);

        let r: FloorsheetResponse = serde_json::from_str(r#"{"data":{"content":[]}}"#).unwrap();
        assert_eq!(r.data.unwrap().total_pages, None);
    }
}
