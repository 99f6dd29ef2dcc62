use tracing::{debug, error};

use crate::config::WRITE_BATCH_SIZE;
use crate::store::FloorsheetStore;
use crate::types::{PersistStats, TradeRecord};

/// Write `rows` in batches of `WRITE_BATCH_SIZE`. Never fails: duplicate-key
/// rejections are expected and silent, other failures are logged and the
/// next batch is still attempted.
pub async fn persist<St: FloorsheetStore>(store: &St, rows: &[TradeRecord]) -> PersistStats {
    persist_batched(store, rows, WRITE_BATCH_SIZE).await
}

pub async fn persist_batched<St: FloorsheetStore>(
    store: &St,
    rows: &[TradeRecord],
    batch_size: usize,
) -> PersistStats {
    let mut stats = PersistStats::default();

    for batch in rows.chunks(batch_size.max(1)) {
        stats.batches += 1;
        match store.insert_ignore(batch).await {
            Ok(n) => stats.inserted += n,
            Err(e) if e.is_duplicate() => {
                debug!(rows = batch.len(), "Batch skipped as duplicate: {e}");
                stats.conflict_batches += 1;
            }
            Err(e) => {
                error!(rows = batch.len(), "Store write failed: {e}");
                stats.failed_batches += 1;
            }
        }
    }

    stats
}
