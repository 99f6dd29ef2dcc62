use tracing::{error, info};

use crate::store::FloorsheetStore;

/// Ask the store to drop rows older than `retention_days`. Returns whether
/// the cleanup succeeded; a failure is logged and left for the next run.
pub async fn prune<St: FloorsheetStore>(store: &St, retention_days: u32) -> bool {
    match store.prune(retention_days).await {
        Ok(()) => {
            info!(retention_days, "Retention cleanup done (keeping {retention_days} days)");
            true
        }
        Err(e) => {
            error!(retention_days, "Retention cleanup failed: {e}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;

    #[tokio::test]
    async fn passes_window_through() {
        let store = MemoryStore::new();
        assert!(prune(&store, 21).await);
        assert_eq!(store.prune_calls(), vec![21]);
    }

    #[tokio::test]
    async fn failure_is_reported_not_raised() {
        let store = MemoryStore { fail_prune: true, ..MemoryStore::new() };
        assert!(!prune(&store, 21).await);
        assert_eq!(store.prune_calls(), vec![21]);
    }
}
