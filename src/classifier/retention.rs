//! Retention Sweeper

use tracing::debug;

use crate::config::defaults::RETENTION_HORIZON_MS;
use crate::storage::{SightingStore, StoreError};

/// Oldest timestamp still retained at `now_ms`.
pub fn retention_cutoff_ms(now_ms: i64) -> i64 {
    now_ms.saturating_sub(RETENTION_HORIZON_MS)
}

/// Delete everything older than the retention horizon from `store`.
///
/// Runs against the store, not an in-memory copy, so the store itself stays
/// bounded. Returns the number of rows removed.
pub fn sweep_expired<S: SightingStore + ?Sized>(store: &S, now_ms: i64) -> Result<usize, StoreError> {
    let cutoff_ms = retention_cutoff_ms(now_ms);
    let removed = store.delete_sightings_older_than(cutoff_ms)?;
    if removed > 0 {
        debug!(removed, cutoff_ms, backend = store.backend_name(), "Retention sweep");
    }
    Ok(removed)
}
