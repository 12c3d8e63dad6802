//! In-memory sighting store for tests and ephemeral runs

use std::sync::RwLock;

use super::{SightingStore, StoreError};
use crate::types::Sighting;

/// Sightings held in a `Vec` kept sorted newest first.
///
/// Mirrors the sled backend's identity rule: a second sighting of the same
/// device at the same millisecond replaces the first.
pub struct InMemorySightingStore {
    sightings: RwLock<Vec<Sighting>>,
}

impl InMemorySightingStore {
    pub fn new() -> Self {
        Self {
            sightings: RwLock::new(Vec::new()),
        }
    }

    /// Create a store pre-populated with `sightings`
    pub fn with_sightings<I: IntoIterator<Item = Sighting>>(sightings: I) -> Self {
        let store = Self::new();
        if let Ok(mut guard) = store.sightings.write() {
            for s in sightings {
                insert_sorted(&mut guard, s);
            }
        }
        store
    }
}

impl Default for InMemorySightingStore {
    fn default() -> Self {
        Self::new()
    }
}

fn insert_sorted(store: &mut Vec<Sighting>, sighting: Sighting) {
    // First index whose timestamp is not newer than the incoming one
    let idx = store.partition_point(|s| s.timestamp_ms > sighting.timestamp_ms);
    let same_ms_end = store[idx..]
        .iter()
        .position(|s| s.timestamp_ms != sighting.timestamp_ms)
        .map_or(store.len(), |offset| idx + offset);

    match store[idx..same_ms_end]
        .iter()
        .position(|s| s.device_key == sighting.device_key)
    {
        Some(offset) => store[idx + offset] = sighting,
        None => store.insert(same_ms_end, sighting),
    }
}

fn lock_error(e: impl std::fmt::Display) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

impl SightingStore for InMemorySightingStore {
    fn list_sightings_ordered_desc_by_time(&self) -> Result<Vec<Sighting>, StoreError> {
        let store = self.sightings.read().map_err(lock_error)?;
        Ok(store.clone())
    }

    fn delete_sightings_older_than(&self, cutoff_ms: i64) -> Result<usize, StoreError> {
        let mut store = self.sightings.write().map_err(lock_error)?;
        // Sorted newest first, so every expired row sits at the tail
        let keep = store.partition_point(|s| s.timestamp_ms >= cutoff_ms);
        let removed = store.len() - keep;
        store.truncate(keep);
        Ok(removed)
    }

    fn insert_sighting(&self, sighting: &Sighting) -> Result<(), StoreError> {
        let mut store = self.sightings.write().map_err(lock_error)?;
        insert_sorted(&mut store, sighting.clone());
        Ok(())
    }

    fn clear_all(&self) -> Result<(), StoreError> {
        self.sightings.write().map_err(lock_error)?.clear();
        Ok(())
    }

    fn count(&self) -> usize {
        self.sightings.read().map(|s| s.len()).unwrap_or(0)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
