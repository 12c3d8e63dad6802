//! Sled-backed sighting store
//!
//! Key: capture timestamp as order-preserving big-endian bytes, followed by
//! the device key. Keys therefore sort chronologically and are unique per
//! (timestamp, device). A repeat sighting of the same device in the same
//! millisecond overwrites the earlier row.
//!
//! Value: JSON-serialized `Sighting`.

use std::path::Path;
use std::sync::Arc;

use sled::IVec;
use tracing::{debug, info, warn};

use super::{SightingStore, StoreError};
use crate::types::Sighting;

/// Flips the sign bit so signed timestamps sort correctly as unsigned bytes.
const SIGN_FLIP: u64 = 1 << 63;

fn timestamp_prefix(timestamp_ms: i64) -> [u8; 8] {
    ((timestamp_ms as u64) ^ SIGN_FLIP).to_be_bytes()
}

fn sighting_key(sighting: &Sighting) -> Vec<u8> {
    let mut key = Vec::with_capacity(8 + sighting.device_key.len());
    key.extend_from_slice(&timestamp_prefix(sighting.timestamp_ms));
    key.extend_from_slice(sighting.device_key.as_bytes());
    key
}

/// Durable sighting store
#[derive(Clone)]
pub struct SledSightingStore {
    db: Arc<sled::Db>,
}

impl SledSightingStore {
    /// Open or create the store at the specified path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path_ref = path.as_ref();
        let db = sled::open(path_ref)?;
        info!(path = %path_ref.display(), rows = db.len(), "Sighting store opened");
        Ok(Self { db: Arc::new(db) })
    }

    /// Flush pending writes to disk
    pub fn flush(&self) -> Result<(), StoreError> {
        self.db.flush()?;
        Ok(())
    }
}

impl SightingStore for SledSightingStore {
    fn list_sightings_ordered_desc_by_time(&self) -> Result<Vec<Sighting>, StoreError> {
        let mut sightings = Vec::with_capacity(self.db.len());

        // Newest first due to order-preserving timestamp keys
        for item in self.db.iter().rev() {
            let (key, value) = item?;
            match serde_json::from_slice::<Sighting>(&value) {
                Ok(sighting) => sightings.push(sighting),
                Err(e) => {
                    warn!(key = ?key, error = %e, "Skipping undecodable sighting row");
                }
            }
        }

        Ok(sightings)
    }

    fn delete_sightings_older_than(&self, cutoff_ms: i64) -> Result<usize, StoreError> {
        let cutoff = timestamp_prefix(cutoff_ms);

        // Any key whose 8-byte prefix is below the cutoff prefix sorts before
        // the bare prefix itself.
        let expired: Vec<IVec> = self
            .db
            .range(..&cutoff[..])
            .keys()
            .collect::<Result<_, _>>()?;

        let deleted = expired.len();
        if deleted == 0 {
            return Ok(0);
        }

        let mut batch = sled::Batch::default();
        for key in expired {
            batch.remove(key);
        }
        self.db.apply_batch(batch)?;

        debug!(deleted, cutoff_ms, "Expired sightings removed");
        Ok(deleted)
    }

    fn insert_sighting(&self, sighting: &Sighting) -> Result<(), StoreError> {
        let value = serde_json::to_vec(sighting)?;
        // No flush per write: sled flushes in the background and a lost
        // trailing sighting is re-observed on the next scan.
        self.db.insert(sighting_key(sighting), value)?;
        Ok(())
    }

    fn clear_all(&self) -> Result<(), StoreError> {
        self.db.clear()?;
        self.db.flush()?;
        info!("Sighting store cleared");
        Ok(())
    }

    fn count(&self) -> usize {
        self.db.len()
    }

    fn backend_name(&self) -> &'static str {
        "sled"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sighting(key: &str, ts: i64) -> Sighting {
        Sighting::new(key, ts, 47.39, 8.52, "Tile")
    }

    #[test]
    fn test_store_open() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = SledSightingStore::open(temp_dir.path()).unwrap();
        assert_eq!(store.count(), 0);
        assert_eq!(store.backend_name(), "sled");
    }

    #[test]
    fn test_list_is_newest_first() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = SledSightingStore::open(temp_dir.path()).unwrap();

        store.insert_sighting(&sighting("A", 2_000)).unwrap();
        store.insert_sighting(&sighting("B", 3_000)).unwrap();
        store.insert_sighting(&sighting("A", 1_000)).unwrap();

        let listed = store.list_sightings_ordered_desc_by_time().unwrap();
        let times: Vec<i64> = listed.iter().map(|s| s.timestamp_ms).collect();
        assert_eq!(times, vec![3_000, 2_000, 1_000]);
    }

    #[test]
    fn test_same_millisecond_different_devices_both_kept() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = SledSightingStore::open(temp_dir.path()).unwrap();

        store.insert_sighting(&sighting("A", 5_000)).unwrap();
        store.insert_sighting(&sighting("B", 5_000)).unwrap();
        assert_eq!(store.count(), 2);
    }

    #[test]
    fn test_delete_older_than_is_strict() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = SledSightingStore::open(temp_dir.path()).unwrap();

        store.insert_sighting(&sighting("A", 999)).unwrap();
        store.insert_sighting(&sighting("A", 1_000)).unwrap();
        store.insert_sighting(&sighting("B", 1_001)).unwrap();

        let deleted = store.delete_sightings_older_than(1_000).unwrap();
        assert_eq!(deleted, 1);

        let remaining = store.list_sightings_ordered_desc_by_time().unwrap();
        assert!(remaining.iter().all(|s| s.timestamp_ms >= 1_000));
        assert_eq!(remaining.len(), 2);
    }

    #[test]
    fn test_negative_timestamps_order_before_positive() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = SledSightingStore::open(temp_dir.path()).unwrap();

        store.insert_sighting(&sighting("A", -5)).unwrap();
        store.insert_sighting(&sighting("A", 5)).unwrap();

        assert_eq!(store.delete_sightings_older_than(0).unwrap(), 1);
        assert_eq!(store.list_sightings_ordered_desc_by_time().unwrap()[0].timestamp_ms, 5);
    }

    #[test]
    fn test_undecodable_rows_are_skipped() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = SledSightingStore::open(temp_dir.path()).unwrap();

        store.insert_sighting(&sighting("A", 10)).unwrap();
        store.db.insert(timestamp_prefix(20), b"not json".to_vec()).unwrap();

        let listed = store.list_sightings_ordered_desc_by_time().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].device_key, "A");
    }

    #[test]
    fn test_clear_all() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = SledSightingStore::open(temp_dir.path()).unwrap();

        store.insert_sighting(&sighting("A", 10)).unwrap();
        store.insert_sighting(&sighting("B", 20)).unwrap();
        store.clear_all().unwrap();
        assert_eq!(store.count(), 0);
    }
}
