//! Sighting Storage
//!
//! `SightingStore` abstracts where sightings live so the evaluation cycle can
//! run against different backends without touching pipeline code:
//! - `SledSightingStore`: durable store on disk (default for the binary)
//! - `InMemorySightingStore`: for tests and `--in-memory` runs
//!
//! The classification core only relies on this read/write contract.

mod memory;
mod sled_store;

pub use memory::InMemorySightingStore;
pub use sled_store::SledSightingStore;

use crate::types::Sighting;

/// Read/write contract of the sighting store.
///
/// Implementations must be thread-safe (Send + Sync): the scheduler calls
/// them from a blocking worker while the ingest loop inserts concurrently.
pub trait SightingStore: Send + Sync {
    /// All retained sightings, most recent first.
    fn list_sightings_ordered_desc_by_time(&self) -> Result<Vec<Sighting>, StoreError>;

    /// Delete every sighting with `timestamp_ms < cutoff_ms`.
    ///
    /// Returns the number of rows removed.
    fn delete_sightings_older_than(&self, cutoff_ms: i64) -> Result<usize, StoreError>;

    /// Store one sighting.
    fn insert_sighting(&self, sighting: &Sighting) -> Result<(), StoreError>;

    /// Remove every sighting.
    fn clear_all(&self) -> Result<(), StoreError>;

    /// Number of stored sightings
    fn count(&self) -> usize;

    /// Backend name for logging
    fn backend_name(&self) -> &'static str;
}

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<sled::Error> for StoreError {
    fn from(err: sled::Error) -> Self {
        StoreError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}
