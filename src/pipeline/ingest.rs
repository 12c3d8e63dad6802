//! Ingest loop: sighting source -> store.
//!
//! Stands in for the BLE scan layer. Runs concurrently with the scheduler;
//! the store is the only shared state between them. Store writes run on the
//! blocking pool, like the scheduler's cycles.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::source::{SightingEvent, SightingSource};
use crate::storage::SightingStore;

/// Why the ingest loop returned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IngestEnd {
    #[default]
    Eof,
    Cancelled,
    SourceError,
}

/// Totals for one ingest run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub received: u64,
    pub stored: u64,
    pub rejected: u64,
    pub store_errors: u64,
    pub end: IngestEnd,
}

/// Pull sightings from `source` into `store` until EOF or cancellation.
pub async fn run_ingest<S: SightingSource + ?Sized>(
    source: &mut S,
    store: Arc<dyn SightingStore>,
    cancel_token: CancellationToken,
) -> IngestStats {
    let mut stats = IngestStats::default();
    info!(source = source.source_name(), backend = store.backend_name(), "Ingest started");

    loop {
        let event = tokio::select! {
            () = cancel_token.cancelled() => {
                stats.end = IngestEnd::Cancelled;
                break;
            }
            result = source.next_sighting() => match result {
                Ok(ev) => ev,
                Err(e) => {
                    warn!(error = %e, "Sighting source error");
                    stats.end = IngestEnd::SourceError;
                    break;
                }
            },
        };

        let sighting = match event {
            SightingEvent::Sighting(s) => s,
            SightingEvent::Eof => {
                stats.end = IngestEnd::Eof;
                break;
            }
        };
        stats.received += 1;

        if let Some(reason) = sighting.malformation() {
            debug!(device_key = %sighting.device_key, reason, "Rejected malformed sighting");
            stats.rejected += 1;
            continue;
        }

        let device_key = sighting.device_key.clone();
        let writer = Arc::clone(&store);
        let written = tokio::task::spawn_blocking(move || writer.insert_sighting(&sighting))
            .await
            .map_err(|e| e.to_string())
            .and_then(|res| res.map_err(|e| e.to_string()));

        match written {
            Ok(()) => stats.stored += 1,
            Err(e) => {
                // Keep ingesting; one failed write loses one sighting
                error!(error = %e, %device_key, "Failed to store sighting");
                stats.store_errors += 1;
            }
        }
    }

    info!(
        received = stats.received,
        stored = stats.stored,
        rejected = stats.rejected,
        end = ?stats.end,
        "Ingest finished"
    );
    stats
}
