//! Sighting source abstraction for ingestion.
//!
//! Unifies where sightings come from: stdin (JSON lines, e.g. piped from the
//! `simulation` binary) and replay of a pre-recorded JSONL file.

use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Stdin};

use crate::types::Sighting;

/// Events produced by a sighting source.
#[derive(Debug)]
pub enum SightingEvent {
    /// A decoded sighting.
    Sighting(Sighting),
    /// No more data.
    Eof,
}

/// Trait abstracting where sightings come from.
///
/// The ingest loop calls [`next_sighting`](SightingSource::next_sighting) in
/// a `select!` with cancellation.
#[async_trait]
pub trait SightingSource: Send + 'static {
    /// Read the next sighting.
    ///
    /// Returns `SightingEvent::Eof` when no more data is available and `Err`
    /// only on unrecoverable I/O errors.
    async fn next_sighting(&mut self) -> Result<SightingEvent>;

    /// Human-readable name for logging.
    fn source_name(&self) -> &str;
}

// ============================================================================
// Replay Source
// ============================================================================

/// Replays pre-loaded sightings with an optional delay between them.
pub struct ReplaySource {
    sightings: std::vec::IntoIter<Sighting>,
    delay_ms: u64,
    yielded_first: bool,
}

impl ReplaySource {
    pub fn new(sightings: Vec<Sighting>, delay_ms: u64) -> Self {
        Self {
            sightings: sightings.into_iter(),
            delay_ms,
            yielded_first: false,
        }
    }

    /// Load a JSONL recording. Lines that fail to decode are skipped.
    pub fn from_jsonl_file(path: &Path, delay_ms: u64) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading replay file {}", path.display()))?;

        let mut skipped = 0usize;
        let sightings: Vec<Sighting> = contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .filter_map(|line| match serde_json::from_str(line) {
                Ok(s) => Some(s),
                Err(_) => {
                    skipped += 1;
                    None
                }
            })
            .collect();

        if skipped > 0 {
            tracing::warn!(skipped, path = %path.display(), "Skipped undecodable replay lines");
        }
        tracing::info!(count = sightings.len(), path = %path.display(), "Replay file loaded");
        Ok(Self::new(sightings, delay_ms))
    }
}

#[async_trait]
impl SightingSource for ReplaySource {
    async fn next_sighting(&mut self) -> Result<SightingEvent> {
        if self.yielded_first && self.delay_ms > 0 {
            tokio::time::sleep(tokio::time::Duration::from_millis(self.delay_ms)).await;
        }
        match self.sightings.next() {
            Some(s) => {
                self.yielded_first = true;
                Ok(SightingEvent::Sighting(s))
            }
            None => Ok(SightingEvent::Eof),
        }
    }

    fn source_name(&self) -> &str {
        "replay"
    }
}

// ============================================================================
// Stdin Source (JSON sightings, one per line)
// ============================================================================

/// Reads JSON sightings line by line.
///
/// Used with the simulation harness: `simulation | homescout run --stdin`.
/// Generic over the reader so tests can feed an in-memory buffer.
pub struct StdinSource<R = BufReader<Stdin>> {
    reader: R,
    line_buffer: Vec<u8>,
}

impl StdinSource {
    pub fn new() -> Self {
        Self::from_reader(BufReader::new(tokio::io::stdin()))
    }
}

impl Default for StdinSource {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> StdinSource<R>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    pub fn from_reader(reader: R) -> Self {
        Self {
            reader,
            line_buffer: Vec::with_capacity(256),
        }
    }
}

#[async_trait]
impl<R> SightingSource for StdinSource<R>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    async fn next_sighting(&mut self) -> Result<SightingEvent> {
        loop {
            self.line_buffer.clear();
            // Raw bytes: a line that is not UTF-8 is skipped like any other bad line
            let bytes = self.reader.read_until(b'\n', &mut self.line_buffer).await?;
            if bytes == 0 {
                return Ok(SightingEvent::Eof);
            }
            let line = self.line_buffer.trim_ascii();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_slice::<Sighting>(line) {
                Ok(sighting) => return Ok(SightingEvent::Sighting(sighting)),
                Err(e) => {
                    // Skip malformed lines and keep reading
                    tracing::warn!(error = %e, "Failed to parse sighting line");
                }
            }
        }
    }

    fn source_name(&self) -> &str {
        "stdin"
    }
}
