//! Event sinks for classification results.
//!
//! `emit` is fire-and-forget: the cycle never waits on delivery and never
//! retries. A sink that cannot deliver logs and drops the event.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::types::ClassificationEvent;

/// Receiver of classification events.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &ClassificationEvent);
}

impl<T: EventSink + ?Sized> EventSink for Arc<T> {
    fn emit(&self, event: &ClassificationEvent) {
        (**self).emit(event);
    }
}

impl<T: EventSink + ?Sized> EventSink for Box<T> {
    fn emit(&self, event: &ClassificationEvent) {
        (**self).emit(event);
    }
}

// ============================================================================
// Log Sink
// ============================================================================

/// Writes each detection as a structured `warn` record.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&self, event: &ClassificationEvent) {
        warn!(
            device_key = %event.device_key,
            device_type = %event.device_type,
            occurrences = event.occurrences,
            duration_min = format_args!("{:.1}", event.duration_minutes()),
            distance_m = format_args!("{:.1}", event.distance_meters),
            "Possible tracker detected"
        );
    }
}

// ============================================================================
// Channel Sink
// ============================================================================

/// Forwards events to an async consumer over a bounded channel.
///
/// Uses `try_send`: a full or closed channel drops the event.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<ClassificationEvent>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<ClassificationEvent>) -> Self {
        Self { tx }
    }

    /// Create a sink and its receiving end.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<ClassificationEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: &ClassificationEvent) {
        if let Err(e) = self.tx.try_send(event.clone()) {
            debug!(device_key = %event.device_key, error = %e, "Event channel unavailable, dropping");
        }
    }
}

// ============================================================================
// JSON Lines Sink
// ============================================================================

/// Appends each event as one JSON object per line.
pub struct JsonLinesSink {
    writer: Mutex<BufWriter<File>>,
}

impl JsonLinesSink {
    pub fn open(path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            writer: Mutex::new(BufWriter::new(file)),
        })
    }
}

impl EventSink for JsonLinesSink {
    fn emit(&self, event: &ClassificationEvent) {
        let line = match serde_json::to_string(event) {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "Failed to serialize classification event");
                return;
            }
        };
        let Ok(mut writer) = self.writer.lock() else {
            warn!("Event file writer poisoned, dropping event");
            return;
        };
        if let Err(e) = writeln!(writer, "{line}").and_then(|()| writer.flush()) {
            warn!(error = %e, "Failed to append classification event");
        }
    }
}

// ============================================================================
// Recording Sink
// ============================================================================

/// Keeps every emitted event in memory. Used by `evaluate` and tests.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<ClassificationEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take all recorded events, leaving the sink empty.
    pub fn drain(&self) -> Vec<ClassificationEvent> {
        self.events
            .lock()
            .map(|mut events| std::mem::take(&mut *events))
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.events.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: &ClassificationEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

// ============================================================================
// Fanout
// ============================================================================

/// Delivers every event to each inner sink in order.
#[derive(Default)]
pub struct FanoutSink {
    sinks: Vec<Box<dyn EventSink>>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<S: EventSink + 'static>(mut self, sink: S) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl EventSink for FanoutSink {
    fn emit(&self, event: &ClassificationEvent) {
        for sink in &self.sinks {
            sink.emit(event);
        }
    }
}
