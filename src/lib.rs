//! HomeScout: BLE Tracker Classification
//!
//! Decides whether a Bluetooth Low Energy device is following the user by
//! grouping its sightings and checking three user thresholds: how often it
//! was seen, over how long, and how far it moved along with the user.
//!
//! ## Architecture
//!
//! - **Storage**: sighting store trait with sled and in-memory backends
//! - **Classifier**: grouping, retention sweep, threshold evaluation
//! - **Pipeline**: evaluation cycle, periodic scheduler, event sinks, ingest
//! - **Config**: TOML config with hot-reloaded tracking preferences

pub mod classifier;
pub mod config;
pub mod pipeline;
pub mod storage;
pub mod types;

// Re-export configuration
pub use config::{ScoutConfig, SharedPreferences};

// Re-export commonly used types
pub use types::{
    ClassificationEvent, ClassificationThresholds, ConfigurationIncomplete, DurationGate,
    Sighting, SightingGroup, TrackingPreferences,
};

// Re-export storage
pub use storage::{InMemorySightingStore, SightingStore, SledSightingStore, StoreError};

// Re-export pipeline
pub use pipeline::{ClassificationScheduler, CycleOutcome, EventSink, TrackingState};
