//! Shared data structures for BLE tracker classification
//!
//! This module defines the core types flowing through an evaluation cycle:
//! - Sighting: one timestamped, geolocated BLE observation
//! - SightingGroup: all sightings of one device, newest first
//! - TrackingPreferences / ClassificationThresholds: user-tuned limits
//! - ClassificationEvent: a "possible tracker" detection

mod event;
mod sighting;
mod thresholds;

pub use event::*;
pub use sighting::*;
pub use thresholds::*;
