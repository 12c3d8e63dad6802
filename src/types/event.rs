//! Classification output

use serde::{Deserialize, Serialize};

/// A device classified as a possible tracker during one evaluation cycle.
///
/// Carries the metrics that satisfied the thresholds at detection time.
/// Emitted once per detection per cycle; the core does not deduplicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationEvent {
    pub device_key: String,
    /// Device type of the most recent sighting
    pub device_type: String,
    /// Number of sightings in the group
    pub occurrences: usize,
    /// Newest minus oldest sighting timestamp
    pub duration_ms: i64,
    /// Cumulative great-circle distance across consecutive sightings
    pub distance_meters: f64,
    /// Cycle time at which the detection was made (epoch ms)
    pub detected_at_ms: i64,
}

impl ClassificationEvent {
    pub fn duration_minutes(&self) -> f64 {
        self.duration_ms as f64 / 60_000.0
    }
}

impl std::fmt::Display for ClassificationEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Type: {}, Mac: {} ({} sightings over {:.1} min, {:.0} m)",
            self.device_type,
            self.device_key,
            self.occurrences,
            self.duration_minutes(),
            self.distance_meters
        )
    }
}
