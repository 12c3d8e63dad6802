//! Tracking preferences (user-facing, each value optional) and the complete
//! threshold set the evaluator runs against

use serde::{Deserialize, Serialize};

/// Whether the duration threshold rejects groups or is only reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurationGate {
    /// Groups spanning less than `min_duration_minutes` are rejected
    #[default]
    Enforced,
    /// Duration is computed and reported but never rejects a group
    Advisory,
}

impl std::fmt::Display for DurationGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DurationGate::Enforced => write!(f, "enforced"),
            DurationGate::Advisory => write!(f, "advisory"),
        }
    }
}

/// User tracking preferences as configured, before completeness is known.
///
/// Field names follow the settings screen: `distance` (meters),
/// `time_in_min` (minutes) and `occurrences` (count). Each stays `None`
/// until the user sets it.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TrackingPreferences {
    /// Minimum number of sightings for a device to be considered
    #[serde(default)]
    pub occurrences: Option<u32>,

    /// Minimum minutes between oldest and newest sighting
    #[serde(default)]
    pub time_in_min: Option<f64>,

    /// Minimum cumulative distance followed, in meters
    #[serde(default)]
    pub distance: Option<f64>,

    /// How the duration threshold is applied
    #[serde(default)]
    pub duration_gate: DurationGate,
}

impl TrackingPreferences {
    pub fn new(occurrences: u32, time_in_min: f64, distance: f64) -> Self {
        Self {
            occurrences: Some(occurrences),
            time_in_min: Some(time_in_min),
            distance: Some(distance),
            duration_gate: DurationGate::default(),
        }
    }

    pub fn with_duration_gate(mut self, gate: DurationGate) -> Self {
        self.duration_gate = gate;
        self
    }

    /// Resolve into a complete threshold set, or report which values are
    /// unset or out of range.
    ///
    /// A zero occurrence count or a negative or non-finite duration or
    /// distance is treated like an unset value: with a NaN threshold every
    /// `<` comparison fails and every multi-sighting group would qualify.
    pub fn complete(&self) -> Result<ClassificationThresholds, ConfigurationIncomplete> {
        let mut missing = Vec::new();
        let mut invalid = Vec::new();

        match self.occurrences {
            None => missing.push("occurrences"),
            Some(0) => invalid.push("occurrences"),
            Some(_) => {}
        }
        for (name, value) in [("time_in_min", self.time_in_min), ("distance", self.distance)] {
            match value {
                None => missing.push(name),
                Some(v) if !v.is_finite() || v < 0.0 => invalid.push(name),
                Some(_) => {}
            }
        }

        match (self.occurrences, self.time_in_min, self.distance) {
            (Some(occurrences), Some(minutes), Some(meters)) if invalid.is_empty() => {
                Ok(ClassificationThresholds {
                    min_occurrences: occurrences,
                    min_duration_minutes: minutes,
                    min_distance_meters: meters,
                })
            }
            _ => Err(ConfigurationIncomplete { missing, invalid }),
        }
    }
}

/// One or more tracking preferences are unset or out of range.
///
/// Not an error condition for the scheduler: the cycle is skipped and
/// resumes once the user completes the configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("tracking preferences incomplete ({})", describe_problems(.missing, .invalid))]
pub struct ConfigurationIncomplete {
    /// Values never set
    pub missing: Vec<&'static str>,
    /// Values set outside their valid range
    pub invalid: Vec<&'static str>,
}

fn describe_problems(missing: &[&str], invalid: &[&str]) -> String {
    let mut parts = Vec::new();
    if !missing.is_empty() {
        parts.push(format!("unset: {}", missing.join(", ")));
    }
    if !invalid.is_empty() {
        parts.push(format!("invalid: {}", invalid.join(", ")));
    }
    parts.join("; ")
}

/// Complete, read-only threshold set for one evaluation cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationThresholds {
    /// Minimum sightings (inclusive)
    pub min_occurrences: u32,
    /// Minimum newest-to-oldest span in minutes (inclusive)
    pub min_duration_minutes: f64,
    /// Minimum cumulative distance in meters (inclusive)
    pub min_distance_meters: f64,
}

impl ClassificationThresholds {
    pub fn new(min_occurrences: u32, min_duration_minutes: f64, min_distance_meters: f64) -> Self {
        Self {
            min_occurrences,
            min_duration_minutes,
            min_distance_meters,
        }
    }

    pub fn min_duration_ms(&self) -> f64 {
        self.min_duration_minutes * 60_000.0
    }
}
