//! Threshold Evaluator
//!
//! Pure function of (group, thresholds, gate, cycle time). Holds no state
//! between calls, so repeated evaluation of an unchanged group is stable.
//!
//! Gates run in order and the first failing gate decides the verdict:
//! 1. Eligibility: more than one sighting and at least `min_occurrences`
//! 2. Duration: newest minus oldest, only when the gate is enforced
//! 3. Distance: cumulative great-circle path over consecutive sightings
//!
//! Every gate rejects only when the metric is strictly below its threshold.

use std::fmt;

use super::geo::path_length_m;
use crate::types::{ClassificationEvent, ClassificationThresholds, DurationGate, SightingGroup};

/// Why a group was not classified as a tracker
#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
    /// Only one sighting; no movement can be measured
    SingleSighting,
    TooFewOccurrences { observed: usize, required: u32 },
    DurationTooShort { observed_ms: i64, required_ms: f64 },
    DistanceTooShort { observed_m: f64, required_m: f64 },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::SingleSighting => write!(f, "single sighting"),
            Rejection::TooFewOccurrences { observed, required } => {
                write!(f, "{observed} sightings < {required} required")
            }
            Rejection::DurationTooShort {
                observed_ms,
                required_ms,
            } => write!(
                f,
                "span {:.1} min < {:.1} min required",
                *observed_ms as f64 / 60_000.0,
                required_ms / 60_000.0
            ),
            Rejection::DistanceTooShort {
                observed_m,
                required_m,
            } => write!(f, "distance {observed_m:.1} m < {required_m:.1} m required"),
        }
    }
}

/// Outcome of evaluating one group
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Tracker(ClassificationEvent),
    NotTracker(Rejection),
}

impl Verdict {
    pub fn is_tracker(&self) -> bool {
        matches!(self, Verdict::Tracker(_))
    }

    pub fn into_event(self) -> Option<ClassificationEvent> {
        match self {
            Verdict::Tracker(event) => Some(event),
            Verdict::NotTracker(_) => None,
        }
    }
}

/// Classify one device group against a complete threshold set.
pub fn evaluate_group(
    group: &SightingGroup,
    thresholds: &ClassificationThresholds,
    gate: DurationGate,
    detected_at_ms: i64,
) -> Verdict {
    let occurrences = group.len();

    if occurrences <= 1 {
        return Verdict::NotTracker(Rejection::SingleSighting);
    }
    if occurrences < thresholds.min_occurrences as usize {
        return Verdict::NotTracker(Rejection::TooFewOccurrences {
            observed: occurrences,
            required: thresholds.min_occurrences,
        });
    }

    let duration_ms = group.span_ms();
    let required_ms = thresholds.min_duration_ms();
    if gate == DurationGate::Enforced && (duration_ms as f64) < required_ms {
        return Verdict::NotTracker(Rejection::DurationTooShort {
            observed_ms: duration_ms,
            required_ms,
        });
    }

    let distance_meters = path_length_m(group.sightings());
    if distance_meters < thresholds.min_distance_meters {
        return Verdict::NotTracker(Rejection::DistanceTooShort {
            observed_m: distance_meters,
            required_m: thresholds.min_distance_meters,
        });
    }

    let newest = group.newest();
    Verdict::Tracker(ClassificationEvent {
        device_key: newest.device_key.clone(),
        device_type: newest.device_type.clone(),
        occurrences,
        duration_ms,
        distance_meters,
        detected_at_ms,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Sighting;

    const MINUTE: i64 = 60_000;
    // Degrees of latitude per meter on the mean-radius sphere
    const DEG_PER_M: f64 = 1.0 / 111_195.08;

    /// Group walking due north, `step_m` between each fix, `gap_min` apart.
    fn walk(n: usize, step_m: f64, gap_min: i64) -> SightingGroup {
        let sightings = (0..n)
            .map(|i| {
                Sighting::new(
                    "AA:BB:CC:DD:EE:FF",
                    1_000_000 + i as i64 * gap_min * MINUTE,
                    47.0 + i as f64 * step_m * DEG_PER_M,
                    8.0,
                    if i == n - 1 { "AirTag" } else { "Unknown" },
                )
            })
            .collect();
        SightingGroup::from_sightings(sightings).unwrap()
    }

    #[test]
    fn test_single_sighting_never_tracker() {
        let group = walk(1, 0.0, 0);
        let t = ClassificationThresholds::new(0, 0.0, 0.0);
        assert_eq!(
            evaluate_group(&group, &t, DurationGate::Enforced, 0),
            Verdict::NotTracker(Rejection::SingleSighting)
        );
    }

    #[test]
    fn test_occurrence_equality_passes() {
        let group = walk(3, 100.0, 10);
        let t = ClassificationThresholds::new(3, 0.0, 0.0);
        assert!(evaluate_group(&group, &t, DurationGate::Enforced, 0).is_tracker());

        let t = ClassificationThresholds::new(4, 0.0, 0.0);
        assert!(matches!(
            evaluate_group(&group, &t, DurationGate::Enforced, 0),
            Verdict::NotTracker(Rejection::TooFewOccurrences {
                observed: 3,
                required: 4
            })
        ));
    }

    #[test]
    fn test_duration_gate_enforced_vs_advisory() {
        // 2 sightings, 1 minute apart
        let group = walk(2, 500.0, 1);
        let t = ClassificationThresholds::new(2, 5.0, 100.0);

        assert!(matches!(
            evaluate_group(&group, &t, DurationGate::Enforced, 0),
            Verdict::NotTracker(Rejection::DurationTooShort { observed_ms: 60_000, .. })
        ));
        assert!(evaluate_group(&group, &t, DurationGate::Advisory, 0).is_tracker());
    }

    #[test]
    fn test_duration_equality_passes() {
        let group = walk(2, 500.0, 5);
        let t = ClassificationThresholds::new(2, 5.0, 0.0);
        assert!(evaluate_group(&group, &t, DurationGate::Enforced, 0).is_tracker());
    }

    #[test]
    fn test_distance_gate() {
        let group = walk(3, 50.0, 10);
        let t = ClassificationThresholds::new(2, 0.0, 150.0);
        match evaluate_group(&group, &t, DurationGate::Enforced, 0) {
            Verdict::NotTracker(Rejection::DistanceTooShort { observed_m, .. }) => {
                assert!((observed_m - 100.0).abs() < 0.1)
            }
            other => panic!("unexpected verdict: {other:?}"),
        }
    }

    #[test]
    fn test_event_carries_newest_type_and_metrics() {
        let group = walk(4, 100.0, 10);
        let t = ClassificationThresholds::new(3, 5.0, 100.0);
        let event = evaluate_group(&group, &t, DurationGate::Enforced, 42)
            .into_event()
            .unwrap();

        assert_eq!(event.device_key, "AA:BB:CC:DD:EE:FF");
        assert_eq!(event.device_type, "AirTag");
        assert_eq!(event.occurrences, 4);
        assert_eq!(event.duration_ms, 30 * MINUTE);
        assert!((event.distance_meters - 300.0).abs() < 0.1);
        assert_eq!(event.detected_at_ms, 42);
    }

    #[test]
    fn test_rejection_display() {
        let r = Rejection::TooFewOccurrences {
            observed: 2,
            required: 5,
        };
        assert_eq!(r.to_string(), "2 sightings < 5 required");
    }
}
