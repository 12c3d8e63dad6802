//! Config Validation Tests
//!
//! Typo detection, range validation and file round-trips of the
//! `homescout.toml` config layer, independent of the pipeline.

use homescout::config::validation::{
    known_config_keys, suggest_correction, validate_ranges, validate_unknown_keys,
};
use homescout::config::{ConfigError, ScoutConfig};
use homescout::types::{DurationGate, TrackingPreferences};

// ============================================================================
// Typo Detection
// ============================================================================

#[test]
fn typo_in_tracking_key_warns_with_suggestion() {
    let toml_str = r#"
[tracking]
distnce = 100.0
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert_eq!(warnings.len(), 1, "Expected exactly 1 warning");
    assert!(warnings[0].field.contains("distnce"));
    assert_eq!(warnings[0].suggestion.as_deref(), Some("tracking.distance"));
}

#[test]
fn typo_in_section_name_warns() {
    let toml_str = r#"
[schedular]
interval_secs = 5
"#;
    let warnings = validate_unknown_keys(toml_str);
    // Section and its child are both unknown
    assert_eq!(warnings.len(), 2);
    let section = warnings.iter().find(|w| w.field == "schedular").unwrap();
    assert_eq!(section.suggestion.as_deref(), Some("scheduler"));
}

#[test]
fn typo_does_not_fail_load() {
    let config = ScoutConfig::from_toml_str(
        r#"
[tracking]
occurrences = 3
time_in_mins = 5.0
"#,
    )
    .unwrap();
    assert_eq!(config.tracking.occurrences, Some(3));
    // Misspelled key is ignored, so the value stays unset
    assert!(config.tracking.time_in_min.is_none());
}

#[test]
fn suggest_correction_no_match_for_garbage() {
    let known = known_config_keys();
    assert!(suggest_correction("zzzzzzzzzzzz", &known).is_none());
}

// ============================================================================
// Range Validation
// ============================================================================

#[test]
fn defaults_are_clean() {
    assert!(validate_ranges(&ScoutConfig::default()).is_empty());
}

#[test]
fn zero_occurrences_rejected() {
    let err = ScoutConfig::from_toml_str("[tracking]\noccurrences = 0\n").unwrap_err();
    let ConfigError::Validation(errors) = err else {
        panic!("expected validation error");
    };
    assert!(errors[0].contains("tracking.occurrences"));
}

#[test]
fn negative_distance_and_zero_interval_rejected() {
    let err = ScoutConfig::from_toml_str(
        r#"
[tracking]
distance = -5.0

[scheduler]
interval_secs = 0
"#,
    )
    .unwrap_err();
    assert!(err.to_string().contains("tracking.distance"));
    assert!(err.to_string().contains("scheduler.interval_secs"));
}

#[test]
fn zero_thresholds_are_valid() {
    let config = ScoutConfig::from_toml_str(
        "[tracking]\noccurrences = 1\ntime_in_min = 0.0\ndistance = 0.0\n",
    )
    .unwrap();
    assert!(config.tracking.complete().is_ok());
}

#[test]
fn bad_duration_gate_is_a_parse_error() {
    let err = ScoutConfig::from_toml_str("[tracking]\nduration_gate = \"sometimes\"\n").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(..)));
}

// ============================================================================
// File Round-Trip
// ============================================================================

#[test]
fn save_and_load_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("homescout.toml");

    let mut config = ScoutConfig::default();
    config.tracking = TrackingPreferences::new(5, 15.0, 400.0).with_duration_gate(DurationGate::Advisory);
    config.scheduler.interval_secs = 20;
    config.sink.jsonl_path = Some(dir.path().join("events.jsonl"));
    config.save_to_file(&path).unwrap();

    let loaded = ScoutConfig::load_from_file(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = ScoutConfig::load_from_file(&dir.path().join("nope.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io(..)));
}

#[test]
fn parse_error_names_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.toml");
    std::fs::write(&path, "[tracking\n").unwrap();

    let err = ScoutConfig::load_from_file(&path).unwrap_err();
    assert!(err.to_string().contains("broken.toml"));
}
