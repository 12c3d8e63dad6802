//! Config validation: unknown-key detection with Levenshtein suggestions
//! and value range checks.
//!
//! Two-pass parse: the raw TOML is first walked as a `toml::Value` and its
//! key paths compared against the known field names, producing "did you
//! mean?" warnings. Serde deserialization follows. Warnings never break a
//! config.

use std::collections::HashSet;

use super::ScoutConfig;

/// A non-fatal config warning (typo, unknown section).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, " (did you mean '{s}'?)")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

/// Every valid dotted key path of `ScoutConfig`.
///
/// Any new field added to the config structs must be added here too.
pub fn known_config_keys() -> HashSet<&'static str> {
    let keys: &[&str] = &[
        // [tracking]
        "tracking",
        "tracking.occurrences",
        "tracking.time_in_min",
        "tracking.distance",
        "tracking.duration_gate",
        // [scheduler]
        "scheduler",
        "scheduler.interval_secs",
        // [storage]
        "storage",
        "storage.path",
        "storage.clear_on_start",
        // [sink]
        "sink",
        "sink.jsonl_path",
    ];
    keys.iter().copied().collect()
}

// ============================================================================
// TOML Key Walking
// ============================================================================

/// Recursively collect all dotted key paths of a `toml::Value` tree.
///
/// A table `{ a = { b = 1, c = 2 } }` yields `["a", "a.b", "a.c"]`.
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            if v.is_table() {
                keys.extend(walk_toml_keys(v, &path));
            }
        }
    }
    keys
}

// ============================================================================
// Levenshtein Distance
// ============================================================================

fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a.chars().count();
    }

    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0; b_chars.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, &cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_chars.len()]
}

/// Closest known key within edit distance 3, ties broken alphabetically.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    known
        .iter()
        .map(|&k| (levenshtein(unknown, k), k))
        .filter(|&(dist, _)| dist <= 3)
        .min()
        .map(|(_, k)| k.to_string())
}

// ============================================================================
// Unknown Key Validation (entry point)
// ============================================================================

/// Parse raw TOML and return a warning for every unknown key.
///
/// Parse errors yield no warnings; serde reports them afterwards.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let value: toml::Value = match raw_toml.parse() {
        Ok(v) => v,
        Err(_) => return Vec::new(),
    };

    let known = known_config_keys();
    walk_toml_keys(&value, "")
        .into_iter()
        .filter(|key| !known.contains(key.as_str()))
        .map(|key| ValidationWarning {
            suggestion: suggest_correction(&key, &known),
            message: format!("Unknown config key '{key}'"),
            field: key,
        })
        .collect()
}

// ============================================================================
// Range Validation
// ============================================================================

/// Check value ranges on a parsed config.
///
/// Returns one message per impossible value. Unset tracking values are not
/// errors.
pub fn validate_ranges(config: &ScoutConfig) -> Vec<String> {
    let mut errors = Vec::new();
    let t = &config.tracking;

    if t.occurrences == Some(0) {
        errors.push("tracking.occurrences = 0 must be >= 1".to_string());
    }
    if let Some(minutes) = t.time_in_min {
        if !minutes.is_finite() || minutes < 0.0 {
            errors.push(format!("tracking.time_in_min = {minutes} must be a finite value >= 0"));
        }
    }
    if let Some(meters) = t.distance {
        if !meters.is_finite() || meters < 0.0 {
            errors.push(format!("tracking.distance = {meters} must be a finite value >= 0"));
        }
    }
    if config.scheduler.interval_secs == 0 {
        errors.push("scheduler.interval_secs = 0 must be > 0".to_string());
    }
    if config.storage.path.as_os_str().is_empty() {
        errors.push("storage.path must not be empty".to_string());
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein("distance", "distance"), 0);
        assert_eq!(levenshtein("distnace", "distance"), 2);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("abc", ""), 3);
    }

    #[test]
    fn test_walk_toml_keys_nested() {
        let toml: toml::Value = "[tracking]\noccurrences = 3\n".parse().unwrap();
        let keys = walk_toml_keys(&toml, "");
        assert_eq!(keys, vec!["tracking".to_string(), "tracking.occurrences".to_string()]);
    }

    #[test]
    fn test_typo_key_produces_warning_with_suggestion() {
        let warnings = validate_unknown_keys("[tracking]\noccurences = 3\n");
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].field, "tracking.occurences");
        assert_eq!(warnings[0].suggestion.as_deref(), Some("tracking.occurrences"));
        assert!(warnings[0].to_string().contains("did you mean"));
    }

    #[test]
    fn test_all_valid_keys_produce_zero_warnings() {
        let toml_str = r#"
[tracking]
occurrences = 3
time_in_min = 5.0
distance = 100.0
duration_gate = "enforced"

[scheduler]
interval_secs = 10

[storage]
path = "./data/sightings.db"
clear_on_start = true

[sink]
jsonl_path = "events.jsonl"
"#;
        assert!(validate_unknown_keys(toml_str).is_empty());
    }

    #[test]
    fn test_unknown_section_without_suggestion() {
        let warnings = validate_unknown_keys("[dashboard]\nport = 8080\n");
        assert_eq!(warnings.len(), 2);
        assert!(warnings.iter().all(|w| w.suggestion.is_none()));
    }

    #[test]
    fn test_invalid_toml_yields_no_warnings() {
        assert!(validate_unknown_keys("[tracking\n").is_empty());
    }

    #[test]
    fn test_range_checks() {
        let mut config = ScoutConfig::default();
        assert!(validate_ranges(&config).is_empty());

        config.tracking.time_in_min = Some(f64::NAN);
        config.scheduler.interval_secs = 0;
        let errors = validate_ranges(&config);
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("time_in_min"));
        assert!(errors[1].contains("interval_secs"));
    }
}
