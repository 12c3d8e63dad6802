//! HomeScout configuration file model

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::defaults;
use crate::types::TrackingPreferences;

/// Root configuration loaded from `homescout.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoutConfig {
    /// User tracking thresholds; unset values pause classification
    #[serde(default)]
    pub tracking: TrackingPreferences,

    #[serde(default)]
    pub scheduler: SchedulerConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub sink: SinkConfig,
}

impl ScoutConfig {
    /// Load configuration using the standard search order:
    /// 1. `$HOMESCOUT_CONFIG` environment variable
    /// 2. `./homescout.toml` in the current working directory
    /// 3. Built-in defaults (all tracking thresholds unset)
    pub fn load() -> Self {
        match Self::resolve_path() {
            Some(path) => match Self::load_from_file(&path) {
                Ok(config) => {
                    info!(path = %path.display(), "Loaded config");
                    config
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to load config, using defaults");
                    Self::default()
                }
            },
            None => {
                info!("No homescout.toml found, using built-in defaults");
                Self::default()
            }
        }
    }

    /// Path `load()` would read, if any.
    ///
    /// Also tells the config watcher which file to poll.
    pub fn resolve_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(defaults::CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                return Some(p);
            }
            warn!(path = %path, "HOMESCOUT_CONFIG points to non-existent file, falling back");
        }

        let local = PathBuf::from(defaults::CONFIG_FILE_NAME);
        local.exists().then_some(local)
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse(_, inner) => ConfigError::Parse(path.to_path_buf(), inner),
            other => other,
        })
    }

    /// Parse and validate a TOML document.
    ///
    /// Unknown keys are logged as warnings and never fail the parse.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }

        let config: Self =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(PathBuf::new(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = self.to_toml()?;
        std::fs::write(path, contents).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        info!(path = %path.display(), "Config saved");
        Ok(())
    }

    /// Validate value ranges.
    ///
    /// Unset tracking values are valid here; they only pause classification.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let errors = super::validation::validate_ranges(self);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

// ============================================================================
// Sections
// ============================================================================

/// `[scheduler]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Seconds between classification cycles
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

fn default_interval_secs() -> u64 {
    defaults::DEFAULT_INTERVAL_SECS
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
        }
    }
}

/// `[storage]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Sled directory
    #[serde(default = "default_store_path")]
    pub path: PathBuf,

    /// Drop all stored sightings when the service starts
    #[serde(default = "default_clear_on_start")]
    pub clear_on_start: bool,
}

fn default_store_path() -> PathBuf {
    PathBuf::from(defaults::DEFAULT_STORE_PATH)
}

fn default_clear_on_start() -> bool {
    true
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            clear_on_start: default_clear_on_start(),
        }
    }
}

/// `[sink]`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Append classification events as JSON lines to this file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jsonl_path: Option<PathBuf>,
}

// ============================================================================
// Errors
// ============================================================================

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config I/O error ({}): {}", .0.display(), .1)]
    Io(PathBuf, #[source] std::io::Error),
    #[error("config parse error ({}): {}", .0.display(), .1)]
    Parse(PathBuf, #[source] toml::de::Error),
    #[error("config serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("config validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DurationGate;

    #[test]
    fn test_defaults() {
        let config = ScoutConfig::default();
        assert!(config.tracking.complete().is_err());
        assert_eq!(config.scheduler.interval_secs, 10);
        assert!(config.storage.clear_on_start);
        assert!(config.sink.jsonl_path.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_document() {
        let config = ScoutConfig::from_toml_str(
            r#"
[tracking]
occurrences = 3
time_in_min = 5.0
distance = 100.0
duration_gate = "advisory"

[scheduler]
interval_secs = 30

[storage]
path = "/tmp/scout"
clear_on_start = false
"#,
        )
        .unwrap();

        let t = config.tracking.complete().unwrap();
        assert_eq!(t.min_occurrences, 3);
        assert_eq!(config.tracking.duration_gate, DurationGate::Advisory);
        assert_eq!(config.scheduler.interval_secs, 30);
        assert!(!config.storage.clear_on_start);
    }

    #[test]
    fn test_toml_roundtrip_preserves_tracking() {
        let mut config = ScoutConfig::default();
        config.tracking = TrackingPreferences::new(4, 2.5, 250.0);
        let text = config.to_toml().unwrap();
        let back = ScoutConfig::from_toml_str(&text).unwrap();
        assert_eq!(back.tracking, config.tracking);
    }

    #[test]
    fn test_validation_error_lists_problems() {
        let err = ScoutConfig::from_toml_str("[tracking]\noccurrences = 0\ndistance = -1.0\n")
            .unwrap_err();
        match err {
            ConfigError::Validation(errors) => assert_eq!(errors.len(), 2),
            other => panic!("expected validation error, got {other}"),
        }
    }
}
