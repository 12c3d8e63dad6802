//! System-wide default constants.
//!
//! Grouped by subsystem for easy discovery.

// ============================================================================
// Retention
// ============================================================================

/// Sightings older than this, relative to cycle time, are purged (ms).
///
/// 7 200 000 = 2 hours.
pub const RETENTION_HORIZON_MS: i64 = 2 * 60 * 60 * 1000;

// ============================================================================
// Scheduler
// ============================================================================

/// Interval between classification cycles (seconds).
pub const DEFAULT_INTERVAL_SECS: u64 = 10;

// ============================================================================
// Storage
// ============================================================================

/// Default sled directory for the sighting store.
pub const DEFAULT_STORE_PATH: &str = "./data/sightings.db";

// ============================================================================
// Config file
// ============================================================================

/// Environment variable naming an explicit config file path.
pub const CONFIG_ENV_VAR: &str = "HOMESCOUT_CONFIG";

/// Config file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "homescout.toml";

/// How often the watcher polls the config file's mtime (seconds).
pub const CONFIG_POLL_INTERVAL_SECS: u64 = 2;

/// Delay after a detected change before reloading, so editors finish writing (ms).
pub const CONFIG_DEBOUNCE_MS: u64 = 500;

// ============================================================================
// Ingest
// ============================================================================

/// Default delay between replayed sightings (ms).
pub const DEFAULT_REPLAY_DELAY_MS: u64 = 0;

// ============================================================================
// Geodesy
// ============================================================================

/// IUGG mean Earth radius (meters).
pub const EARTH_MEAN_RADIUS_M: f64 = 6_371_008.8;
