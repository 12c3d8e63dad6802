//! HomeScout Configuration Module
//!
//! Tracking thresholds, scheduler interval, storage location and event sink
//! settings loaded from TOML.
//!
//! ## Loading Order
//!
//! 1. `HOMESCOUT_CONFIG` environment variable (path to TOML file)
//! 2. `homescout.toml` in the current working directory
//! 3. Built-in defaults (tracking thresholds unset)
//!
//! Tracking preferences are hot-reloadable: `watcher::run_config_watcher`
//! publishes edits into a `SharedPreferences` which the scheduler reads at
//! the start of every cycle.

pub mod defaults;
mod preferences;
mod scout_config;
pub mod validation;
pub mod watcher;

pub use preferences::{PreferenceSource, SharedPreferences};
pub use scout_config::*;
pub use watcher::{ConfigChange, ConfigEvent};
