//! Polling-based config file watcher.
//!
//! Checks the config file's mtime every 2 seconds. When a change is detected,
//! debounces for 500ms (editors often write in stages), reloads the file and
//! publishes the new tracking preferences. Each outcome is reported on an
//! mpsc channel.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::defaults::{CONFIG_DEBOUNCE_MS, CONFIG_POLL_INTERVAL_SECS};
use super::{ConfigError, PreferenceSource, ScoutConfig, SharedPreferences};
use crate::types::TrackingPreferences;

/// One tracking value that changed on reload.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigChange {
    pub key: String,
    pub old: String,
    pub new: String,
}

/// Events emitted by the config watcher.
#[derive(Debug)]
pub enum ConfigEvent {
    /// Config was reloaded with these changes (possibly none).
    Reloaded(Vec<ConfigChange>),
    /// Reload failed; the previous preferences remain active.
    Error(String),
}

const POLL_INTERVAL: Duration = Duration::from_secs(CONFIG_POLL_INTERVAL_SECS);
const DEBOUNCE_DELAY: Duration = Duration::from_millis(CONFIG_DEBOUNCE_MS);

fn show<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "unset".to_string(), |v| v.to_string())
}

/// Field-level diff of two preference sets.
pub fn diff_preferences(old: &TrackingPreferences, new: &TrackingPreferences) -> Vec<ConfigChange> {
    let mut changes = Vec::new();
    let mut push = |key: &str, a: String, b: String| {
        if a != b {
            changes.push(ConfigChange {
                key: key.to_string(),
                old: a,
                new: b,
            });
        }
    };

    push("tracking.occurrences", show(old.occurrences), show(new.occurrences));
    push("tracking.time_in_min", show(old.time_in_min), show(new.time_in_min));
    push("tracking.distance", show(old.distance), show(new.distance));
    push(
        "tracking.duration_gate",
        old.duration_gate.to_string(),
        new.duration_gate.to_string(),
    );

    changes
}

/// Reload `path` and publish its tracking section.
///
/// On failure nothing is published.
pub fn reload(path: &Path, prefs: &SharedPreferences) -> Result<Vec<ConfigChange>, ConfigError> {
    let config = ScoutConfig::load_from_file(path)?;
    let previous = prefs.current();
    let changes = diff_preferences(&previous, &config.tracking);
    if !changes.is_empty() {
        prefs.publish(config.tracking);
    }
    Ok(changes)
}

/// Run the config file watcher loop.
///
/// Returns when `cancel_token` fires or the event channel is closed.
pub async fn run_config_watcher(
    path: PathBuf,
    prefs: Arc<SharedPreferences>,
    tx: mpsc::Sender<ConfigEvent>,
    cancel_token: CancellationToken,
) {
    tracing::info!(path = %path.display(), "Config watcher started");

    let mut last_mtime = get_mtime(&path);

    loop {
        tokio::select! {
            () = cancel_token.cancelled() => {
                tracing::debug!("Config watcher cancelled");
                return;
            }
            () = tokio::time::sleep(POLL_INTERVAL) => {}
        }

        // Missing file: keep current preferences and keep polling
        let Some(current) = get_mtime(&path) else {
            if last_mtime.is_some() {
                tracing::warn!(
                    path = %path.display(),
                    "Config file not accessible, keeping current preferences"
                );
                last_mtime = None;
            }
            continue;
        };

        if last_mtime == Some(current) {
            continue;
        }

        tokio::time::sleep(DEBOUNCE_DELAY).await;
        if get_mtime(&path) != Some(current) {
            // Still being written; pick it up next poll
            continue;
        }
        last_mtime = Some(current);

        let event = match reload(&path, &prefs) {
            Ok(changes) => {
                for c in &changes {
                    tracing::info!(key = %c.key, old = %c.old, new = %c.new, "Tracking preference changed");
                }
                ConfigEvent::Reloaded(changes)
            }
            Err(e) => {
                tracing::error!(error = %e, "Config hot-reload failed, keeping previous preferences");
                ConfigEvent::Error(e.to_string())
            }
        };

        if tx.send(event).await.is_err() {
            tracing::debug!("Config watcher channel closed, stopping");
            return;
        }
    }
}

fn get_mtime(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).ok().and_then(|m| m.modified().ok())
}
