//! Live tracking preferences
//!
//! The scheduler reads one snapshot per cycle; writers (config watcher, CLI,
//! tests) swap in a whole new value. Readers never see a half-updated set.

use std::sync::Arc;

use arc_swap::ArcSwap;
use tokio::sync::watch;

use crate::types::TrackingPreferences;

/// Source of the current tracking preferences with change notification.
pub trait PreferenceSource: Send + Sync {
    /// Latest known preferences
    fn current(&self) -> TrackingPreferences;

    /// Receiver that is marked changed whenever new preferences are published
    fn subscribe(&self) -> watch::Receiver<TrackingPreferences>;
}

/// Hot-swappable preferences shared between the watcher and the scheduler.
pub struct SharedPreferences {
    current: ArcSwap<TrackingPreferences>,
    notify: watch::Sender<TrackingPreferences>,
}

impl SharedPreferences {
    pub fn new(initial: TrackingPreferences) -> Self {
        let (notify, _) = watch::channel(initial);
        Self {
            current: ArcSwap::from_pointee(initial),
            notify,
        }
    }

    /// Replace the preferences. Returns the previous value.
    pub fn publish(&self, prefs: TrackingPreferences) -> TrackingPreferences {
        let previous = self.current.swap(Arc::new(prefs));
        // send_replace succeeds even with no live receivers
        self.notify.send_replace(prefs);
        *previous
    }
}

impl Default for SharedPreferences {
    fn default() -> Self {
        Self::new(TrackingPreferences::default())
    }
}

impl PreferenceSource for SharedPreferences {
    fn current(&self) -> TrackingPreferences {
        **self.current.load()
    }

    fn subscribe(&self) -> watch::Receiver<TrackingPreferences> {
        self.notify.subscribe()
    }
}
