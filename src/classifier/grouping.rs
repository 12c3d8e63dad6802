//! Sighting Grouper
//!
//! Partitions a newest-first snapshot into per-device groups in one linear
//! pass. The index is rebuilt from scratch every cycle and owned by that
//! cycle alone.

use std::collections::HashMap;

use tracing::warn;

use crate::types::{Sighting, SightingGroup};

/// Per-device groups of one snapshot.
///
/// Groups are kept in first-seen order, which for a newest-first snapshot
/// means the device seen most recently comes first.
#[derive(Debug, Default)]
pub struct GroupIndex {
    groups: Vec<SightingGroup>,
    by_key: HashMap<String, usize>,
    skipped: usize,
}

impl GroupIndex {
    pub fn get(&self, device_key: &str) -> Option<&SightingGroup> {
        self.by_key.get(device_key).map(|&i| &self.groups[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &SightingGroup> {
        self.groups.iter()
    }

    /// Number of distinct devices
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Records dropped as malformed
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Sightings placed into some group
    pub fn total_sightings(&self) -> usize {
        self.groups.iter().map(SightingGroup::len).sum()
    }
}

/// Group sightings by `device_key`, preserving input order within each group.
///
/// Expects the store's newest-first order; the grouper itself never
/// reorders. Malformed records are logged and skipped without affecting the
/// rest of the snapshot.
pub fn group_sightings<I>(sightings: I) -> GroupIndex
where
    I: IntoIterator<Item = Sighting>,
{
    let mut index = GroupIndex::default();

    for sighting in sightings {
        if let Some(reason) = sighting.malformation() {
            warn!(
                device_key = %sighting.device_key,
                timestamp_ms = sighting.timestamp_ms,
                reason,
                "Skipping malformed sighting"
            );
            index.skipped += 1;
            continue;
        }

        match index.by_key.get(&sighting.device_key) {
            Some(&slot) => index.groups[slot].push(sighting),
            None => {
                index
                    .by_key
                    .insert(sighting.device_key.clone(), index.groups.len());
                index.groups.push(SightingGroup::start(sighting));
            }
        }
    }

    index
}
