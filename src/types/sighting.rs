//! BLE sightings and per-device sighting groups

use serde::{Deserialize, Serialize};

/// One BLE advertisement observed by the scan layer.
///
/// Immutable once created. `device_key` is the identity used for grouping
/// (normally the advertised MAC address).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sighting {
    /// Opaque device identity (BLE MAC or equivalent)
    #[serde(alias = "mac_address", alias = "macAddress")]
    pub device_key: String,

    /// Capture time, epoch milliseconds
    #[serde(alias = "timestampInMilliSeconds")]
    pub timestamp_ms: i64,

    /// WGS-84 latitude in degrees
    #[serde(alias = "lat")]
    pub latitude: f64,

    /// WGS-84 longitude in degrees
    #[serde(alias = "lng", alias = "lon")]
    pub longitude: f64,

    /// Device type label supplied by the scan layer
    #[serde(default, alias = "type")]
    pub device_type: String,
}

impl Sighting {
    pub fn new(
        device_key: impl Into<String>,
        timestamp_ms: i64,
        latitude: f64,
        longitude: f64,
        device_type: impl Into<String>,
    ) -> Self {
        Self {
            device_key: device_key.into(),
            timestamp_ms,
            latitude,
            longitude,
            device_type: device_type.into(),
        }
    }

    /// Check whether this record can take part in classification.
    ///
    /// Returns the reason it cannot, if any.
    pub fn malformation(&self) -> Option<&'static str> {
        if self.device_key.trim().is_empty() {
            return Some("missing device key");
        }
        if !self.latitude.is_finite() || !self.longitude.is_finite() {
            return Some("non-finite coordinates");
        }
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Some("latitude out of range");
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Some("longitude out of range");
        }
        None
    }

    pub fn is_well_formed(&self) -> bool {
        self.malformation().is_none()
    }
}

/// All sightings sharing one `device_key`, ordered newest first.
///
/// Never empty. Built fresh every evaluation cycle by the grouper.
#[derive(Debug, Clone, PartialEq)]
pub struct SightingGroup {
    sightings: Vec<Sighting>,
}

impl SightingGroup {
    pub(crate) fn start(first: Sighting) -> Self {
        Self {
            sightings: vec![first],
        }
    }

    /// Append a sighting that is no newer than the current last member.
    pub(crate) fn push(&mut self, sighting: Sighting) {
        debug_assert_eq!(sighting.device_key, self.device_key());
        self.sightings.push(sighting);
    }

    /// Build a group from arbitrary sightings of a single device.
    ///
    /// Returns `None` if `sightings` is empty or mixes device keys. The
    /// result is sorted newest first (stable for equal timestamps).
    pub fn from_sightings(mut sightings: Vec<Sighting>) -> Option<Self> {
        let key = sightings.first()?.device_key.clone();
        if sightings.iter().any(|s| s.device_key != key) {
            return None;
        }
        sightings.sort_by(|a, b| b.timestamp_ms.cmp(&a.timestamp_ms));
        Some(Self { sightings })
    }

    pub fn device_key(&self) -> &str {
        &self.sightings[0].device_key
    }

    /// Most recent sighting
    pub fn newest(&self) -> &Sighting {
        &self.sightings[0]
    }

    /// Oldest retained sighting
    pub fn oldest(&self) -> &Sighting {
        &self.sightings[self.sightings.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.sightings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sightings.is_empty()
    }

    pub fn sightings(&self) -> &[Sighting] {
        &self.sightings
    }

    /// Elapsed time between oldest and newest sighting.
    pub fn span_ms(&self) -> i64 {
        self.newest().timestamp_ms - self.oldest().timestamp_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_detection() {
        assert!(Sighting::new("AA:BB", 1, 47.0, 8.0, "Tile").is_well_formed());
        assert_eq!(
            Sighting::new("  ", 1, 47.0, 8.0, "Tile").malformation(),
            Some("missing device key")
        );
        assert_eq!(
            Sighting::new("AA:BB", 1, f64::NAN, 8.0, "Tile").malformation(),
            Some("non-finite coordinates")
        );
        assert_eq!(
            Sighting::new("AA:BB", 1, 91.0, 8.0, "Tile").malformation(),
            Some("latitude out of range")
        );
    }

    #[test]
    fn test_deserialize_scan_layer_aliases() {
        let json = r#"{"macAddress":"AA:BB","timestampInMilliSeconds":1700000000000,
                       "lat":47.39,"lng":8.52,"type":"AirTag"}"#;
        let s: Sighting = serde_json::from_str(json).unwrap();
        assert_eq!(s.device_key, "AA:BB");
        assert_eq!(s.timestamp_ms, 1_700_000_000_000);
        assert_eq!(s.device_type, "AirTag");
    }

    #[test]
    fn test_from_sightings_sorts_newest_first() {
        let group = SightingGroup::from_sightings(vec![
            Sighting::new("K", 100, 0.0, 0.0, "x"),
            Sighting::new("K", 300, 0.0, 0.0, "x"),
            Sighting::new("K", 200, 0.0, 0.0, "x"),
        ])
        .unwrap();
        assert_eq!(group.newest().timestamp_ms, 300);
        assert_eq!(group.oldest().timestamp_ms, 100);
        assert_eq!(group.span_ms(), 200);
    }

    #[test]
    fn test_from_sightings_rejects_mixed_keys_and_empty() {
        assert!(SightingGroup::from_sightings(Vec::new()).is_none());
        assert!(SightingGroup::from_sightings(vec![
            Sighting::new("A", 1, 0.0, 0.0, "x"),
            Sighting::new("B", 2, 0.0, 0.0, "x"),
        ])
        .is_none());
    }
}
