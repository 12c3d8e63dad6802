//! Great-circle distance between sightings

use crate::config::defaults::EARTH_MEAN_RADIUS_M;
use crate::types::Sighting;

/// Haversine distance between two WGS-84 points, in meters.
///
/// Spherical approximation on the mean radius; within 0.5% of the
/// ellipsoidal distance, well below consumer GPS error at walking scales.
pub fn haversine_distance_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    // Clamp guards asin against rounding just above 1.0 for antipodal points
    let c = 2.0 * a.sqrt().min(1.0).asin();

    EARTH_MEAN_RADIUS_M * c
}

/// Distance between two sightings, in meters.
pub fn distance_between(a: &Sighting, b: &Sighting) -> f64 {
    haversine_distance_m(a.latitude, a.longitude, b.latitude, b.longitude)
}

/// Sum of distances between consecutive sightings, walked in slice order.
pub fn path_length_m(sightings: &[Sighting]) -> f64 {
    sightings
        .windows(2)
        .map(|pair| distance_between(&pair[0], &pair[1]))
        .sum()
}
