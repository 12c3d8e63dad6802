//! Classification core: grouping, retention, and threshold evaluation

pub mod evaluator;
pub mod geo;
pub mod grouping;
pub mod retention;

pub use evaluator::{evaluate_group, Rejection, Verdict};
pub use geo::{haversine_distance_m, path_length_m};
pub use grouping::{group_sightings, GroupIndex};
pub use retention::{retention_cutoff_ms, sweep_expired};
