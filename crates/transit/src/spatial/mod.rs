//! Spatial indexing and query utilities.

pub mod index;
pub mod queries;

pub use queries::{bearing, bearing_difference, haversine_distance, path_length};
