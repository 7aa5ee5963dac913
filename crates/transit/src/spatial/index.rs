//! R-tree nodes for spatial indexing.
//!
//! Wraps stops with their coordinates for nearby-stop queries.
//!
//! ## Two-Stage Filtering
//!
//! The spatial queries use a two-stage filtering approach:
//! 1. **R-tree filter**: Uses Euclidean distance in degrees for fast
//!    approximate filtering, with the search radius widened so no stop inside
//!    the real radius is missed
//! 2. **Haversine filter**: Applies accurate geodesic distance on filtered results

use std::sync::Arc;
use geo::Point;
use rstar::{RTreeObject, AABB, PointDistance};

use crate::provider::static_provider::StopImpl;

// ============================================================================
// Stop Spatial Node
// ============================================================================

#[derive(Clone)]
pub struct StopNode {
    pub stop: Arc<StopImpl>,
    point: [f64; 2],
}

impl StopNode {
    pub fn new(location: Point, stop: Arc<StopImpl>) -> Self {
        Self {
            stop,
            point: [location.x(), location.y()],
        }
    }
}

impl RTreeObject for StopNode {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}

impl PointDistance for StopNode {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.point[0] - point[0];
        let dy = self.point[1] - point[1];
        dx * dx + dy * dy
    }
}
