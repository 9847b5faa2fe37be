use crate::domain::parking_system_model::graph::shortest_path::Distance;
use crate::domain::parking_system_model::utils::id::LocationId;

/// Assumed city driving speed for travel time estimates.
pub const AVERAGE_SPEED_KMH: f64 = 40.0;

#[derive(Debug, Clone, PartialEq)]
pub struct RouteLeg {
    pub from: LocationId,
    pub to: LocationId,
    pub distance_km: f64,
}

/// A reconstructed shortest route between two locations.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    /// Visited locations from start to destination. Empty when unreachable.
    pub path: Vec<LocationId>,
    pub legs: Vec<RouteLeg>,
    pub total: Distance,
}

impl Route {
    pub fn is_reachable(&self) -> bool {
        !self.path.is_empty() && !self.total.is_unreachable()
    }

    /// Intermediate locations between start and destination.
    pub fn waypoint_count(&self) -> usize {
        self.path.len().saturating_sub(2)
    }

    /// Travel time in minutes at [`AVERAGE_SPEED_KMH`].
    pub fn estimated_minutes(&self) -> Option<f64> {
        self.total.km().map(|km| km / AVERAGE_SPEED_KMH * 60.0)
    }
}
