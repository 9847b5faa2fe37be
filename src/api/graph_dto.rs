use serde::{Deserialize, Serialize};

/// One road record of the city graph file: `A,B,distanceKm`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct EdgeDto {
    pub from: String,
    pub to: String,
    pub distance_km: f64,
}
