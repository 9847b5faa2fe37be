use std::collections::BTreeMap;

use crate::api::graph_dto::EdgeDto;
use crate::domain::parking_system_model::utils::id::LocationId;
use crate::error::ConversionError;

/// A directed adjacency entry. Undirected roads are stored as two of these.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub to: LocationId,

    /// Road distance in kilometers. Finite and non-negative.
    pub distance_km: f64,
}

/// Adjacency structure of the city.
///
/// Built once from external road records and never mutated afterwards, so a
/// single instance can be shared behind an `Arc` without synchronization.
/// Every location referenced by an edge owns an entry, possibly empty.
#[derive(Debug, Clone, Default)]
pub struct GraphStore {
    adjacency: BTreeMap<LocationId, Vec<Edge>>,
    road_count: usize,
}

impl TryFrom<Vec<EdgeDto>> for GraphStore {
    type Error = ConversionError;

    fn try_from(dtos: Vec<EdgeDto>) -> Result<Self, Self::Error> {
        GraphStore::from_roads(dtos.iter().map(|dto| (dto.from.as_str(), dto.to.as_str(), dto.distance_km)))
    }
}

impl GraphStore {
    /// Builds the store from `(a, b, km)` road records, inserting `a -> b` and `b -> a`.
    ///
    /// Location names are trimmed and uppercased. Negative, NaN or infinite
    /// distances and empty names are rejected.
    pub fn from_roads<'a, I>(roads: I) -> Result<Self, ConversionError>
    where
        I: IntoIterator<Item = (&'a str, &'a str, f64)>,
    {
        let mut adjacency: BTreeMap<LocationId, Vec<Edge>> = BTreeMap::new();
        let mut road_count = 0;

        for (raw_a, raw_b, distance_km) in roads {
            let a = LocationId::normalized(raw_a);
            let b = LocationId::normalized(raw_b);

            if a.is_empty() || b.is_empty() {
                return Err(ConversionError::EmptyLocation);
            }
            if !distance_km.is_finite() {
                return Err(ConversionError::NonFiniteWeight { from: a.into(), to: b.into() });
            }
            if distance_km < 0.0 {
                return Err(ConversionError::NegativeWeight { from: a.into(), to: b.into(), weight: distance_km });
            }

            adjacency.entry(a.clone()).or_default().push(Edge { to: b.clone(), distance_km });
            adjacency.entry(b.clone()).or_default().push(Edge { to: a, distance_km });
            road_count += 1;
        }

        log::debug!("GraphStore built: {} locations, {} roads.", adjacency.len(), road_count);

        Ok(GraphStore { adjacency, road_count })
    }

    pub fn contains(&self, location: &LocationId) -> bool {
        self.adjacency.contains_key(location)
    }

    /// Outgoing edges of `location`, empty for unknown locations.
    pub fn edges(&self, location: &LocationId) -> &[Edge] {
        self.adjacency.get(location).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Weight of the shortest direct edge between two adjacent locations.
    pub fn direct_distance(&self, from: &LocationId, to: &LocationId) -> Option<f64> {
        self.edges(from).iter().filter(|edge| &edge.to == to).map(|edge| edge.distance_km).reduce(f64::min)
    }

    pub fn locations(&self) -> impl Iterator<Item = &LocationId> {
        self.adjacency.keys()
    }

    pub fn location_count(&self) -> usize {
        self.adjacency.len()
    }

    /// Number of undirected road records the store was built from.
    pub fn road_count(&self) -> usize {
        self.road_count
    }

    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }
}
