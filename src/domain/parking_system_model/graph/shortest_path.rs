use ordered_float::OrderedFloat;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::fmt;

use crate::domain::parking_system_model::graph::graph_store::GraphStore;
use crate::domain::parking_system_model::graph::route::{Route, RouteLeg};
use crate::domain::parking_system_model::utils::id::LocationId;

/// Result of a shortest-path query.
///
/// `Unreachable` is an ordinary outcome, not an error, and sorts after every
/// finite distance.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub enum Distance {
    Km(f64),
    Unreachable,
}

impl Distance {
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Distance::Unreachable)
    }

    pub fn km(&self) -> Option<f64> {
        match self {
            Distance::Km(km) => Some(*km),
            Distance::Unreachable => None,
        }
    }
}

impl fmt::Display for Distance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Distance::Km(km) => write!(f, "{:.1} km", km),
            Distance::Unreachable => f.write_str("unreachable"),
        }
    }
}

/// Single-source distances plus the predecessor links of one shortest-path tree.
#[derive(Debug, Clone)]
pub struct ShortestPaths {
    source: LocationId,
    distances: HashMap<LocationId, Distance>,
    predecessors: HashMap<LocationId, LocationId>,
}

impl ShortestPaths {
    pub fn source(&self) -> &LocationId {
        &self.source
    }

    /// Distance from the source. Locations the graph does not know are unreachable.
    pub fn distance_to(&self, destination: &LocationId) -> Distance {
        self.distances.get(destination).copied().unwrap_or(Distance::Unreachable)
    }

    pub fn distances(&self) -> &HashMap<LocationId, Distance> {
        &self.distances
    }

    pub fn predecessors(&self) -> &HashMap<LocationId, LocationId> {
        &self.predecessors
    }

    /// One shortest path from the source to `destination`, empty when there is none.
    pub fn path_to(&self, destination: &LocationId) -> Vec<LocationId> {
        reconstruct_path(&self.source, destination, &self.predecessors)
    }
}

/// Walks predecessor links back from `destination`.
///
/// Returns `[source]` when both ends are equal, whatever `predecessors`
/// contains, and an empty path when the walk does not end at `source`.
pub fn reconstruct_path(source: &LocationId, destination: &LocationId, predecessors: &HashMap<LocationId, LocationId>) -> Vec<LocationId> {
    if source == destination {
        return vec![source.clone()];
    }

    let mut path = vec![destination.clone()];
    let mut seen: HashSet<&LocationId> = HashSet::from([destination]);
    let mut current = destination;

    while let Some(previous) = predecessors.get(current) {
        // Foreign predecessor maps may contain cycles.
        if !seen.insert(previous) {
            return Vec::new();
        }
        path.push(previous.clone());
        if previous == source {
            path.reverse();
            return path;
        }
        current = previous;
    }

    Vec::new()
}

/// Dijkstra over a [`GraphStore`]. Holds no state besides the borrowed graph.
#[derive(Debug, Clone, Copy)]
pub struct ShortestPathEngine<'a> {
    graph: &'a GraphStore,
}

impl<'a> ShortestPathEngine<'a> {
    pub fn new(graph: &'a GraphStore) -> Self {
        Self { graph }
    }

    /// Shortest distances from `source` to every location of the graph.
    ///
    /// A source unknown to the graph is treated as an isolated synthetic node:
    /// its own distance is zero and every other location is unreachable.
    pub fn from_source(&self, source: &LocationId) -> ShortestPaths {
        let mut distances: HashMap<LocationId, Distance> =
            self.graph.locations().map(|location| (location.clone(), Distance::Unreachable)).collect();
        let mut predecessors: HashMap<LocationId, LocationId> = HashMap::new();

        if !self.graph.contains(source) {
            log::debug!("Shortest path requested from unknown location {}; treating it as isolated.", source);
        }
        distances.insert(source.clone(), Distance::Km(0.0));

        // Min-heap on (distance, insertion sequence). The sequence makes equal
        // distances pop in push order.
        let mut frontier: BinaryHeap<Reverse<(OrderedFloat<f64>, u64, LocationId)>> = BinaryHeap::new();
        let mut sequence: u64 = 0;
        let mut settled: HashSet<LocationId> = HashSet::new();

        frontier.push(Reverse((OrderedFloat(0.0), sequence, source.clone())));

        while let Some(Reverse((OrderedFloat(current_km), _, current))) = frontier.pop() {
            if !settled.insert(current.clone()) {
                continue;
            }

            for edge in self.graph.edges(&current) {
                let candidate_km = current_km + edge.distance_km;
                let improves = match distances.get(&edge.to) {
                    Some(Distance::Km(known_km)) => candidate_km < *known_km,
                    _ => true,
                };

                if improves {
                    distances.insert(edge.to.clone(), Distance::Km(candidate_km));
                    predecessors.insert(edge.to.clone(), current.clone());
                    sequence += 1;
                    frontier.push(Reverse((OrderedFloat(candidate_km), sequence, edge.to.clone())));
                }
            }
        }

        log::trace!("Dijkstra from {} settled {} of {} locations.", source, settled.len(), distances.len());

        ShortestPaths { source: source.clone(), distances, predecessors }
    }

    pub fn distance(&self, from: &LocationId, to: &LocationId) -> Distance {
        if from == to {
            return Distance::Km(0.0);
        }
        self.from_source(from).distance_to(to)
    }

    /// Shortest route with per-leg distances. Unreachable destinations yield an
    /// empty path and [`Distance::Unreachable`].
    pub fn route(&self, from: &LocationId, to: &LocationId) -> Route {
        if from == to {
            return Route { path: vec![from.clone()], legs: Vec::new(), total: Distance::Km(0.0) };
        }

        let tree = self.from_source(from);
        let total = tree.distance_to(to);
        let path = tree.path_to(to);

        if total.is_unreachable() || path.is_empty() {
            log::debug!("NoPathFound: {} => {}", from, to);
            return Route { path: Vec::new(), legs: Vec::new(), total: Distance::Unreachable };
        }

        let legs = path
            .windows(2)
            .map(|pair| {
                let (leg_from, leg_to) = (&pair[0], &pair[1]);
                let distance_km = self.graph.direct_distance(leg_from, leg_to).unwrap_or_else(|| {
                    let start = tree.distance_to(leg_from).km().unwrap_or(0.0);
                    let end = tree.distance_to(leg_to).km().unwrap_or(start);
                    (end - start).abs()
                });
                RouteLeg { from: leg_from.clone(), to: leg_to.clone(), distance_km }
            })
            .collect();

        Route { path, legs, total }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(name: &str) -> LocationId {
        LocationId::new(name)
    }

    fn triangle() -> GraphStore {
        GraphStore::from_roads([("A", "B", 5.0), ("B", "C", 3.0), ("A", "C", 20.0)]).unwrap()
    }

    #[test]
    fn detour_beats_direct_road() {
        let graph = triangle();
        let tree = ShortestPathEngine::new(&graph).from_source(&loc("A"));

        assert_eq!(tree.distance_to(&loc("C")), Distance::Km(8.0));
        assert_eq!(tree.distance_to(&loc("A")), Distance::Km(0.0));
        assert_eq!(tree.path_to(&loc("C")), vec![loc("A"), loc("B"), loc("C")]);
    }

    #[test]
    fn disconnected_location_is_unreachable() {
        let graph = GraphStore::from_roads([("A", "B", 1.0), ("X", "Y", 1.0)]).unwrap();
        let tree = ShortestPathEngine::new(&graph).from_source(&loc("A"));

        assert!(tree.distance_to(&loc("Y")).is_unreachable());
        assert_eq!(tree.distance_to(&loc("Y")).km(), None);
        assert!(tree.path_to(&loc("Y")).is_empty());
        assert!(tree.distance_to(&loc("NOWHERE")).is_unreachable());
    }

    #[test]
    fn unknown_source_is_an_isolated_zero_distance_node() {
        let graph = triangle();
        let tree = ShortestPathEngine::new(&graph).from_source(&loc("USER"));

        assert_eq!(tree.distance_to(&loc("USER")), Distance::Km(0.0));
        assert!(tree.distance_to(&loc("A")).is_unreachable());
        assert!(tree.distance_to(&loc("C")).is_unreachable());
        assert!(tree.predecessors().is_empty());
        assert_eq!(tree.path_to(&loc("USER")), vec![loc("USER")]);
    }

    #[test]
    fn same_endpoints_reconstruct_to_single_location() {
        let mut bogus = HashMap::new();
        bogus.insert(loc("A"), loc("B"));
        bogus.insert(loc("B"), loc("A"));

        assert_eq!(reconstruct_path(&loc("A"), &loc("A"), &bogus), vec![loc("A")]);
        assert_eq!(reconstruct_path(&loc("Q"), &loc("Q"), &HashMap::new()), vec![loc("Q")]);
    }

    #[test]
    fn walk_that_misses_the_source_is_empty() {
        let mut predecessors = HashMap::new();
        predecessors.insert(loc("C"), loc("B"));

        assert!(reconstruct_path(&loc("A"), &loc("C"), &predecessors).is_empty());
    }

    #[test]
    fn cyclic_predecessors_do_not_loop() {
        let mut predecessors = HashMap::new();
        predecessors.insert(loc("C"), loc("B"));
        predecessors.insert(loc("B"), loc("C"));

        assert!(reconstruct_path(&loc("A"), &loc("C"), &predecessors).is_empty());
    }

    #[test]
    fn zero_weight_roads_are_allowed() {
        let graph = GraphStore::from_roads([("A", "B", 0.0), ("B", "C", 0.0)]).unwrap();
        let engine = ShortestPathEngine::new(&graph);

        assert_eq!(engine.distance(&loc("A"), &loc("C")), Distance::Km(0.0));
        assert_eq!(engine.route(&loc("A"), &loc("C")).path.len(), 3);
    }

    #[test]
    fn route_reports_legs_and_total() {
        let graph = triangle();
        let route = ShortestPathEngine::new(&graph).route(&loc("A"), &loc("C"));

        assert_eq!(route.total, Distance::Km(8.0));
        assert_eq!(route.legs.len(), 2);
        assert_eq!(route.legs[0].distance_km, 5.0);
        assert_eq!(route.legs[1].distance_km, 3.0);
        assert_eq!(route.waypoint_count(), 1);
    }

    #[test]
    fn route_to_self_is_trivial_even_off_graph() {
        let graph = triangle();
        let route = ShortestPathEngine::new(&graph).route(&loc("ELSEWHERE"), &loc("ELSEWHERE"));

        assert_eq!(route.path, vec![loc("ELSEWHERE")]);
        assert_eq!(route.total, Distance::Km(0.0));
    }

    #[test]
    fn unreachable_ordering_is_after_every_distance() {
        assert!(Distance::Km(f64::MAX) < Distance::Unreachable);
        assert!(Distance::Km(1.0) < Distance::Km(2.0));
    }
}
