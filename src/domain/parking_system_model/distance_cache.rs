use std::collections::HashMap;

use crate::domain::parking_system_model::graph::graph_store::GraphStore;
use crate::domain::parking_system_model::graph::shortest_path::ShortestPathEngine;
use crate::domain::parking_system_model::utils::id::LocationId;

/// Distance stored for pairs without a route. Large enough to rank last, but
/// finite so normalization stays well defined.
pub const DEFAULT_UNREACHABLE_FALLBACK_KM: f64 = 1_000_000.0;

/// Lazily filled, symmetric memo of pairwise road distances.
///
/// Every computed pair is stored under both orderings. Entries are only ever
/// removed all at once through [`DistanceCache::clear`].
#[derive(Debug, Clone)]
pub struct DistanceCache {
    entries: HashMap<(LocationId, LocationId), f64>,
    unreachable_fallback_km: f64,

    /// Number of times the shortest-path engine was run to fill the cache.
    engine_runs: usize,
}

impl Default for DistanceCache {
    fn default() -> Self {
        Self::new(DEFAULT_UNREACHABLE_FALLBACK_KM)
    }
}

impl DistanceCache {
    pub fn new(unreachable_fallback_km: f64) -> Self {
        Self { entries: HashMap::new(), unreachable_fallback_km, engine_runs: 0 }
    }

    /// Road distance between `a` and `b`, computing and memoizing it on a miss.
    ///
    /// Unreachable pairs yield the finite fallback value. Callers that need to
    /// tell "far" from "no route" must ask the [`ShortestPathEngine`] instead.
    pub fn distance_between(&mut self, graph: &GraphStore, a: &LocationId, b: &LocationId) -> f64 {
        if a == b {
            return 0.0;
        }

        if let Some(km) = self.get(a, b) {
            return km;
        }

        self.engine_runs += 1;
        let distance_km = ShortestPathEngine::new(graph).from_source(a).distance_to(b).km().unwrap_or(self.unreachable_fallback_km);

        self.entries.insert((a.clone(), b.clone()), distance_km);
        self.entries.insert((b.clone(), a.clone()), distance_km);

        log::trace!("DistanceCache miss {} <-> {}: {} km", a, b, distance_km);
        distance_km
    }

    /// Cached value under either ordering, without computing anything.
    pub fn get(&self, a: &LocationId, b: &LocationId) -> Option<f64> {
        if a == b {
            return Some(0.0);
        }
        // Both orderings are always written together; the second lookup only
        // matters for caches restored from elsewhere.
        self.entries.get(&(a.clone(), b.clone())).or_else(|| self.entries.get(&(b.clone(), a.clone()))).copied()
    }

    /// Empties the cache and returns the number of unordered pairs dropped.
    pub fn clear(&mut self) -> usize {
        let pairs = self.pair_count();
        self.entries.clear();
        pairs
    }

    /// Number of distinct unordered pairs held.
    pub fn pair_count(&self) -> usize {
        self.entries.len() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn engine_runs(&self) -> usize {
        self.engine_runs
    }

    pub fn unreachable_fallback_km(&self) -> f64 {
        self.unreachable_fallback_km
    }
}
