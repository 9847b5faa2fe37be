use std::fmt;
use std::sync::Arc;

use crate::domain::parking_system_model::distance_cache::{DEFAULT_UNREACHABLE_FALLBACK_KM, DistanceCache};
use crate::domain::parking_system_model::graph::graph_store::GraphStore;
use crate::domain::parking_system_model::graph::route::Route;
use crate::domain::parking_system_model::graph::shortest_path::ShortestPathEngine;
use crate::domain::parking_system_model::ledger::allocation_error::AllocationError;
use crate::domain::parking_system_model::ledger::allocation_ledger::{
    AllocationLedger, Assignment, EmergencyReport, ReleaseReport, WaitQueuePolicy,
};
use crate::domain::parking_system_model::ledger::facility::Facility;
use crate::domain::parking_system_model::ledger::wait_queue::WaitingVehicle;
use crate::domain::parking_system_model::scoring::candidate_selector::{CandidateSelector, Selection};
use crate::domain::parking_system_model::scoring::facility_scorer::{FacilityScorer, ScoreWeights, ScoredFacility};
use crate::domain::parking_system_model::utils::audit::{AuditKind, AuditSink};
use crate::domain::parking_system_model::utils::id::{FacilityId, LocationId, VehicleId};
use crate::error::{Error, Result};

/// Tunables of a [`ParkingSystem`].
#[derive(Debug, Clone, PartialEq)]
pub struct SystemSettings {
    /// Seed of the recommender. Entropy-seeded when `None`.
    pub seed: Option<u64>,
    pub policy: WaitQueuePolicy,
    pub unreachable_fallback_km: f64,
    pub weights: ScoreWeights,
}

impl Default for SystemSettings {
    fn default() -> Self {
        Self {
            seed: None,
            policy: WaitQueuePolicy::default(),
            unreachable_fallback_km: DEFAULT_UNREACHABLE_FALLBACK_KM,
            weights: ScoreWeights::default(),
        }
    }
}

/// Ranked candidates together with the facility drawn among them.
#[derive(Debug, Clone, PartialEq)]
pub struct Recommendation {
    pub origin: LocationId,
    pub ranked: Vec<ScoredFacility>,
    pub selection: Selection,
}

impl Recommendation {
    pub fn chosen(&self) -> &FacilityId {
        &self.selection.chosen.facility
    }
}

/// Point-in-time summary of the whole system.
#[derive(Debug, Clone, PartialEq)]
pub struct SystemStatus {
    pub facility_count: usize,
    pub facilities_with_capacity: usize,
    pub total_slots: u64,
    pub available_slots: u64,
    pub occupied_slots: u64,
    pub parked: Vec<Assignment>,
    pub waiting: Vec<VehicleId>,
    pub cached_pairs: usize,
}

impl SystemStatus {
    /// Share of occupied slots, zero without any slots.
    pub fn occupancy_ratio(&self) -> f64 {
        if self.total_slots == 0 { 0.0 } else { self.occupied_slots as f64 / self.total_slots as f64 }
    }
}

impl fmt::Display for SystemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Facilities: {} ({} with free slots)", self.facility_count, self.facilities_with_capacity)?;
        writeln!(
            f,
            "Slots: {} total | {} available | {} occupied ({:.1}%)",
            self.total_slots,
            self.available_slots,
            self.occupied_slots,
            self.occupancy_ratio() * 100.0
        )?;
        writeln!(f, "Parked vehicles: {}", self.parked.len())?;
        writeln!(f, "Waiting vehicles: {}", self.waiting.len())?;
        write!(f, "Cached distance pairs: {}", self.cached_pairs)
    }
}

/// Routing, recommendation and allocation over one city graph.
///
/// The graph is read-only for the lifetime of the system. All mutable state
/// (cache, ledger, queue, selector) sits behind `&mut self`.
#[derive(Debug)]
pub struct ParkingSystem {
    graph: Arc<GraphStore>,
    distance_cache: DistanceCache,
    scorer: FacilityScorer,
    selector: CandidateSelector,
    ledger: AllocationLedger,
    audit: Arc<dyn AuditSink>,
}

impl ParkingSystem {
    pub fn new(graph: GraphStore, facilities: Vec<Facility>, settings: SystemSettings, audit: Arc<dyn AuditSink>) -> Result<Self> {
        if !settings.unreachable_fallback_km.is_finite() || settings.unreachable_fallback_km < 0.0 {
            return Err(Error::InvalidInput(format!(
                "Unreachable fallback distance must be finite and non-negative, got {}",
                settings.unreachable_fallback_km
            )));
        }

        for facility in facilities.iter().filter(|facility| !graph.contains(&facility.location)) {
            log::warn!("Facility {} sits at {}, which has no roads; it is unreachable from everywhere else.", facility.id, facility.location);
        }

        let ledger = AllocationLedger::new(facilities, settings.policy, audit.clone())?;

        let selector = match settings.seed {
            Some(seed) => CandidateSelector::seeded(seed),
            None => CandidateSelector::from_os_rng(),
        };

        log::info!(
            "ParkingSystem constructed: {} locations, {} roads, {} facilities.",
            graph.location_count(),
            graph.road_count(),
            ledger.facilities().count()
        );

        Ok(Self {
            graph: Arc::new(graph),
            distance_cache: DistanceCache::new(settings.unreachable_fallback_km),
            scorer: FacilityScorer::new(settings.weights),
            selector,
            ledger,
            audit,
        })
    }

    //------------------
    // --- Routing ---
    //------------------

    pub fn route(&self, from: &LocationId, to: &LocationId) -> Route {
        ShortestPathEngine::new(&self.graph).route(from, to)
    }

    /// Cached road distance; unreachable pairs yield the fallback value.
    pub fn distance_between(&mut self, a: &LocationId, b: &LocationId) -> f64 {
        self.distance_cache.distance_between(&self.graph, a, b)
    }

    /// Empties the distance cache and returns the number of pairs dropped.
    pub fn clear_cache(&mut self) -> usize {
        let cleared = self.distance_cache.clear();
        self.audit.record(AuditKind::CacheClear, &format!("Cleared {} cached distance pairs", cleared));
        cleared
    }

    //-----------------------
    // --- Recommendation ---
    //-----------------------

    /// Facilities with free slots, best first.
    pub fn rank_facilities(&mut self, origin: &LocationId) -> Vec<ScoredFacility> {
        let candidates: Vec<&Facility> = self.ledger.facilities_with_capacity().collect();
        self.scorer.score(origin, &candidates, &mut self.distance_cache, &self.graph)
    }

    /// Ranks the facilities and draws one of the best. `None` when nothing has capacity.
    pub fn recommend(&mut self, origin: &LocationId) -> Option<Recommendation> {
        let ranked = self.rank_facilities(origin);
        let Some(selection) = self.selector.select(&ranked) else {
            log::info!("No facility with free slots to recommend for {}.", origin);
            return None;
        };

        self.audit.record(
            AuditKind::SmartRecommend,
            &format!(
                "Location {} -> Lot {} at {} | Score: {:.3} | Distance: {:.1} km",
                origin, selection.chosen.facility, selection.chosen.location, selection.chosen.score, selection.chosen.distance_km
            ),
        );

        Some(Recommendation { origin: origin.clone(), ranked, selection })
    }

    //-------------------
    // --- Allocation ---
    //-------------------

    pub fn reserve_at(&mut self, vehicle: &VehicleId, facility: &FacilityId) -> std::result::Result<FacilityId, AllocationError> {
        self.ledger.reserve_at(vehicle, facility)
    }

    pub fn reserve_any(&mut self, vehicle: &VehicleId) -> std::result::Result<FacilityId, AllocationError> {
        self.ledger.reserve_any(vehicle)
    }

    pub fn release(&mut self, vehicle: &VehicleId) -> std::result::Result<ReleaseReport, AllocationError> {
        self.ledger.release(vehicle)
    }

    pub fn emergency_release(&mut self, facility: &FacilityId) -> std::result::Result<EmergencyReport, AllocationError> {
        self.ledger.emergency_release(facility)
    }

    pub fn enqueue(&mut self, vehicle: &VehicleId, requested: Option<FacilityId>) -> bool {
        self.ledger.enqueue(vehicle, requested)
    }

    pub fn remove_from_wait_queue(&mut self, vehicle: &VehicleId) -> bool {
        self.ledger.remove_from_wait_queue(vehicle)
    }

    pub fn restore_wait_queue(&mut self, entries: Vec<WaitingVehicle>) -> usize {
        self.ledger.restore_wait_queue(entries)
    }

    pub fn restore_reservations(&mut self, entries: Vec<Assignment>) -> usize {
        self.ledger.restore_reservations(entries)
    }

    //----------------
    // --- Queries ---
    //----------------

    /// The facility `vehicle` is parked at.
    pub fn find_vehicle(&self, vehicle: &VehicleId) -> Option<&Facility> {
        self.ledger.facility_of(vehicle)
    }

    pub fn status(&self) -> SystemStatus {
        let (total_slots, available_slots) = self.ledger.facilities().fold((0u64, 0u64), |(total, available), facility| {
            (total + u64::from(facility.total()), available + u64::from(facility.available()))
        });

        SystemStatus {
            facility_count: self.ledger.facilities().count(),
            facilities_with_capacity: self.ledger.facilities_with_capacity().count(),
            total_slots,
            available_slots,
            occupied_slots: total_slots - available_slots,
            parked: self.ledger.reservations(),
            waiting: self.ledger.wait_queue().snapshot(),
            cached_pairs: self.distance_cache.pair_count(),
        }
    }

    pub fn graph(&self) -> &GraphStore {
        &self.graph
    }

    pub fn shared_graph(&self) -> Arc<GraphStore> {
        Arc::clone(&self.graph)
    }

    pub fn ledger(&self) -> &AllocationLedger {
        &self.ledger
    }

    pub fn distance_cache(&self) -> &DistanceCache {
        &self.distance_cache
    }

    pub fn audit(&self) -> Arc<dyn AuditSink> {
        Arc::clone(&self.audit)
    }
}
