use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};

use crate::domain::parking_system_model::ledger::allocation_error::AllocationError;
use crate::domain::parking_system_model::parking_system::ParkingSystem;
use crate::domain::parking_system_model::utils::id::{LocationId, VehicleId};
use crate::error::{Error, Result};

/// Share of steps that bring a new vehicle when both arrivals and departures are possible.
pub const DEFAULT_ARRIVAL_PROBABILITY: f64 = 0.6;

/// Counters of one simulation run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimulationReport {
    pub steps: usize,
    pub arrivals: usize,

    /// Arrivals parked at the recommended facility.
    pub recommended: usize,

    /// Arrivals without a recommendation that still found a slot through `reserve_any`.
    pub fallback_reservations: usize,
    pub queued: usize,
    pub departures: usize,

    /// Queued vehicles placed automatically after a departure.
    pub auto_assigned: usize,
}

/// Drives a [`ParkingSystem`] with random arrivals and departures.
///
/// Each arrival asks for a recommendation from a random graph location and
/// reserves the chosen facility; without a recommendation it falls back to
/// `reserve_any`, which queues the vehicle when everything is full. Each
/// departure releases a random parked vehicle. The ledger invariants are
/// checked after every step.
#[derive(Debug, Clone)]
pub struct Simulator {
    rng: StdRng,
    arrival_probability: f64,
    next_vehicle: u64,
}

impl Simulator {
    pub fn new(seed: u64) -> Self {
        Self::with_arrival_probability(seed, DEFAULT_ARRIVAL_PROBABILITY)
    }

    pub fn with_arrival_probability(seed: u64, arrival_probability: f64) -> Self {
        Self { rng: StdRng::seed_from_u64(seed), arrival_probability: arrival_probability.clamp(0.0, 1.0), next_vehicle: 1 }
    }

    pub fn run(&mut self, system: &mut ParkingSystem, steps: usize) -> Result<SimulationReport> {
        let locations: Vec<LocationId> = system.graph().locations().cloned().collect();
        if locations.is_empty() {
            return Err(Error::InvalidInput("Cannot simulate on a graph without locations".to_string()));
        }

        let mut report = SimulationReport::default();

        for step in 0..steps {
            let has_parked = system.ledger().reservation_count() > 0;
            let arrival = !has_parked || self.rng.random_bool(self.arrival_probability);

            if arrival {
                let Some(origin) = locations.choose(&mut self.rng) else {
                    break;
                };
                self.arrive(system, origin, &mut report);
            } else {
                self.depart(system, &mut report);
            }

            system.ledger().verify_consistency().map_err(|violation| {
                log::error!("Consistency check failed after step {}: {}", step + 1, violation);
                Error::InconsistentState(violation)
            })?;
            report.steps += 1;
        }

        log::info!(
            "Simulation finished: {} steps, {} arrivals, {} departures, {} queued, {} auto-assigned.",
            report.steps,
            report.arrivals,
            report.departures,
            report.queued,
            report.auto_assigned
        );
        Ok(report)
    }

    fn arrive(&mut self, system: &mut ParkingSystem, origin: &LocationId, report: &mut SimulationReport) {
        let vehicle = VehicleId::new(format!("SIM-{:05}", self.next_vehicle));
        self.next_vehicle += 1;
        report.arrivals += 1;

        let outcome = match system.recommend(origin) {
            Some(recommendation) => {
                let chosen = recommendation.chosen().clone();
                system.reserve_at(&vehicle, &chosen).map(|_| true)
            }
            None => system.reserve_any(&vehicle).map(|_| false),
        };

        match outcome {
            Ok(true) => report.recommended += 1,
            Ok(false) => report.fallback_reservations += 1,
            Err(e @ (AllocationError::FacilityFull { .. } | AllocationError::NoCapacity { .. })) => {
                log::debug!("{}", e);
                if e.queued() {
                    report.queued += 1;
                }
            }
            Err(e) => log::warn!("Unexpected refusal for arriving {}: {}", vehicle, e),
        }
    }

    fn depart(&mut self, system: &mut ParkingSystem, report: &mut SimulationReport) {
        let parked = system.ledger().reservations();
        let Some(leaving) = parked.choose(&mut self.rng) else {
            return;
        };

        match system.release(&leaving.vehicle) {
            Ok(release) => {
                report.departures += 1;
                report.auto_assigned += release.auto_assigned.len();
            }
            Err(e) => log::warn!("Departure of {} failed: {}", leaving.vehicle, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::parking_system_model::graph::graph_store::GraphStore;
    use crate::domain::parking_system_model::ledger::facility::Facility;
    use crate::domain::parking_system_model::parking_system::SystemSettings;
    use crate::domain::parking_system_model::utils::audit::MemoryAuditSink;
    use std::sync::Arc;

    fn small_city() -> ParkingSystem {
        let graph = GraphStore::from_roads([("A", "B", 2.0), ("B", "C", 3.0), ("C", "D", 1.5), ("A", "D", 9.0)]).unwrap();
        let facilities = vec![Facility::new("1", "B", 3, 3, 4.0), Facility::new("2", "D", 2, 1, 3.5)];
        let settings = SystemSettings { seed: Some(11), ..SystemSettings::default() };
        ParkingSystem::new(graph, facilities, settings, Arc::new(MemoryAuditSink::new())).unwrap()
    }

    #[test]
    fn arrivals_beyond_capacity_end_up_queued() {
        let mut system = small_city();
        let report = Simulator::with_arrival_probability(3, 1.0).run(&mut system, 10).unwrap();

        assert_eq!(report.steps, 10);
        assert_eq!(report.arrivals, 10);
        assert_eq!(report.recommended + report.fallback_reservations, 4);
        assert_eq!(report.queued, 6);
        assert_eq!(system.status().available_slots, 0);
        assert_eq!(system.ledger().wait_queue().len(), 6);
    }

    #[test]
    fn same_seed_same_run() {
        let mut first = small_city();
        let mut second = small_city();

        let a = Simulator::new(99).run(&mut first, 200).unwrap();
        let b = Simulator::new(99).run(&mut second, 200).unwrap();

        assert_eq!(a, b);
        assert_eq!(first.status(), second.status());
    }
}
