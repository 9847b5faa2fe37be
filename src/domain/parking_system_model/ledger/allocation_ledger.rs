use slotmap::{SecondaryMap, SlotMap, new_key_type};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::api::parking_config_dto::WaitQueuePolicyDto;
use crate::domain::parking_system_model::ledger::allocation_error::AllocationError;
use crate::domain::parking_system_model::ledger::facility::Facility;
use crate::domain::parking_system_model::ledger::wait_queue::{WaitQueue, WaitingVehicle};
use crate::domain::parking_system_model::utils::audit::{AuditKind, AuditSink};
use crate::domain::parking_system_model::utils::id::{FacilityId, VehicleId};
use crate::error::ConversionError;

new_key_type! {
    pub struct FacilityKey;
}

/// How queued vehicles are placed when capacity frees up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WaitQueuePolicy {
    /// Every queued vehicle goes to the best facility available at drain time.
    #[default]
    ReassignBestAvailable,

    /// Vehicles that asked for a specific facility only get a slot there. A
    /// head-of-queue vehicle whose facility is still full stops the drain.
    ///
    /// The queue stays strictly FIFO: vehicles behind a blocked head keep
    /// waiting even while other facilities have free slots.
    PinToRequested,
}

impl From<WaitQueuePolicyDto> for WaitQueuePolicy {
    fn from(dto: WaitQueuePolicyDto) -> Self {
        match dto {
            WaitQueuePolicyDto::ReassignBestAvailable => WaitQueuePolicy::ReassignBestAvailable,
            WaitQueuePolicyDto::PinToRequested => WaitQueuePolicy::PinToRequested,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub vehicle: VehicleId,
    pub facility: FacilityId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseReport {
    pub vehicle: VehicleId,
    pub facility: FacilityId,

    /// Queued vehicles placed by the drain that followed the release.
    pub auto_assigned: Vec<Assignment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmergencyReport {
    pub facility: FacilityId,
    pub freed_vehicles: Vec<VehicleId>,

    /// Slots that were occupied before the release, including unattributed ones.
    pub freed_slots: u32,
    pub auto_assigned: Vec<Assignment>,
}

/// Whether a refused reservation falls back to the wait queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QueueFallback {
    Enqueue,
    Skip,
}

/// Vehicle-to-facility assignments, per-facility counters and the wait queue.
///
/// A vehicle is either unparked or parked at exactly one facility. For every
/// facility `available + occupied == total`, where `occupied` counts the
/// reservations pointing at it plus the slots that were already taken when the
/// facility was loaded ("unattributed" occupancy). All mutation goes through
/// `&mut self`, so the check-then-act sequences below cannot interleave.
#[derive(Debug)]
pub struct AllocationLedger {
    facilities: SlotMap<FacilityKey, Facility>,
    name_index: HashMap<FacilityId, FacilityKey>,
    reservations: HashMap<VehicleId, FacilityKey>,
    unattributed: SecondaryMap<FacilityKey, u32>,
    wait_queue: WaitQueue,
    policy: WaitQueuePolicy,
    audit: Arc<dyn AuditSink>,
}

impl AllocationLedger {
    /// Registers `facilities` in the given order. Duplicate ids are rejected.
    pub fn new(facilities: Vec<Facility>, policy: WaitQueuePolicy, audit: Arc<dyn AuditSink>) -> Result<Self, ConversionError> {
        let mut ledger = AllocationLedger {
            facilities: SlotMap::with_key(),
            name_index: HashMap::new(),
            reservations: HashMap::new(),
            unattributed: SecondaryMap::new(),
            wait_queue: WaitQueue::new(),
            policy,
            audit,
        };

        for facility in facilities {
            if ledger.name_index.contains_key(&facility.id) {
                return Err(ConversionError::DuplicateFacility(facility.id.to_string()));
            }

            let id = facility.id.clone();
            let preoccupied = facility.occupied();
            let key = ledger.facilities.insert(facility);
            ledger.name_index.insert(id, key);

            if preoccupied > 0 {
                ledger.unattributed.insert(key, preoccupied);
            }
        }

        log::info!("AllocationLedger ready: {} facilities, policy {:?}.", ledger.facilities.len(), policy);
        Ok(ledger)
    }

    //-----------------
    // --- Queries ---
    //-----------------

    pub fn policy(&self) -> WaitQueuePolicy {
        self.policy
    }

    pub fn facility(&self, id: &FacilityId) -> Option<&Facility> {
        self.name_index.get(id).and_then(|key| self.facilities.get(*key))
    }

    /// All facilities in registration order.
    pub fn facilities(&self) -> impl Iterator<Item = &Facility> {
        self.facilities.values()
    }

    pub fn facilities_with_capacity(&self) -> impl Iterator<Item = &Facility> {
        self.facilities.values().filter(|facility| facility.has_capacity())
    }

    pub fn has_capacity(&self) -> bool {
        self.facilities.values().any(Facility::has_capacity)
    }

    pub fn is_parked(&self, vehicle: &VehicleId) -> bool {
        self.reservations.contains_key(vehicle)
    }

    /// The facility `vehicle` is parked at.
    pub fn facility_of(&self, vehicle: &VehicleId) -> Option<&Facility> {
        self.reservations.get(vehicle).and_then(|key| self.facilities.get(*key))
    }

    /// Active reservations sorted by vehicle.
    pub fn reservations(&self) -> Vec<Assignment> {
        let mut assignments: Vec<Assignment> = self
            .reservations
            .iter()
            .filter_map(|(vehicle, key)| {
                self.facilities.get(*key).map(|facility| Assignment { vehicle: vehicle.clone(), facility: facility.id.clone() })
            })
            .collect();
        assignments.sort_by(|a, b| a.vehicle.cmp(&b.vehicle));
        assignments
    }

    pub fn reservation_count(&self) -> usize {
        self.reservations.len()
    }

    /// Vehicles parked at `id`, sorted.
    pub fn vehicles_at(&self, id: &FacilityId) -> Vec<VehicleId> {
        let Some(key) = self.name_index.get(id).copied() else {
            return Vec::new();
        };
        let mut vehicles: Vec<VehicleId> =
            self.reservations.iter().filter(|(_, parked_at)| **parked_at == key).map(|(vehicle, _)| vehicle.clone()).collect();
        vehicles.sort();
        vehicles
    }

    /// Occupied slots of `id`: its reservations plus unattributed occupancy.
    pub fn occupied_count(&self, id: &FacilityId) -> Option<u32> {
        let key = self.name_index.get(id).copied()?;
        Some(self.occupied_by_key(key))
    }

    fn occupied_by_key(&self, key: FacilityKey) -> u32 {
        let reserved = self.reservations.values().filter(|parked_at| **parked_at == key).count();
        let reserved = u32::try_from(reserved).unwrap_or(u32::MAX);
        reserved.saturating_add(self.unattributed.get(key).copied().unwrap_or(0))
    }

    pub fn wait_queue(&self) -> &WaitQueue {
        &self.wait_queue
    }

    //------------------------
    // --- Reservation API ---
    //------------------------

    /// Reserves a slot for `vehicle` at facility `id`.
    ///
    /// Refused without any state change when the vehicle is already parked or
    /// the facility is unknown. When the facility is full the vehicle is put
    /// in the wait queue and [`AllocationError::FacilityFull`] is returned.
    pub fn reserve_at(&mut self, vehicle: &VehicleId, id: &FacilityId) -> Result<FacilityId, AllocationError> {
        self.try_reserve_at(vehicle, id, QueueFallback::Enqueue)
    }

    /// Reserves a slot at the facility with the most free slots, higher rating
    /// breaking ties and registration order after that. Queues the vehicle when
    /// nothing is free.
    pub fn reserve_any(&mut self, vehicle: &VehicleId) -> Result<FacilityId, AllocationError> {
        self.try_reserve_any(vehicle, QueueFallback::Enqueue)
    }

    /// Frees the slot held by `vehicle`, then drains the wait queue.
    pub fn release(&mut self, vehicle: &VehicleId) -> Result<ReleaseReport, AllocationError> {
        let Some(key) = self.reservations.remove(vehicle) else {
            log::debug!("Release refused: {} is not parked.", vehicle);
            return Err(AllocationError::VehicleNotParked(vehicle.clone()));
        };

        let Some(facility) = self.facilities.get_mut(key) else {
            log::error!("Reservation of {} pointed at a facility missing from the ledger.", vehicle);
            return Err(AllocationError::VehicleNotParked(vehicle.clone()));
        };

        facility.free_one();
        let facility_id = facility.id.clone();
        self.audit.record(
            AuditKind::Free,
            &format!("{} from lot {} | Total available: {}/{}", vehicle, facility_id, facility.available(), facility.total()),
        );

        let auto_assigned = self.drain_wait_queue();

        Ok(ReleaseReport { vehicle: vehicle.clone(), facility: facility_id, auto_assigned })
    }

    /// Unparks every vehicle at facility `id`, marks all of its slots free and
    /// drains the wait queue.
    pub fn emergency_release(&mut self, id: &FacilityId) -> Result<EmergencyReport, AllocationError> {
        let Some(key) = self.name_index.get(id).copied() else {
            return Err(AllocationError::FacilityNotFound(id.clone()));
        };

        let freed_vehicles = self.vehicles_at(id);
        for vehicle in &freed_vehicles {
            self.reservations.remove(vehicle);
            self.audit.record(AuditKind::EmergencyFree, &format!("{} from lot {}", vehicle, id));
        }
        self.unattributed.remove(key);

        let freed_slots = match self.facilities.get_mut(key) {
            Some(facility) => facility.force_free_all(),
            None => 0,
        };

        self.audit.record(
            AuditKind::EmergencyFreeSummary,
            &format!("Lot {} | Vehicles freed: {} | Slots freed: {}", id, freed_vehicles.len(), freed_slots),
        );
        log::warn!("Emergency release of lot {}: {} vehicles, {} slots.", id, freed_vehicles.len(), freed_slots);

        let auto_assigned = self.drain_wait_queue();

        Ok(EmergencyReport { facility: id.clone(), freed_vehicles, freed_slots, auto_assigned })
    }

    //----------------------
    // --- Wait queue API ---
    //----------------------

    /// Queues `vehicle` directly. Parked and already waiting vehicles are refused.
    pub fn enqueue(&mut self, vehicle: &VehicleId, requested: Option<FacilityId>) -> bool {
        let added = self.push_waiting(vehicle, requested.clone());
        if added {
            let detail = match requested {
                Some(facility) => format!("{} for lot {}", vehicle, facility),
                None => vehicle.to_string(),
            };
            self.audit.record(AuditKind::WaitlistAdd, &detail);
        }
        added
    }

    /// Administrative removal from the wait queue.
    pub fn remove_from_wait_queue(&mut self, vehicle: &VehicleId) -> bool {
        let removed = self.wait_queue.remove(vehicle);
        if removed {
            log::info!("{} removed from the wait queue.", vehicle);
        }
        removed
    }

    /// Restores a persisted queue snapshot. Parked vehicles, duplicates and
    /// requests for unknown facilities are dropped. Returns the number restored.
    pub fn restore_wait_queue(&mut self, entries: impl IntoIterator<Item = WaitingVehicle>) -> usize {
        let mut restored = 0;
        for entry in entries {
            let requested = entry.requested.filter(|facility| {
                let known = self.name_index.contains_key(facility);
                if !known {
                    log::warn!("Wait queue entry {} requested unknown facility {}; keeping it unpinned.", entry.vehicle, facility);
                }
                known
            });

            if self.push_waiting(&entry.vehicle, requested) {
                restored += 1;
            }
        }
        log::debug!("Restored {} wait queue entries.", restored);
        restored
    }

    /// Re-attaches persisted assignments to the loaded facilities.
    ///
    /// A restored vehicle first claims a slot that was loaded as occupied,
    /// then a free one. Entries for unknown facilities, vehicles already
    /// parked and facilities with no slot left are skipped. Returns the
    /// number restored.
    pub fn restore_reservations(&mut self, entries: impl IntoIterator<Item = Assignment>) -> usize {
        let mut restored = 0;
        for Assignment { vehicle, facility } in entries {
            if self.is_parked(&vehicle) {
                log::warn!("Reservation of {} at lot {} skipped: already restored elsewhere.", vehicle, facility);
                continue;
            }
            let Some(key) = self.name_index.get(&facility).copied() else {
                log::warn!("Reservation of {} skipped: lot {} not found.", vehicle, facility);
                continue;
            };

            let claimed = match self.unattributed.get_mut(key) {
                Some(count) if *count > 0 => {
                    *count -= 1;
                    true
                }
                _ => self.facilities.get_mut(key).is_some_and(Facility::occupy_one),
            };
            if !claimed {
                log::warn!("Reservation of {} skipped: lot {} has no slot left.", vehicle, facility);
                continue;
            }

            self.wait_queue.remove(&vehicle);
            self.reservations.insert(vehicle, key);
            restored += 1;
        }
        log::debug!("Restored {} reservations.", restored);
        restored
    }

    /// Places queued vehicles while any facility has a free slot.
    ///
    /// A failed attempt puts the vehicle back at the head of the queue and
    /// ends the pass, so one drain never retries the same vehicle.
    pub fn drain_wait_queue(&mut self) -> Vec<Assignment> {
        let mut assigned = Vec::new();

        while !self.wait_queue.is_empty() && self.has_capacity() {
            let Some(entry) = self.wait_queue.dequeue() else {
                break;
            };

            if self.is_parked(&entry.vehicle) {
                log::warn!("{} was waiting while parked; dropped from the queue.", entry.vehicle);
                continue;
            }

            let attempt = match (self.policy, &entry.requested) {
                (WaitQueuePolicy::PinToRequested, Some(requested)) => self.try_reserve_at(&entry.vehicle, requested, QueueFallback::Skip),
                _ => self.try_reserve_any(&entry.vehicle, QueueFallback::Skip),
            };

            match attempt {
                Ok(facility) => {
                    self.audit.record(AuditKind::WaitlistAssign, &format!("Auto-assigned {} to lot {}", entry.vehicle, facility));
                    assigned.push(Assignment { vehicle: entry.vehicle, facility });
                }
                Err(e) => {
                    log::debug!("Wait queue drain stopped at {}: {}", entry.vehicle, e);
                    self.wait_queue.requeue_front(entry);
                    break;
                }
            }
        }

        if !assigned.is_empty() {
            log::info!("Automatically assigned {} vehicles from the wait queue.", assigned.len());
        }
        assigned
    }

    //--------------------
    // --- Consistency ---
    //--------------------

    /// Checks the ledger invariants and describes the first violation found.
    pub fn verify_consistency(&self) -> Result<(), String> {
        for (key, facility) in self.facilities.iter() {
            if facility.available() > facility.total() {
                return Err(format!("Facility {}: available {} exceeds total {}", facility.id, facility.available(), facility.total()));
            }
            let occupied = self.occupied_by_key(key);
            if u64::from(facility.available()) + u64::from(occupied) != u64::from(facility.total()) {
                return Err(format!(
                    "Facility {}: available {} + occupied {} != total {}",
                    facility.id,
                    facility.available(),
                    occupied,
                    facility.total()
                ));
            }
        }

        let mut waiting = HashSet::new();
        for entry in self.wait_queue.iter() {
            if !waiting.insert(&entry.vehicle) {
                return Err(format!("Vehicle {} is queued twice", entry.vehicle));
            }
            if self.is_parked(&entry.vehicle) {
                return Err(format!("Vehicle {} is queued while parked", entry.vehicle));
            }
        }

        Ok(())
    }

    //------------------
    // --- Internals ---
    //------------------

    fn current_facility_id(&self, vehicle: &VehicleId) -> Option<FacilityId> {
        self.facility_of(vehicle).map(|facility| facility.id.clone())
    }

    fn push_waiting(&mut self, vehicle: &VehicleId, requested: Option<FacilityId>) -> bool {
        if self.is_parked(vehicle) {
            return false;
        }
        self.wait_queue.enqueue(vehicle.clone(), requested)
    }

    fn try_reserve_at(&mut self, vehicle: &VehicleId, id: &FacilityId, fallback: QueueFallback) -> Result<FacilityId, AllocationError> {
        if let Some(current) = self.current_facility_id(vehicle) {
            self.audit.record(AuditKind::ReserveFail, &format!("{} - Already at lot {}", vehicle, current));
            return Err(AllocationError::AlreadyParked { vehicle: vehicle.clone(), facility: current });
        }

        let Some(key) = self.name_index.get(id).copied() else {
            self.audit.record(AuditKind::ReserveFail, &format!("{} - Lot {} not found", vehicle, id));
            return Err(AllocationError::FacilityNotFound(id.clone()));
        };

        let occupied = self.facilities.get_mut(key).is_some_and(Facility::occupy_one);
        if !occupied {
            if fallback == QueueFallback::Enqueue {
                self.enqueue(vehicle, Some(id.clone()));
            }
            return Err(AllocationError::FacilityFull {
                vehicle: vehicle.clone(),
                facility: id.clone(),
                queued: self.wait_queue.contains(vehicle),
            });
        }

        self.reservations.insert(vehicle.clone(), key);
        self.wait_queue.remove(vehicle);

        let slots_left = self.facilities.get(key).map_or(0, Facility::available);
        self.audit.record(AuditKind::Park, &format!("{} at lot {} | Slots left: {}", vehicle, id, slots_left));
        Ok(id.clone())
    }

    fn try_reserve_any(&mut self, vehicle: &VehicleId, fallback: QueueFallback) -> Result<FacilityId, AllocationError> {
        if let Some(current) = self.current_facility_id(vehicle) {
            self.audit.record(AuditKind::ReserveFail, &format!("{} - Already at lot {}", vehicle, current));
            return Err(AllocationError::AlreadyParked { vehicle: vehicle.clone(), facility: current });
        }

        match self.best_available() {
            Some(id) => self.try_reserve_at(vehicle, &id, fallback),
            None => {
                if fallback == QueueFallback::Enqueue {
                    self.enqueue(vehicle, None);
                }
                Err(AllocationError::NoCapacity { vehicle: vehicle.clone(), queued: self.wait_queue.contains(vehicle) })
            }
        }
    }

    /// Most free slots, then highest rating; the earliest registered facility wins full ties.
    fn best_available(&self) -> Option<FacilityId> {
        let mut best: Option<&Facility> = None;
        for facility in self.facilities_with_capacity() {
            let better = match best {
                None => true,
                Some(current) => {
                    facility.available() > current.available()
                        || (facility.available() == current.available() && facility.rating > current.rating)
                }
            };
            if better {
                best = Some(facility);
            }
        }
        best.map(|facility| facility.id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::parking_system_model::ledger::allocation_error::ErrorKind;
    use crate::domain::parking_system_model::utils::audit::MemoryAuditSink;

    fn vehicle(name: &str) -> VehicleId {
        VehicleId::new(name)
    }

    fn lot(name: &str) -> FacilityId {
        FacilityId::new(name)
    }

    fn ledger_with(facilities: Vec<Facility>, policy: WaitQueuePolicy) -> (AllocationLedger, Arc<MemoryAuditSink>) {
        let audit = Arc::new(MemoryAuditSink::new());
        let ledger = AllocationLedger::new(facilities, policy, audit.clone()).unwrap();
        (ledger, audit)
    }

    #[test]
    fn single_slot_hand_over_through_the_queue() {
        let (mut ledger, audit) = ledger_with(vec![Facility::new("F1", "B", 1, 1, 4.0)], WaitQueuePolicy::default());

        assert_eq!(ledger.reserve_at(&vehicle("V1"), &lot("F1")), Ok(lot("F1")));
        assert_eq!(ledger.facility(&lot("F1")).unwrap().available(), 0);

        let refused = ledger.reserve_at(&vehicle("V2"), &lot("F1")).unwrap_err();
        assert_eq!(refused, AllocationError::FacilityFull { vehicle: vehicle("V2"), facility: lot("F1"), queued: true });
        assert_eq!(refused.kind(), ErrorKind::Conflict);
        assert_eq!(ledger.wait_queue().snapshot(), vec![vehicle("V2")]);

        let report = ledger.release(&vehicle("V1")).unwrap();
        assert_eq!(report.auto_assigned, vec![Assignment { vehicle: vehicle("V2"), facility: lot("F1") }]);
        assert_eq!(ledger.facility(&lot("F1")).unwrap().available(), 0);
        assert_eq!(ledger.facility_of(&vehicle("V2")).map(|f| f.id.clone()), Some(lot("F1")));
        assert!(ledger.wait_queue().is_empty());

        assert_eq!(
            audit.kinds(),
            vec![AuditKind::Park, AuditKind::WaitlistAdd, AuditKind::Free, AuditKind::Park, AuditKind::WaitlistAssign]
        );
        ledger.verify_consistency().unwrap();
    }

    #[test]
    fn unknown_facility_changes_nothing() {
        let (mut ledger, _) = ledger_with(vec![Facility::new("F1", "B", 2, 2, 4.0)], WaitQueuePolicy::default());

        let err = ledger.reserve_at(&vehicle("V1"), &lot("NOPE")).unwrap_err();
        assert_eq!(err, AllocationError::FacilityNotFound(lot("NOPE")));
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(!ledger.is_parked(&vehicle("V1")));
        assert!(ledger.wait_queue().is_empty());
        assert_eq!(ledger.facility(&lot("F1")).unwrap().available(), 2);
    }

    #[test]
    fn a_vehicle_parks_only_once() {
        let (mut ledger, _) =
            ledger_with(vec![Facility::new("F1", "A", 2, 2, 4.0), Facility::new("F2", "B", 2, 2, 4.0)], WaitQueuePolicy::default());

        ledger.reserve_at(&vehicle("V1"), &lot("F1")).unwrap();
        let err = ledger.reserve_at(&vehicle("V1"), &lot("F2")).unwrap_err();

        assert_eq!(err, AllocationError::AlreadyParked { vehicle: vehicle("V1"), facility: lot("F1") });
        assert_eq!(ledger.reserve_any(&vehicle("V1")).unwrap_err().kind(), ErrorKind::Conflict);
        assert_eq!(ledger.facility(&lot("F2")).unwrap().available(), 2);
        assert_eq!(ledger.reservation_count(), 1);
    }

    #[test]
    fn reserve_any_prefers_free_slots_then_rating() {
        let (mut ledger, _) = ledger_with(
            vec![Facility::new("F1", "A", 5, 3, 4.5), Facility::new("F2", "B", 5, 4, 3.0), Facility::new("F3", "C", 5, 4, 4.0)],
            WaitQueuePolicy::default(),
        );

        assert_eq!(ledger.reserve_any(&vehicle("V1")), Ok(lot("F3")));
        assert_eq!(ledger.reserve_any(&vehicle("V2")), Ok(lot("F2")));
        // Three free slots everywhere; F1 has the best rating.
        assert_eq!(ledger.reserve_any(&vehicle("V3")), Ok(lot("F1")));
    }

    #[test]
    fn reserve_any_queues_when_everything_is_full() {
        let (mut ledger, _) = ledger_with(vec![Facility::new("F1", "A", 1, 0, 4.0)], WaitQueuePolicy::default());

        let err = ledger.reserve_any(&vehicle("V1")).unwrap_err();
        assert_eq!(err, AllocationError::NoCapacity { vehicle: vehicle("V1"), queued: true });

        // A second refusal does not duplicate the entry.
        ledger.reserve_any(&vehicle("V1")).unwrap_err();
        assert_eq!(ledger.wait_queue().len(), 1);
    }

    #[test]
    fn release_of_unparked_vehicle_is_not_found() {
        let (mut ledger, _) = ledger_with(vec![Facility::new("F1", "A", 1, 1, 4.0)], WaitQueuePolicy::default());
        let err = ledger.release(&vehicle("GHOST")).unwrap_err();
        assert_eq!(err, AllocationError::VehicleNotParked(vehicle("GHOST")));
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn preloaded_occupancy_counts_as_occupied() {
        let (mut ledger, _) = ledger_with(vec![Facility::new("F1", "A", 4, 1, 4.0)], WaitQueuePolicy::default());

        assert_eq!(ledger.occupied_count(&lot("F1")), Some(3));
        ledger.reserve_at(&vehicle("V1"), &lot("F1")).unwrap();
        assert_eq!(ledger.occupied_count(&lot("F1")), Some(4));
        ledger.verify_consistency().unwrap();

        ledger.release(&vehicle("V1")).unwrap();
        assert_eq!(ledger.occupied_count(&lot("F1")), Some(3));
        ledger.verify_consistency().unwrap();
    }

    #[test]
    fn emergency_release_frees_everything_and_drains() {
        let (mut ledger, audit) = ledger_with(vec![Facility::new("F1", "A", 3, 2, 4.0)], WaitQueuePolicy::default());

        ledger.reserve_at(&vehicle("V2"), &lot("F1")).unwrap();
        ledger.reserve_at(&vehicle("V1"), &lot("F1")).unwrap();
        ledger.reserve_at(&vehicle("V3"), &lot("F1")).unwrap_err();

        let report = ledger.emergency_release(&lot("F1")).unwrap();

        assert_eq!(report.freed_vehicles, vec![vehicle("V1"), vehicle("V2")]);
        assert_eq!(report.freed_slots, 3);
        assert_eq!(report.auto_assigned, vec![Assignment { vehicle: vehicle("V3"), facility: lot("F1") }]);
        assert_eq!(ledger.facility(&lot("F1")).unwrap().available(), 2);
        assert_eq!(ledger.occupied_count(&lot("F1")), Some(1));
        assert_eq!(audit.count(AuditKind::EmergencyFree), 2);
        assert_eq!(audit.count(AuditKind::EmergencyFreeSummary), 1);
        ledger.verify_consistency().unwrap();
    }

    #[test]
    fn emergency_release_of_unknown_facility_is_not_found() {
        let (mut ledger, _) = ledger_with(vec![Facility::new("F1", "A", 1, 1, 4.0)], WaitQueuePolicy::default());
        assert_eq!(ledger.emergency_release(&lot("F9")).unwrap_err(), AllocationError::FacilityNotFound(lot("F9")));
    }

    #[test]
    fn drain_never_exceeds_freed_capacity() {
        let (mut ledger, _) = ledger_with(vec![Facility::new("F1", "A", 2, 2, 4.0)], WaitQueuePolicy::default());

        ledger.reserve_at(&vehicle("V1"), &lot("F1")).unwrap();
        ledger.reserve_at(&vehicle("V2"), &lot("F1")).unwrap();
        for name in ["W1", "W2", "W3"] {
            ledger.reserve_any(&vehicle(name)).unwrap_err();
        }

        let report = ledger.release(&vehicle("V1")).unwrap();
        assert_eq!(report.auto_assigned.len(), 1);
        assert_eq!(ledger.wait_queue().snapshot(), vec![vehicle("W2"), vehicle("W3")]);
        ledger.verify_consistency().unwrap();
    }

    #[test]
    fn pinned_vehicle_waits_for_its_own_facility() {
        let (mut ledger, _) =
            ledger_with(vec![Facility::new("F1", "A", 1, 1, 4.0), Facility::new("F2", "B", 1, 1, 4.0)], WaitQueuePolicy::PinToRequested);

        ledger.reserve_at(&vehicle("V1"), &lot("F1")).unwrap();
        ledger.reserve_at(&vehicle("V2"), &lot("F2")).unwrap();
        ledger.reserve_at(&vehicle("W1"), &lot("F1")).unwrap_err();

        // F2 frees up, but W1 asked for F1 and keeps its place.
        let report = ledger.release(&vehicle("V2")).unwrap();
        assert!(report.auto_assigned.is_empty());
        assert_eq!(ledger.wait_queue().snapshot(), vec![vehicle("W1")]);

        let report = ledger.release(&vehicle("V1")).unwrap();
        assert_eq!(report.auto_assigned, vec![Assignment { vehicle: vehicle("W1"), facility: lot("F1") }]);
    }

    #[test]
    fn reassign_policy_moves_waiters_to_any_lot() {
        let (mut ledger, _) = ledger_with(
            vec![Facility::new("F1", "A", 1, 1, 4.0), Facility::new("F2", "B", 1, 1, 4.0)],
            WaitQueuePolicy::ReassignBestAvailable,
        );

        ledger.reserve_at(&vehicle("V1"), &lot("F1")).unwrap();
        ledger.reserve_at(&vehicle("V2"), &lot("F2")).unwrap();
        ledger.reserve_at(&vehicle("W1"), &lot("F1")).unwrap_err();

        let report = ledger.release(&vehicle("V2")).unwrap();
        assert_eq!(report.auto_assigned, vec![Assignment { vehicle: vehicle("W1"), facility: lot("F2") }]);
    }

    #[test]
    fn direct_reservation_removes_vehicle_from_queue() {
        let (mut ledger, _) =
            ledger_with(vec![Facility::new("F1", "A", 1, 0, 4.0), Facility::new("F2", "B", 1, 1, 4.0)], WaitQueuePolicy::default());

        ledger.reserve_at(&vehicle("V1"), &lot("F1")).unwrap_err();
        assert!(ledger.wait_queue().contains(&vehicle("V1")));

        ledger.reserve_at(&vehicle("V1"), &lot("F2")).unwrap();
        assert!(ledger.wait_queue().is_empty());
        ledger.verify_consistency().unwrap();
    }

    #[test]
    fn parked_vehicles_are_never_enqueued() {
        let (mut ledger, _) = ledger_with(vec![Facility::new("F1", "A", 1, 1, 4.0)], WaitQueuePolicy::default());
        ledger.reserve_at(&vehicle("V1"), &lot("F1")).unwrap();

        assert!(!ledger.enqueue(&vehicle("V1"), None));
        let restored = ledger.restore_wait_queue(vec![
            WaitingVehicle { vehicle: vehicle("V1"), requested: None },
            WaitingVehicle { vehicle: vehicle("V2"), requested: Some(lot("UNKNOWN")) },
            WaitingVehicle { vehicle: vehicle("V2"), requested: None },
        ]);

        assert_eq!(restored, 1);
        assert_eq!(ledger.wait_queue().peek().unwrap().requested, None);
        ledger.verify_consistency().unwrap();
    }

    #[test]
    fn duplicate_facility_ids_are_rejected() {
        let audit = Arc::new(MemoryAuditSink::new());
        let err = AllocationLedger::new(
            vec![Facility::new("F1", "A", 1, 1, 4.0), Facility::new("F1", "B", 1, 1, 4.0)],
            WaitQueuePolicy::default(),
            audit,
        )
        .unwrap_err();
        assert_eq!(err, ConversionError::DuplicateFacility("F1".to_string()));
    }

    #[test]
    fn restored_reservations_claim_preoccupied_slots_first() {
        let (mut ledger, audit) =
            ledger_with(vec![Facility::new("F1", "A", 2, 1, 4.0), Facility::new("F2", "B", 1, 0, 4.0)], WaitQueuePolicy::default());
        ledger.enqueue(&vehicle("V2"), None);

        let restored = ledger.restore_reservations(vec![
            Assignment { vehicle: vehicle("V1"), facility: lot("F1") },
            Assignment { vehicle: vehicle("V2"), facility: lot("F1") },
            Assignment { vehicle: vehicle("V3"), facility: lot("F1") },
            Assignment { vehicle: vehicle("V1"), facility: lot("F2") },
            Assignment { vehicle: vehicle("V4"), facility: lot("NOPE") },
        ]);

        assert_eq!(restored, 2);
        assert_eq!(ledger.vehicles_at(&lot("F1")), vec![vehicle("V1"), vehicle("V2")]);
        assert_eq!(ledger.facility(&lot("F1")).unwrap().available(), 0);
        assert_eq!(ledger.occupied_count(&lot("F2")), Some(1));
        assert!(ledger.wait_queue().is_empty());
        assert_eq!(audit.kinds(), vec![AuditKind::WaitlistAdd]);
        ledger.verify_consistency().unwrap();

        let report = ledger.release(&vehicle("V1")).unwrap();
        assert_eq!(report.facility, lot("F1"));
        assert_eq!(ledger.facility(&lot("F1")).unwrap().available(), 1);
    }
}
