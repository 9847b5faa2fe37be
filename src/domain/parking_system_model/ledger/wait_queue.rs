use std::collections::VecDeque;

use crate::domain::parking_system_model::utils::id::{FacilityId, VehicleId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitingVehicle {
    pub vehicle: VehicleId,

    /// The facility the vehicle asked for, if it asked for a specific one.
    pub requested: Option<FacilityId>,
}

/// FIFO backlog of vehicles denied a slot. Holds each vehicle at most once.
#[derive(Debug, Clone, Default)]
pub struct WaitQueue {
    entries: VecDeque<WaitingVehicle>,
}

impl WaitQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `vehicle` unless it is already waiting. Returns whether it was added.
    pub fn enqueue(&mut self, vehicle: VehicleId, requested: Option<FacilityId>) -> bool {
        if self.contains(&vehicle) {
            log::debug!("WaitQueue: {} is already waiting, not enqueued again.", vehicle);
            return false;
        }
        self.entries.push_back(WaitingVehicle { vehicle, requested });
        true
    }

    pub fn dequeue(&mut self) -> Option<WaitingVehicle> {
        self.entries.pop_front()
    }

    /// Puts an entry back at the head after a failed drain attempt.
    pub(crate) fn requeue_front(&mut self, entry: WaitingVehicle) {
        if !self.contains(&entry.vehicle) {
            self.entries.push_front(entry);
        }
    }

    pub fn peek(&self) -> Option<&WaitingVehicle> {
        self.entries.front()
    }

    pub fn contains(&self, vehicle: &VehicleId) -> bool {
        self.entries.iter().any(|entry| &entry.vehicle == vehicle)
    }

    /// Position counted from the head, starting at 0.
    pub fn position(&self, vehicle: &VehicleId) -> Option<usize> {
        self.entries.iter().position(|entry| &entry.vehicle == vehicle)
    }

    pub fn remove(&mut self, vehicle: &VehicleId) -> bool {
        match self.position(vehicle) {
            Some(index) => self.entries.remove(index).is_some(),
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &WaitingVehicle> {
        self.entries.iter()
    }

    /// Vehicles in queue order.
    pub fn snapshot(&self) -> Vec<VehicleId> {
        self.entries.iter().map(|entry| entry.vehicle.clone()).collect()
    }
}
