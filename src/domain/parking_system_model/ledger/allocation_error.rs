use thiserror::Error;

use crate::domain::parking_system_model::utils::id::{FacilityId, VehicleId};

/// Broad class of an [`AllocationError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The referenced facility or reservation does not exist.
    NotFound,
    /// The request collides with current state: the vehicle is parked or capacity is exhausted.
    Conflict,
}

/// Refusals of the allocation ledger. None of them changes ledger state,
/// except that full-capacity refusals may have put the vehicle in the wait queue.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocationError {
    #[error("Facility {0} not found")]
    FacilityNotFound(FacilityId),

    #[error("Vehicle {0} has no active reservation")]
    VehicleNotParked(VehicleId),

    #[error("Vehicle {vehicle} is already parked at facility {facility}")]
    AlreadyParked { vehicle: VehicleId, facility: FacilityId },

    #[error("Facility {facility} is full (vehicle {vehicle} queued: {queued})")]
    FacilityFull { vehicle: VehicleId, facility: FacilityId, queued: bool },

    #[error("No facility has a free slot (vehicle {vehicle} queued: {queued})")]
    NoCapacity { vehicle: VehicleId, queued: bool },
}

impl AllocationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AllocationError::FacilityNotFound(_) | AllocationError::VehicleNotParked(_) => ErrorKind::NotFound,
            AllocationError::AlreadyParked { .. } | AllocationError::FacilityFull { .. } | AllocationError::NoCapacity { .. } => {
                ErrorKind::Conflict
            }
        }
    }

    /// Whether the vehicle is waiting in the queue after the refusal.
    pub fn queued(&self) -> bool {
        match self {
            AllocationError::FacilityFull { queued, .. } | AllocationError::NoCapacity { queued, .. } => *queued,
            _ => false,
        }
    }
}
