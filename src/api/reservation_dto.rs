use serde::{Deserialize, Serialize};

/// One line of the persisted reservations: `vehicle,facility`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ReservationDto {
    pub vehicle: String,
    pub facility: String,
}
