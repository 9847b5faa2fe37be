use serde::{Deserialize, Serialize};

/// One line of the persisted wait queue: `vehicle,enqueuedAt[,requestedFacility]`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct WaitlistEntryDto {
    pub vehicle: String,

    /// Unix seconds at the time the snapshot was written.
    #[serde(default)]
    pub enqueued_at: Option<i64>,

    #[serde(default)]
    pub requested_facility: Option<String>,
}
