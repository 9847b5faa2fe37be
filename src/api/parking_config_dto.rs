use serde::Deserialize;

use crate::api::facility_dto::FacilityProfileDto;

/// Root of the JSON configuration consumed by `generate_parking_system`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParkingConfigDto {
    pub graph_file: String,
    pub facility_file: String,
    #[serde(default)]
    pub location_file: Option<String>,
    #[serde(default)]
    pub waitlist_file: Option<String>,

    /// Vehicle-to-facility assignments, so a later run can release them.
    #[serde(default)]
    pub reservation_file: Option<String>,
    #[serde(default)]
    pub audit_file: Option<String>,

    /// Seed for the recommender. Entropy-seeded when absent.
    #[serde(default)]
    pub seed: Option<u64>,

    #[serde(default)]
    pub wait_queue_policy: WaitQueuePolicyDto,

    #[serde(default = "default_unreachable_fallback_km")]
    pub unreachable_fallback_km: f64,

    #[serde(default)]
    pub score_weights: ScoreWeightsDto,

    #[serde(default)]
    pub default_profile: DefaultProfileDto,

    #[serde(default)]
    pub log: LogSettingsDto,
}

/// Where the binary writes its log file and at which level.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct LogSettingsDto {
    pub dir: String,
    pub file: String,

    /// `error` .. `trace`; `RUST_LOG` takes precedence when set.
    pub level: Option<String>,
}

impl Default for LogSettingsDto {
    fn default() -> Self {
        Self { dir: "logs".to_string(), file: "system.log".to_string(), level: None }
    }
}

fn default_unreachable_fallback_km() -> f64 {
    1_000_000.0
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum WaitQueuePolicyDto {
    #[default]
    ReassignBestAvailable,
    PinToRequested,
}

/// Factor weights of the facility score. Omitted weights keep their default.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ScoreWeightsDto {
    pub distance: f64,
    pub availability: f64,
    pub rating: f64,
    pub cost: f64,
    pub amenities: f64,
}

impl Default for ScoreWeightsDto {
    fn default() -> Self {
        Self { distance: 0.25, availability: 0.20, rating: 0.15, cost: 0.20, amenities: 0.20 }
    }
}

/// Where missing cost and amenity columns come from.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum DefaultProfileDto {
    /// Cost 0, no amenities.
    #[default]
    Neutral,

    /// The same explicit profile for every facility.
    Fixed { profile: FacilityProfileDto },

    /// Seeded per-facility attributes, reproducible across runs.
    Randomized { seed: u64 },
}
