use serde::{Deserialize, Serialize};

/// One line of the facility file.
///
/// Layout: `id,location,total,available,rating,lat,lon[,cost,secure,covered,ev,valet,amenityPreset]`.
/// Everything after the coordinates may be absent; the loader fills the gaps
/// from the configured [`FacilityProfileDto`].
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct FacilityDto {
    pub id: String,
    pub location: String,
    pub total: i64,
    pub available: i64,
    pub rating: f64,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    #[serde(default)]
    pub cost_per_hour: Option<f64>,
    #[serde(default)]
    pub secure: Option<bool>,
    #[serde(default)]
    pub covered: Option<bool>,
    #[serde(default)]
    pub ev_charging: Option<bool>,
    #[serde(default)]
    pub valet: Option<bool>,
    #[serde(default)]
    pub amenity_preset: Option<u8>,
}

/// Cost and amenity values used where the facility file is silent.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FacilityProfileDto {
    #[serde(default)]
    pub cost_per_hour: f64,
    #[serde(default)]
    pub secure: bool,
    #[serde(default)]
    pub covered: bool,
    #[serde(default)]
    pub ev_charging: bool,
    #[serde(default)]
    pub valet: bool,

    /// Preset amenity rating on a 0..=10 scale.
    #[serde(default)]
    pub amenity_preset: u8,
}

impl FacilityProfileDto {
    /// Cost 0, no amenities.
    pub const NEUTRAL: FacilityProfileDto =
        FacilityProfileDto { cost_per_hour: 0.0, secure: false, covered: false, ev_charging: false, valet: false, amenity_preset: 0 };
}

impl Default for FacilityProfileDto {
    fn default() -> Self {
        Self::NEUTRAL
    }
}
