use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::api::facility_dto::FacilityProfileDto;
use crate::api::parking_config_dto::DefaultProfileDto;

/// Supplies cost and amenity values for facility records that omit them.
///
/// `Randomized` draws one profile per facility from a seeded generator, so
/// the same seed and file order always produce the same facilities.
#[derive(Debug, Clone)]
pub enum FacilityProfileSource {
    Neutral,
    Fixed(FacilityProfileDto),
    Randomized(StdRng),
}

impl From<DefaultProfileDto> for FacilityProfileSource {
    fn from(dto: DefaultProfileDto) -> Self {
        match dto {
            DefaultProfileDto::Neutral => FacilityProfileSource::Neutral,
            DefaultProfileDto::Fixed { profile } => FacilityProfileSource::Fixed(profile),
            DefaultProfileDto::Randomized { seed } => FacilityProfileSource::Randomized(StdRng::seed_from_u64(seed)),
        }
    }
}

impl FacilityProfileSource {
    pub fn randomized(seed: u64) -> Self {
        FacilityProfileSource::Randomized(StdRng::seed_from_u64(seed))
    }

    /// Profile for the next facility in file order.
    pub fn next_profile(&mut self) -> FacilityProfileDto {
        match self {
            FacilityProfileSource::Neutral => FacilityProfileDto::NEUTRAL,
            FacilityProfileSource::Fixed(profile) => *profile,
            FacilityProfileSource::Randomized(rng) => random_profile(rng),
        }
    }
}

/// Cost in [10, 20), each amenity with probability 1/2, preset rating in 5..=10.
pub fn random_profile<R: Rng>(rng: &mut R) -> FacilityProfileDto {
    FacilityProfileDto {
        cost_per_hour: 10.0 + rng.random::<f64>() * 10.0,
        secure: rng.random_bool(0.5),
        covered: rng.random_bool(0.5),
        ev_charging: rng.random_bool(0.5),
        valet: rng.random_bool(0.5),
        amenity_preset: rng.random_range(5..=10),
    }
}
