use std::cmp::Ordering;

use crate::api::parking_config_dto::ScoreWeightsDto;
use crate::domain::parking_system_model::distance_cache::DistanceCache;
use crate::domain::parking_system_model::graph::graph_store::GraphStore;
use crate::domain::parking_system_model::ledger::facility::Facility;
use crate::domain::parking_system_model::utils::id::{FacilityId, LocationId};
use crate::error::Error;

/// Value a factor takes when every candidate shares the same raw value.
const NEUTRAL_FACTOR: f64 = 0.5;

/// Relative weight of each score factor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreWeights {
    pub distance: f64,
    pub availability: f64,
    pub rating: f64,
    pub cost: f64,
    pub amenities: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self { distance: 0.25, availability: 0.20, rating: 0.15, cost: 0.20, amenities: 0.20 }
    }
}

impl TryFrom<ScoreWeightsDto> for ScoreWeights {
    type Error = Error;

    fn try_from(dto: ScoreWeightsDto) -> Result<Self, Self::Error> {
        let weights = ScoreWeights {
            distance: dto.distance,
            availability: dto.availability,
            rating: dto.rating,
            cost: dto.cost,
            amenities: dto.amenities,
        };

        let all = [weights.distance, weights.availability, weights.rating, weights.cost, weights.amenities];
        if all.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(Error::InvalidInput(format!("Score weights must be finite and non-negative, got {:?}", weights)));
        }
        if weights.total() <= 0.0 {
            return Err(Error::InvalidInput("At least one score weight must be positive".to_string()));
        }

        Ok(weights)
    }
}

impl ScoreWeights {
    pub fn total(&self) -> f64 {
        self.distance + self.availability + self.rating + self.cost + self.amenities
    }
}

/// Per-factor values of one candidate, each in [0, 1], higher is better.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreFactors {
    pub distance: f64,
    pub availability: f64,
    pub rating: f64,
    pub cost: f64,
    pub amenities: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredFacility {
    pub facility: FacilityId,
    pub location: LocationId,

    /// Weighted composite in [0, 1].
    pub score: f64,

    /// Cached road distance from the requesting location.
    pub distance_km: f64,
    pub factors: ScoreFactors,
}

/// Ranks candidate facilities for a requesting location.
#[derive(Debug, Clone, Default)]
pub struct FacilityScorer {
    weights: ScoreWeights,
}

impl FacilityScorer {
    pub fn new(weights: ScoreWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &ScoreWeights {
        &self.weights
    }

    /// Scores every candidate with free capacity and returns them best first.
    ///
    /// Distance and cost are min-max normalized over the scored set and
    /// inverted, so the closest and the cheapest candidates get 1. Facilities
    /// with equal scores keep their input order.
    pub fn score(&self, origin: &LocationId, candidates: &[&Facility], cache: &mut DistanceCache, graph: &GraphStore) -> Vec<ScoredFacility> {
        let eligible: Vec<(&Facility, f64)> = candidates
            .iter()
            .filter(|facility| facility.has_capacity())
            .map(|facility| (*facility, cache.distance_between(graph, origin, &facility.location)))
            .collect();

        if eligible.is_empty() {
            return Vec::new();
        }

        let distance_range = Range::over(eligible.iter().map(|(_, km)| *km));
        let cost_range = Range::over(eligible.iter().map(|(facility, _)| facility.cost_per_hour));
        let total_weight = self.weights.total();

        let mut scored: Vec<ScoredFacility> = eligible
            .into_iter()
            .map(|(facility, distance_km)| {
                let factors = ScoreFactors {
                    distance: distance_range.inverted(distance_km),
                    availability: facility.availability_ratio(),
                    rating: rating_factor(facility.rating),
                    cost: cost_range.inverted(facility.cost_per_hour),
                    amenities: amenity_factor(facility),
                };

                let weighted = factors.distance * self.weights.distance
                    + factors.availability * self.weights.availability
                    + factors.rating * self.weights.rating
                    + factors.cost * self.weights.cost
                    + factors.amenities * self.weights.amenities;

                ScoredFacility {
                    facility: facility.id.clone(),
                    location: facility.location.clone(),
                    score: (weighted / total_weight).clamp(0.0, 1.0),
                    distance_km,
                    factors,
                }
            })
            .collect();

        // `sort_by` is stable, equal scores keep input order.
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));

        log::debug!("Scored {} facilities for {}.", scored.len(), origin);
        scored
    }
}

/// Ratings are given on a 1..=5 scale.
pub fn rating_factor(rating: f64) -> f64 {
    ((rating - 1.0) / 4.0).clamp(0.0, 1.0)
}

/// Preset rating worth 0.05 per point, plus fixed bonuses per amenity, capped at 1.
pub fn amenity_factor(facility: &Facility) -> f64 {
    let amenities = &facility.amenities;
    let mut factor = f64::from(facility.amenity_preset) * 0.05;

    if amenities.secure {
        factor += 0.15;
    }
    if amenities.ev_charging {
        factor += 0.15;
    }
    if amenities.covered {
        factor += 0.10;
    }
    if amenities.valet {
        factor += 0.10;
    }

    factor.min(1.0)
}

#[derive(Debug, Clone, Copy)]
struct Range {
    min: f64,
    max: f64,
}

impl Range {
    fn over(values: impl Iterator<Item = f64>) -> Self {
        values.fold(Range { min: f64::INFINITY, max: f64::NEG_INFINITY }, |range, value| Range {
            min: range.min.min(value),
            max: range.max.max(value),
        })
    }

    /// 1 at the minimum, 0 at the maximum.
    fn inverted(&self, value: f64) -> f64 {
        let span = self.max - self.min;
        if span > 0.0 { (1.0 - (value - self.min) / span).clamp(0.0, 1.0) } else { NEUTRAL_FACTOR }
    }
}
