use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::domain::parking_system_model::scoring::facility_scorer::ScoredFacility;
use crate::domain::parking_system_model::utils::id::FacilityId;

/// Number of top-ranked candidates taking part in the draw.
pub const TOP_CANDIDATES: usize = 3;

/// Exponent factor applied to scores before drawing.
pub const SHARPNESS: f64 = 3.0;

/// Outcome of one weighted draw.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub chosen: ScoredFacility,

    /// Selection probability of every candidate that took part, in rank order.
    pub probabilities: Vec<(FacilityId, f64)>,

    /// The uniform value in [0, 1) the draw used.
    pub unit_draw: f64,
}

/// Picks one facility among the best ranked candidates with weight `exp(SHARPNESS * score)`.
#[derive(Debug, Clone)]
pub struct CandidateSelector<R: Rng = StdRng> {
    rng: R,
}

impl CandidateSelector<StdRng> {
    /// Reproducible selector.
    pub fn seeded(seed: u64) -> Self {
        Self { rng: StdRng::seed_from_u64(seed) }
    }

    pub fn from_os_rng() -> Self {
        Self { rng: StdRng::from_os_rng() }
    }
}

impl<R: Rng> CandidateSelector<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }

    /// Draws from `ranked`, which must be sorted best first. `None` for an empty list.
    pub fn select(&mut self, ranked: &[ScoredFacility]) -> Option<Selection> {
        if ranked.is_empty() {
            return None;
        }
        let unit_draw = self.rng.random::<f64>();
        select_with_draw(ranked, unit_draw, TOP_CANDIDATES, SHARPNESS)
    }
}

/// Deterministic core of [`CandidateSelector::select`].
///
/// `unit_draw` in [0, 1) is scaled by the total weight; the first candidate
/// whose cumulative weight exceeds it wins. Rounding that leaves no winner
/// falls back to the top candidate.
pub fn select_with_draw(ranked: &[ScoredFacility], unit_draw: f64, top_k: usize, sharpness: f64) -> Option<Selection> {
    let candidates = &ranked[..ranked.len().min(top_k)];
    let top = candidates.first()?;

    let weights: Vec<f64> = candidates.iter().map(|candidate| (sharpness * candidate.score).exp()).collect();
    let total_weight: f64 = weights.iter().sum();

    let probabilities = candidates
        .iter()
        .zip(&weights)
        .map(|(candidate, weight)| (candidate.facility.clone(), weight / total_weight))
        .collect();

    let draw = unit_draw * total_weight;
    let mut cumulative = 0.0;
    let mut chosen = top;
    for (candidate, weight) in candidates.iter().zip(&weights) {
        cumulative += weight;
        if cumulative > draw {
            chosen = candidate;
            break;
        }
    }

    Some(Selection { chosen: chosen.clone(), probabilities, unit_draw })
}
