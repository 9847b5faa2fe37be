use std::fmt;

use crate::api::facility_dto::{FacilityDto, FacilityProfileDto};
use crate::domain::parking_system_model::utils::id::{FacilityId, LocationId};
use crate::error::ConversionError;

/// Optional services of a facility.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Amenities {
    pub secure: bool,
    pub covered: bool,
    pub ev_charging: bool,
    pub valet: bool,
}

impl Amenities {
    pub fn count(&self) -> usize {
        [self.secure, self.covered, self.ev_charging, self.valet].iter().filter(|present| **present).count()
    }

    pub fn labels(&self) -> Vec<&'static str> {
        let mut labels = Vec::new();
        if self.secure {
            labels.push("Security");
        }
        if self.ev_charging {
            labels.push("EV-Charging");
        }
        if self.covered {
            labels.push("Covered");
        }
        if self.valet {
            labels.push("Valet");
        }
        labels
    }
}

/// A parking lot bound to one location of the city graph.
///
/// `available` never exceeds `total`. The counters are only changed through
/// the `AllocationLedger`.
#[derive(Debug, Clone, PartialEq)]
pub struct Facility {
    pub id: FacilityId,
    pub location: LocationId,
    pub(crate) total: u32,
    pub(crate) available: u32,

    /// User rating, nominally 1..=5.
    pub rating: f64,
    pub cost_per_hour: f64,
    pub amenities: Amenities,

    /// Preset amenity rating on a 0..=10 scale.
    pub amenity_preset: u8,
    pub coordinates: Option<(f64, f64)>,
}

impl TryFrom<(FacilityDto, FacilityProfileDto)> for Facility {
    type Error = ConversionError;

    /// Converts a facility record, taking absent cost and amenity fields from `profile`.
    ///
    /// `available > total` is clamped to `total`.
    fn try_from(args: (FacilityDto, FacilityProfileDto)) -> Result<Self, Self::Error> {
        let (dto, profile) = args;

        let id = FacilityId::new(dto.id.trim());
        if id.is_empty() {
            return Err(ConversionError::EmptyFacilityId);
        }

        let location = LocationId::normalized(&dto.location);
        if location.is_empty() {
            return Err(ConversionError::EmptyLocation);
        }

        let total = capacity(&id, dto.total)?;
        let mut available = capacity(&id, dto.available)?;
        if available > total {
            log::warn!("Facility {}: available slots ({}) exceed total ({}); clamping to total.", id, available, total);
            available = total;
        }

        if !dto.rating.is_finite() {
            return Err(ConversionError::NonFiniteAttribute { id: id.into(), field: "rating" });
        }

        let cost_per_hour = dto.cost_per_hour.unwrap_or(profile.cost_per_hour);
        if !cost_per_hour.is_finite() {
            return Err(ConversionError::NonFiniteAttribute { id: id.into(), field: "cost per hour" });
        }

        let amenities = Amenities {
            secure: dto.secure.unwrap_or(profile.secure),
            covered: dto.covered.unwrap_or(profile.covered),
            ev_charging: dto.ev_charging.unwrap_or(profile.ev_charging),
            valet: dto.valet.unwrap_or(profile.valet),
        };

        let coordinates = match (dto.lat, dto.lon) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        };

        Ok(Facility {
            id,
            location,
            total,
            available,
            rating: dto.rating,
            cost_per_hour,
            amenities,
            amenity_preset: dto.amenity_preset.unwrap_or(profile.amenity_preset).min(10),
            coordinates,
        })
    }
}

fn capacity(id: &FacilityId, value: i64) -> Result<u32, ConversionError> {
    u32::try_from(value).map_err(|_| ConversionError::NegativeCapacity { id: id.to_string(), value })
}

impl Facility {
    /// A facility without cost, amenities or coordinates, mostly useful in tests.
    pub fn new(id: impl Into<String>, location: &str, total: u32, available: u32, rating: f64) -> Self {
        Facility {
            id: FacilityId::new(id),
            location: LocationId::normalized(location),
            total,
            available: available.min(total),
            rating,
            cost_per_hour: 0.0,
            amenities: Amenities::default(),
            amenity_preset: 0,
            coordinates: None,
        }
    }

    pub fn with_cost(mut self, cost_per_hour: f64) -> Self {
        self.cost_per_hour = cost_per_hour;
        self
    }

    pub fn with_amenities(mut self, amenities: Amenities, amenity_preset: u8) -> Self {
        self.amenities = amenities;
        self.amenity_preset = amenity_preset.min(10);
        self
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn available(&self) -> u32 {
        self.available
    }

    pub fn occupied(&self) -> u32 {
        self.total - self.available
    }

    pub fn has_capacity(&self) -> bool {
        self.available > 0
    }

    /// `available / total`, zero for facilities without slots.
    pub fn availability_ratio(&self) -> f64 {
        if self.total == 0 { 0.0 } else { self.available as f64 / self.total as f64 }
    }

    pub(crate) fn occupy_one(&mut self) -> bool {
        if self.available == 0 {
            return false;
        }
        self.available -= 1;
        true
    }

    pub(crate) fn free_one(&mut self) {
        if self.available < self.total {
            self.available += 1;
        }
    }

    /// Marks every slot free and returns how many were occupied.
    pub(crate) fn force_free_all(&mut self) -> u32 {
        let freed = self.occupied();
        self.available = self.total;
        freed
    }

    pub fn to_dto(&self) -> FacilityDto {
        FacilityDto {
            id: self.id.to_string(),
            location: self.location.to_string(),
            total: self.total as i64,
            available: self.available as i64,
            rating: self.rating,
            lat: self.coordinates.map(|(lat, _)| lat),
            lon: self.coordinates.map(|(_, lon)| lon),
            cost_per_hour: Some(self.cost_per_hour),
            secure: Some(self.amenities.secure),
            covered: Some(self.amenities.covered),
            ev_charging: Some(self.amenities.ev_charging),
            valet: Some(self.amenities.valet),
            amenity_preset: Some(self.amenity_preset),
        }
    }
}

impl fmt::Display for Facility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | {} | Available: {}/{} | Rating: {:.1} | Cost: ${:.2}/hr",
            self.id, self.location, self.available, self.total, self.rating, self.cost_per_hour
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dto(total: i64, available: i64) -> FacilityDto {
        FacilityDto {
            id: "1".to_string(),
            location: "mg road".to_string(),
            total,
            available,
            rating: 4.0,
            lat: Some(12.97),
            lon: Some(77.6),
            cost_per_hour: None,
            secure: None,
            covered: Some(true),
            ev_charging: None,
            valet: None,
            amenity_preset: None,
        }
    }

    #[test]
    fn missing_fields_come_from_the_profile() {
        let profile = FacilityProfileDto { cost_per_hour: 12.0, secure: true, amenity_preset: 7, ..FacilityProfileDto::NEUTRAL };
        let facility = Facility::try_from((dto(10, 4), profile)).unwrap();

        assert_eq!(facility.location, LocationId::new("MG ROAD"));
        assert_eq!(facility.cost_per_hour, 12.0);
        assert!(facility.amenities.secure);
        assert!(facility.amenities.covered);
        assert!(!facility.amenities.valet);
        assert_eq!(facility.amenity_preset, 7);
        assert_eq!(facility.coordinates, Some((12.97, 77.6)));
        assert_eq!(facility.occupied(), 6);
    }

    #[test]
    fn neutral_profile_means_free_and_bare() {
        let facility = Facility::try_from((dto(10, 10), FacilityProfileDto::NEUTRAL)).unwrap();
        assert_eq!(facility.cost_per_hour, 0.0);
        assert_eq!(facility.amenities.count(), 1);
        assert_eq!(facility.amenity_preset, 0);
    }

    #[test]
    fn available_above_total_is_clamped() {
        let facility = Facility::try_from((dto(5, 9), FacilityProfileDto::NEUTRAL)).unwrap();
        assert_eq!(facility.available(), 5);
        assert_eq!(facility.total(), 5);
    }

    #[test]
    fn negative_capacity_is_rejected() {
        let err = Facility::try_from((dto(-1, 0), FacilityProfileDto::NEUTRAL)).unwrap_err();
        assert_eq!(err, ConversionError::NegativeCapacity { id: "1".to_string(), value: -1 });
    }

    #[test]
    fn counters_stay_within_bounds() {
        let mut facility = Facility::new("1", "A", 2, 1, 3.0);

        assert!(facility.occupy_one());
        assert!(!facility.occupy_one());
        assert_eq!(facility.available(), 0);

        facility.free_one();
        facility.free_one();
        facility.free_one();
        assert_eq!(facility.available(), 2);

        facility.occupy_one();
        assert_eq!(facility.force_free_all(), 1);
        assert_eq!(facility.availability_ratio(), 1.0);
    }

    #[test]
    fn amenity_labels_follow_display_order() {
        let amenities = Amenities { secure: true, covered: true, ev_charging: true, valet: false };
        assert_eq!(amenities.labels(), vec!["Security", "EV-Charging", "Covered"]);
        assert_eq!(amenities.count(), 3);
    }
}
