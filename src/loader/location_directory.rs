use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::domain::parking_system_model::utils::id::LocationId;
use crate::error::Result;
use crate::loader::parser::parse_csv_file;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// One line of the location file: `name,lat,lon`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LocationRecordDto {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

/// Known location names and their coordinates.
///
/// Built by whoever assembles the system and handed around by reference.
#[derive(Debug, Clone, Default)]
pub struct LocationDirectory {
    coordinates: BTreeMap<LocationId, (f64, f64)>,
}

impl LocationDirectory {
    pub fn from_records(records: Vec<LocationRecordDto>) -> Self {
        let coordinates = records
            .into_iter()
            .map(|record| (LocationId::normalized(&record.name), (record.lat, record.lon)))
            .filter(|(name, _)| !name.is_empty())
            .collect();
        Self { coordinates }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let directory = Self::from_records(parse_csv_file(path.as_ref())?);
        log::info!("Loaded {} named locations from '{}'.", directory.len(), path.as_ref().display());
        Ok(directory)
    }

    pub fn contains(&self, name: &LocationId) -> bool {
        self.coordinates.contains_key(name)
    }

    /// `(lat, lon)` in degrees.
    pub fn coordinates(&self, name: &LocationId) -> Option<(f64, f64)> {
        self.coordinates.get(name).copied()
    }

    /// Great-circle distance between two named locations.
    pub fn distance_km(&self, a: &LocationId, b: &LocationId) -> Option<f64> {
        let (lat1, lon1) = self.coordinates(a)?;
        let (lat2, lon2) = self.coordinates(b)?;
        Some(haversine_km(lat1, lon1, lat2, lon2))
    }

    pub fn names(&self) -> impl Iterator<Item = &LocationId> {
        self.coordinates.keys()
    }

    pub fn len(&self) -> usize {
        self.coordinates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coordinates.is_empty()
    }
}

pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2) + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}
