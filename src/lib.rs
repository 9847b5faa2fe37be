use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::api::parking_config_dto::ParkingConfigDto;
use crate::domain::parking_system_model::parking_system::{ParkingSystem, SystemSettings};
use crate::domain::parking_system_model::scoring::facility_scorer::ScoreWeights;
use crate::domain::parking_system_model::utils::audit::{AuditSink, CsvAuditSink, LogAuditSink};
use crate::error::{Error, Result};
use crate::loader::facility_profile::FacilityProfileSource;
use crate::loader::parser::parse_json_file;
use crate::loader::persistence::{load_facilities, load_graph, load_reservations, load_waitlist, save_facilities, save_reservations, save_waitlist};

pub mod api;
pub mod domain;
pub mod error;
pub mod loader;
pub mod logger;

/// Builds a ready [`ParkingSystem`] from a JSON configuration file.
///
/// Relative file names in the configuration are resolved against the
/// directory of the configuration file.
pub fn generate_parking_system(config_path: impl AsRef<Path>) -> Result<ParkingSystem> {
    let config_path = config_path.as_ref();
    let config: ParkingConfigDto = parse_json_file(config_path)?;
    log::info!("Configuration '{}' parsed successfully.", config_path.display());

    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));
    build_parking_system(&config, base_dir)
}

/// Builds a [`ParkingSystem`] from an already parsed configuration.
pub fn build_parking_system(config: &ParkingConfigDto, base_dir: &Path) -> Result<ParkingSystem> {
    let graph = load_graph(resolve(base_dir, &config.graph_file))?;
    if graph.is_empty() {
        return Err(Error::ModelConstructionError(format!("Graph file '{}' contains no roads", config.graph_file)));
    }

    let mut profiles = FacilityProfileSource::from(config.default_profile);
    let facilities = load_facilities(resolve(base_dir, &config.facility_file), &mut profiles)?;

    let audit: Arc<dyn AuditSink> = match &config.audit_file {
        Some(file) => Arc::new(CsvAuditSink::open(resolve(base_dir, file))?),
        None => Arc::new(LogAuditSink),
    };

    let settings = SystemSettings {
        seed: config.seed,
        policy: config.wait_queue_policy.into(),
        unreachable_fallback_km: config.unreachable_fallback_km,
        weights: ScoreWeights::try_from(config.score_weights)?,
    };

    let mut system = ParkingSystem::new(graph, facilities, settings, audit)?;

    if let Some(file) = &config.reservation_file {
        let entries = load_reservations(resolve(base_dir, file))?;
        let restored = system.restore_reservations(entries);
        log::info!("Restored {} reservations.", restored);
    }

    if let Some(file) = &config.waitlist_file {
        let entries = load_waitlist(resolve(base_dir, file))?;
        let restored = system.restore_wait_queue(entries);
        log::info!("Restored {} vehicles into the wait queue.", restored);
    }

    log::info!("Internal ParkingSystem constructed successfully.");
    Ok(system)
}

/// Counts written by [`save_parking_system`]; `None` where the configuration names no file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SavedState {
    pub facilities: usize,
    pub reservations: Option<usize>,
    pub waiting: Option<usize>,
}

/// Writes facilities, reservations and the wait queue back to the files named in `config`.
pub fn save_parking_system(system: &ParkingSystem, config: &ParkingConfigDto, base_dir: &Path) -> Result<SavedState> {
    let facilities = save_facilities(resolve(base_dir, &config.facility_file), system.ledger().facilities(), system.audit().as_ref())?;

    let reservations = match &config.reservation_file {
        Some(file) => Some(save_reservations(resolve(base_dir, file), &system.ledger().reservations())?),
        None => None,
    };

    let waiting = match &config.waitlist_file {
        Some(file) => Some(save_waitlist(resolve(base_dir, file), system.ledger().wait_queue())?),
        None => None,
    };

    log::info!("Parking state saved: {} facilities, {:?} reservations, {:?} waiting.", facilities, reservations, waiting);
    Ok(SavedState { facilities, reservations, waiting })
}

/// `file` itself when absolute, otherwise `file` below `base_dir`.
pub fn resolve(base_dir: &Path, file: &str) -> PathBuf {
    let path = Path::new(file);
    if path.is_absolute() { path.to_path_buf() } else { base_dir.join(path) }
}
