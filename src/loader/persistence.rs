use chrono::Utc;
use std::path::Path;

use crate::api::facility_dto::FacilityDto;
use crate::api::graph_dto::EdgeDto;
use crate::api::reservation_dto::ReservationDto;
use crate::api::waitlist_dto::WaitlistEntryDto;
use crate::domain::parking_system_model::graph::graph_store::GraphStore;
use crate::domain::parking_system_model::ledger::allocation_ledger::Assignment;
use crate::domain::parking_system_model::ledger::facility::Facility;
use crate::domain::parking_system_model::ledger::wait_queue::{WaitQueue, WaitingVehicle};
use crate::domain::parking_system_model::utils::audit::{AuditKind, AuditSink};
use crate::domain::parking_system_model::utils::id::{FacilityId, VehicleId};
use crate::error::Result;
use crate::loader::facility_profile::FacilityProfileSource;
use crate::loader::parser::{parse_csv_file, write_csv_file};

/// Loads the road file (`A,B,distanceKm` per line).
pub fn load_graph(path: impl AsRef<Path>) -> Result<GraphStore> {
    let edges: Vec<EdgeDto> = parse_csv_file(path.as_ref())?;
    let graph = GraphStore::try_from(edges)?;

    log::info!("Loaded {} roads between {} locations from '{}'.", graph.road_count(), graph.location_count(), path.as_ref().display());
    Ok(graph)
}

/// Loads the facility file. Absent cost and amenity columns are taken from `profiles`,
/// one profile per facility in file order.
pub fn load_facilities(path: impl AsRef<Path>, profiles: &mut FacilityProfileSource) -> Result<Vec<Facility>> {
    let dtos: Vec<FacilityDto> = parse_csv_file(path.as_ref())?;

    let facilities = dtos
        .into_iter()
        .map(|dto| Facility::try_from((dto, profiles.next_profile())))
        .collect::<std::result::Result<Vec<Facility>, _>>()?;

    log::info!("Loaded {} facilities from '{}'.", facilities.len(), path.as_ref().display());
    Ok(facilities)
}

/// Writes every facility back in the facility file layout.
pub fn save_facilities<'a>(path: impl AsRef<Path>, facilities: impl IntoIterator<Item = &'a Facility>, audit: &dyn AuditSink) -> Result<usize> {
    let dtos: Vec<FacilityDto> = facilities.into_iter().map(Facility::to_dto).collect();
    write_csv_file(path.as_ref(), &dtos)?;

    audit.record(AuditKind::DataSave, &format!("Saved {} facilities to {}", dtos.len(), path.as_ref().display()));
    Ok(dtos.len())
}

/// Restores a wait queue snapshot. A missing file is an empty queue.
pub fn load_waitlist(path: impl AsRef<Path>) -> Result<Vec<WaitingVehicle>> {
    if !path.as_ref().exists() {
        log::info!("No wait queue snapshot at '{}'; starting with an empty queue.", path.as_ref().display());
        return Ok(Vec::new());
    }

    let dtos: Vec<WaitlistEntryDto> = parse_csv_file(path.as_ref())?;
    let entries: Vec<WaitingVehicle> = dtos
        .into_iter()
        .filter(|dto| !dto.vehicle.trim().is_empty())
        .map(|dto| WaitingVehicle {
            vehicle: VehicleId::normalized(&dto.vehicle),
            requested: dto.requested_facility.map(|id| FacilityId::new(id.trim())).filter(|id| !id.is_empty()),
        })
        .collect();

    log::info!("Read {} wait queue entries from '{}'.", entries.len(), path.as_ref().display());
    Ok(entries)
}

/// Snapshots the queue in FIFO order, stamped with the current time.
pub fn save_waitlist(path: impl AsRef<Path>, queue: &WaitQueue) -> Result<usize> {
    let enqueued_at = Utc::now().timestamp();
    let dtos: Vec<WaitlistEntryDto> = queue
        .iter()
        .map(|entry| WaitlistEntryDto {
            vehicle: entry.vehicle.to_string(),
            enqueued_at: Some(enqueued_at),
            requested_facility: entry.requested.as_ref().map(FacilityId::to_string),
        })
        .collect();

    write_csv_file(path.as_ref(), &dtos)?;
    Ok(dtos.len())
}

/// Reads persisted assignments. A missing file means nobody is parked by name.
pub fn load_reservations(path: impl AsRef<Path>) -> Result<Vec<Assignment>> {
    if !path.as_ref().exists() {
        return Ok(Vec::new());
    }

    let dtos: Vec<ReservationDto> = parse_csv_file(path.as_ref())?;
    let entries: Vec<Assignment> = dtos
        .into_iter()
        .filter(|dto| !dto.vehicle.trim().is_empty() && !dto.facility.trim().is_empty())
        .map(|dto| Assignment { vehicle: VehicleId::normalized(&dto.vehicle), facility: FacilityId::new(dto.facility.trim()) })
        .collect();

    log::info!("Read {} reservations from '{}'.", entries.len(), path.as_ref().display());
    Ok(entries)
}

pub fn save_reservations(path: impl AsRef<Path>, assignments: &[Assignment]) -> Result<usize> {
    let dtos: Vec<ReservationDto> = assignments
        .iter()
        .map(|assignment| ReservationDto { vehicle: assignment.vehicle.to_string(), facility: assignment.facility.to_string() })
        .collect();

    write_csv_file(path.as_ref(), &dtos)?;
    Ok(dtos.len())
}
