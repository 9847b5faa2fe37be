#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use smart_parking::domain::parking_system_model::graph::graph_store::GraphStore;
use smart_parking::domain::parking_system_model::ledger::facility::Facility;
use smart_parking::domain::parking_system_model::parking_system::{ParkingSystem, SystemSettings};
use smart_parking::domain::parking_system_model::utils::audit::MemoryAuditSink;
use smart_parking::domain::parking_system_model::utils::id::{FacilityId, LocationId, VehicleId};

pub fn loc(name: &str) -> LocationId {
    LocationId::new(name)
}

pub fn lot(id: &str) -> FacilityId {
    FacilityId::new(id)
}

pub fn car(id: &str) -> VehicleId {
    VehicleId::new(id)
}

/// A-B=5, B-C=3, A-C=20.
pub fn triangle() -> GraphStore {
    GraphStore::from_roads([("A", "B", 5.0), ("B", "C", 3.0), ("A", "C", 20.0)]).unwrap()
}

/// Seven locations in two components: a city core and an island (X, Y).
pub fn city() -> GraphStore {
    GraphStore::from_roads([
        ("MG ROAD", "INDIRANAGAR", 4.0),
        ("MG ROAD", "KORAMANGALA", 6.0),
        ("INDIRANAGAR", "WHITEFIELD", 12.0),
        ("KORAMANGALA", "WHITEFIELD", 15.0),
        ("INDIRANAGAR", "KORAMANGALA", 5.5),
        ("X", "Y", 1.0),
    ])
    .unwrap()
}

pub fn city_facilities() -> Vec<Facility> {
    vec![
        Facility::new("1", "MG ROAD", 3, 3, 4.2).with_cost(18.0),
        Facility::new("2", "INDIRANAGAR", 2, 2, 4.8).with_cost(12.0),
        Facility::new("3", "WHITEFIELD", 5, 4, 3.1).with_cost(10.0),
        Facility::new("4", "Y", 2, 2, 5.0).with_cost(5.0),
    ]
}

pub fn city_system(seed: u64) -> (ParkingSystem, Arc<MemoryAuditSink>) {
    let audit = Arc::new(MemoryAuditSink::new());
    let settings = SystemSettings { seed: Some(seed), ..SystemSettings::default() };
    let system = ParkingSystem::new(city(), city_facilities(), settings, audit.clone()).unwrap();
    (system, audit)
}

/// Fresh scratch directory below the system temp dir.
pub fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("smart_parking_{}_{}", name, std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}
