pub mod distance_cache;
pub mod graph;
pub mod ledger;
pub mod parking_system;
pub mod scoring;
pub mod utils;
