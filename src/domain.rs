pub mod parking_system_model;
pub mod simulator;
