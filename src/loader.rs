pub mod facility_profile;
pub mod location_directory;
pub mod parser;
pub mod persistence;
