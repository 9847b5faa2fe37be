pub mod facility_dto;
pub mod graph_dto;
pub mod parking_config_dto;
pub mod reservation_dto;
pub mod waitlist_dto;
