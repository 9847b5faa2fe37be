pub mod candidate_selector;
pub mod facility_scorer;
