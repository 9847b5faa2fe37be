pub mod allocation_error;
pub mod allocation_ledger;
pub mod facility;
pub mod wait_queue;
