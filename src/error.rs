use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("File not found or could not be read: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse configuration JSON: {0}")]
    DeserializationError(#[from] serde_json::Error),

    #[error("Failed to read or write CSV data: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Rejected input data: {0}")]
    ConversionError(#[from] ConversionError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Failed to build parking system model: {0}")]
    ModelConstructionError(String),

    #[error("Allocation state is inconsistent: {0}")]
    InconsistentState(String),
}

/// Raised while turning externally supplied records into domain objects.
///
/// The core refuses to start from corrupt invariants, so every variant here is
/// reported before a `GraphStore` or an `AllocationLedger` exists.
#[derive(Debug, Error, PartialEq)]
pub enum ConversionError {
    #[error("Edge {from} -> {to} has a negative weight ({weight} km)")]
    NegativeWeight { from: String, to: String, weight: f64 },

    #[error("Edge {from} -> {to} has a non-finite weight")]
    NonFiniteWeight { from: String, to: String },

    #[error("Location name must not be empty")]
    EmptyLocation,

    #[error("Facility id must not be empty")]
    EmptyFacilityId,

    #[error("Facility {0} is defined more than once")]
    DuplicateFacility(String),

    #[error("Facility {id} has a negative capacity ({value})")]
    NegativeCapacity { id: String, value: i64 },

    #[error("Facility {id} has a non-finite {field}")]
    NonFiniteAttribute { id: String, field: &'static str },
}

pub type Result<T> = std::result::Result<T, Error>;
