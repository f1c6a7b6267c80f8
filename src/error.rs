//! Error types for the sales forecasting pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, ForecastError>;

/// Main error type for the forecasting pipeline
#[derive(Error, Debug)]
pub enum ForecastError {
    /// A transform or model artifact is missing or unreadable. Fatal at startup.
    #[error("Failed to load artifact {path}: {reason}")]
    ArtifactLoad { path: String, reason: String },

    /// A record field is missing, unparsable or outside its domain.
    #[error("Schema error in record {row}, field `{field}`: {reason}")]
    Schema {
        row: usize,
        field: String,
        reason: String,
    },

    /// The batch as a whole has the wrong shape.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// No record survived filtering. Not a failure; callers report "no data".
    #[error("No predictable records in batch")]
    EmptyResult,

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Store {0} not available")]
    StoreNotAvailable(i64),

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Inference error: {0}")]
    InferenceError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ForecastError {
    /// Build a record-level schema error
    pub fn schema(row: usize, field: impl Into<String>, reason: impl Into<String>) -> Self {
        ForecastError::Schema {
            row,
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Build an artifact load error
    pub fn artifact(path: impl AsRef<std::path::Path>, reason: impl ToString) -> Self {
        ForecastError::ArtifactLoad {
            path: path.as_ref().display().to_string(),
            reason: reason.to_string(),
        }
    }

    /// Whether the caller sent malformed data
    pub fn is_schema_error(&self) -> bool {
        matches!(self, ForecastError::Schema { .. } | ForecastError::InvalidInput(_))
    }

    /// Whether this signals an empty (but valid) result
    pub fn is_empty_result(&self) -> bool {
        matches!(self, ForecastError::EmptyResult)
    }
}

impl From<polars::error::PolarsError> for ForecastError {
    fn from(err: polars::error::PolarsError) -> Self {
        ForecastError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for ForecastError {
    fn from(err: serde_json::Error) -> Self {
        ForecastError::SerializationError(err.to_string())
    }
}
