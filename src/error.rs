//! Error types for the demand_forecast crate

use thiserror::Error;

/// Custom error types for the demand_forecast crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// A required input table is missing or unreadable
    #[error("Data load error: {0}")]
    DataLoad(String),

    /// Structurally broken data reached feature assembly (e.g. a missing timestamp)
    #[error("Data integrity error: {0}")]
    DataIntegrity(String),

    /// A declared-numeric feature column holds a non-numeric type
    #[error("Invalid data type for feature {column}: {observed}. Must be int, float, or bool.")]
    DataType { column: String, observed: String },

    /// Prediction was requested without successfully trained models
    #[error("Cannot make predictions: models not trained successfully")]
    ModelUnavailable,

    /// Error from invalid arguments or inconsistent internal state
    #[error("Validation error: {0}")]
    Validation(String),

    /// Error from IO operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from CSV reading or writing
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Error from Polars operations
    #[error("Polars error: {0}")]
    Polars(String),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

impl From<polars::prelude::PolarsError> for ForecastError {
    fn from(err: polars::prelude::PolarsError) -> Self {
        ForecastError::Polars(err.to_string())
    }
}
