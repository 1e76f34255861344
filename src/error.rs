//! Error types for the leakage audit pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, AuditError>;

/// Main error type for the pipeline
#[derive(Error, Debug)]
pub enum AuditError {
    #[error("Source not found: {path}")]
    SourceNotFound { path: String },

    #[error("Unknown dataset kind '{0}' (expected 'uci_hospitals' or 'pima')")]
    UnknownDatasetKind(String),

    #[error("Could not derive 'target' for dataset kind '{kind}': expected a '{expected}' column")]
    MissingTarget { kind: String, expected: String },

    #[error("Unsupported metric: {0}")]
    UnsupportedMetric(String),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Training error: {0}")]
    TrainingError(String),

    #[error("Feature not found: {0}")]
    FeatureNotFound(String),

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<polars::error::PolarsError> for AuditError {
    fn from(err: polars::error::PolarsError) -> Self {
        AuditError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for AuditError {
    fn from(err: serde_json::Error) -> Self {
        AuditError::SerializationError(err.to_string())
    }
}

impl From<serde_yaml::Error> for AuditError {
    fn from(err: serde_yaml::Error) -> Self {
        AuditError::ConfigError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for AuditError {
    fn from(err: ndarray::ShapeError) -> Self {
        AuditError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}
