//! Error types for the multiattr-eval library.

use thiserror::Error;

/// Result type for multiattr-eval operations.
pub type Result<T> = std::result::Result<T, EvalError>;

/// Error types that can occur during multi-attribute evaluation.
#[derive(Error, Debug)]
pub enum EvalError {
    /// Error during JSON parsing or serialization.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Error during I/O operations.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error raised by polars while building or reading a DataFrame.
    #[error("Polars error: {0}")]
    PolarsError(#[from] polars::error::PolarsError),

    /// Invalid evaluation configuration.
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Inputs disagree with the configured attribute layout.
    #[error("Attribute mismatch: {0}")]
    AttributeMismatch(String),

    /// Malformed ground-truth label.
    #[error("Invalid label: {0}")]
    InvalidLabel(String),

    /// Invalid bounding box coordinates.
    #[error("Invalid bounding box: {0}")]
    InvalidBoundingBox(String),

    /// Invalid confidence or IoU threshold.
    #[error("Invalid threshold: {0}")]
    InvalidThreshold(String),

    /// Required DataFrame column is absent.
    #[error("Missing column: {0}")]
    MissingColumn(String),

    /// DataFrame has an unexpected shape or dtype.
    #[error("Invalid DataFrame: {0}")]
    InvalidDataFrame(String),

    /// The external scoring tool failed.
    #[error("External scorer failed: {0}")]
    ExternalScorer(String),
}
