//! Centralized error handling for remapnc
//!
//! Structural failures (shape, geometry, reference system) abort the call that
//! raised them. Degenerate normalization groups are not errors; they are
//! reported as data by [`crate::weights::NormalizationReport`].

use thiserror::Error;

/// Main error type for remapnc operations
#[derive(Debug, Error)]
pub enum RemapError {
    /// NetCDF file operation errors
    #[error("NetCDF error: {0}")]
    NetCDF(#[from] netcdf::Error),

    /// I/O operation errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Array shape or dimension error raised by ndarray
    #[error("Array error: {0}")]
    Array(#[from] ndarray::ShapeError),

    /// Malformed file name pattern
    #[error("Invalid file pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    /// JSON (de)serialization of polygon sets or weight tables
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Coordinate arrays of incompatible shape
    #[error("Shape mismatch: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    /// Non-polygonal or unrepairable geometry supplied to the overlay
    #[error("Geometry type error: {message}")]
    GeometryType { message: String },

    /// Requested variable or dimension absent from a dataset
    #[error("Field '{field}' not found in {source_name}")]
    MissingField { field: String, source_name: String },

    /// No files matched a requested pattern
    #[error("No data files match pattern '{pattern}'")]
    NoData { pattern: String },

    /// Two polygon sets with different reference systems and no projection to reconcile them
    #[error("Reference systems differ ('{first}' vs '{second}') and no projection was supplied")]
    CrsMismatch { first: String, second: String },

    /// Caller supplied arguments that cannot be used together
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Thread pool configuration error
    #[error("Thread pool error: {0}")]
    ThreadPool(String),
}

impl RemapError {
    /// Shorthand for a missing variable or dimension
    pub fn missing(field: impl Into<String>, source_name: impl Into<String>) -> Self {
        RemapError::MissingField {
            field: field.into(),
            source_name: source_name.into(),
        }
    }
}

/// Result type alias for remapnc operations
pub type Result<T> = std::result::Result<T, RemapError>;
