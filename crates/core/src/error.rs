//! Error types for PFT

use thiserror::Error;

/// Main error type for PFT operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid grid dimensions: {rows}x{cols}")]
    InvalidDimensions { rows: usize, cols: usize },

    #[error("Index out of bounds: ({row}, {col}) in grid of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Grid size mismatch: expected ({er}, {ec}), got ({ar}, {ac})")]
    SizeMismatch { er: usize, ec: usize, ar: usize, ac: usize },

    /// A sample is malformed (missing label, shape mismatch, wrong channel count)
    #[error("Sample '{sample}' is malformed: {reason}")]
    Data { sample: String, reason: String },

    /// A foreground pixel carries a NaN or infinite measurement
    #[error("Sample '{sample}' has non-finite value {value} at ({row}, {col}) channel {channel}")]
    InvalidFeature {
        sample: String,
        row: usize,
        col: usize,
        channel: usize,
        value: f64,
    },

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    /// Training cannot start with the given configuration and data
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Shorthand for a [`Error::Data`] on a named sample
    pub fn data(sample: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Data {
            sample: sample.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error concerns a single sample and the sample can be skipped
    pub fn is_sample_local(&self) -> bool {
        matches!(self, Error::Data { .. } | Error::InvalidFeature { .. })
    }
}

impl From<ndarray::ShapeError> for Error {
    fn from(e: ndarray::ShapeError) -> Self {
        Error::Other(e.to_string())
    }
}

/// Result type alias for PFT operations
pub type Result<T> = std::result::Result<T, Error>;
