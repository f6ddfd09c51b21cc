//! Error types for climate-subset.

use thiserror::Error;

use crate::bbox::BboxParseError;
use crate::time::TimeParseError;

/// Result type alias using SubsetError.
pub type SubsetResult<T> = Result<T, SubsetError>;

/// Primary error type for subsetting operations.
#[derive(Debug, Error)]
pub enum SubsetError {
    // === Parameter Errors ===
    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("Invalid parameter value for '{param}': {message}")]
    InvalidParameter { param: String, message: String },

    #[error("Unsupported value for '{param}': {message}")]
    UnsupportedInput { param: String, message: String },

    #[error("Requested output format not supported: {0}")]
    UnsupportedFormat(String),

    // === Data Errors ===
    #[error("Dataset has no '{0}' coordinate")]
    MissingCoordinate(String),

    #[error("Invalid dataset: {0}")]
    InvalidDataset(String),

    #[error("No data available: {0}")]
    NoDataAvailable(String),

    // === Infrastructure Errors ===
    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl SubsetError {
    /// Create an InvalidParameter error.
    pub fn invalid_parameter(param: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            param: param.into(),
            message: message.into(),
        }
    }

    /// Create an UnsupportedInput error.
    pub fn unsupported(param: impl Into<String>, message: impl Into<String>) -> Self {
        Self::UnsupportedInput {
            param: param.into(),
            message: message.into(),
        }
    }

    /// Create an InvalidDataset error.
    pub fn invalid_dataset(msg: impl Into<String>) -> Self {
        Self::InvalidDataset(msg.into())
    }

    /// Create a StorageError.
    pub fn storage_error(msg: impl Into<String>) -> Self {
        Self::StorageError(msg.into())
    }

    /// Wrap a time parsing failure for the named parameter.
    pub fn from_time(param: impl Into<String>, err: TimeParseError) -> Self {
        Self::invalid_parameter(param, err.to_string())
    }

    /// Wrap an area parsing failure.
    pub fn from_bbox(err: BboxParseError) -> Self {
        Self::invalid_parameter("area", err.to_string())
    }

    /// Get the OGC exception code for this error.
    pub fn exception_code(&self) -> &'static str {
        match self {
            SubsetError::MissingParameter(_) => "MissingParameterValue",
            SubsetError::InvalidParameter { .. } => "InvalidParameterValue",
            SubsetError::UnsupportedInput { .. } => "InvalidParameterValue",
            SubsetError::UnsupportedFormat(_) => "InvalidFormat",
            SubsetError::MissingCoordinate(_) => "MissingDimensionValue",
            SubsetError::NoDataAvailable(_) => "MissingDimensionValue",
            _ => "NoApplicableCode",
        }
    }

    /// Whether the caller supplied a bad or missing parameter.
    pub fn is_parameter_error(&self) -> bool {
        matches!(
            self,
            SubsetError::MissingParameter(_)
                | SubsetError::InvalidParameter { .. }
                | SubsetError::UnsupportedInput { .. }
                | SubsetError::UnsupportedFormat(_)
        )
    }
}

// Conversion from common error types
impl From<std::io::Error> for SubsetError {
    fn from(err: std::io::Error) -> Self {
        SubsetError::StorageError(err.to_string())
    }
}

impl From<serde_json::Error> for SubsetError {
    fn from(err: serde_json::Error) -> Self {
        SubsetError::InvalidDataset(format!("JSON error: {}", err))
    }
}
