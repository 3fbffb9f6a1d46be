//! Error types for the elevation mosaic pipeline.

use thiserror::Error;

/// Result type alias using DemError.
pub type DemResult<T> = Result<T, DemError>;

/// Primary error type for pipeline operations.
///
/// Every failure surfaced to a caller carries one of these kinds plus a
/// human-readable detail. Validation kinds are raised before any tile is
/// fetched.
#[derive(Debug, Error)]
pub enum DemError {
    // === Validation Errors ===
    #[error("Invalid extent: {0}")]
    InvalidExtent(String),

    #[error("Zoom level {zoom} is outside the source pyramid range 0..={max_zoom}")]
    ZoomOutOfRange { zoom: u32, max_zoom: u8 },

    #[error("Requested too many tiles ({requested} in total, limit is {limit}). Try a lower zoom level or smaller bbox.")]
    TooManyTiles { requested: usize, limit: usize },

    #[error("Requested format not supported: {0}")]
    UnsupportedFormat(String),

    // === Source Errors ===
    #[error("Tile source unavailable: {unavailable} of {total} tiles could not be fetched (tolerance {tolerance})")]
    SourceUnavailable {
        unavailable: usize,
        total: usize,
        tolerance: f64,
    },

    #[error("Failed to decode tile: {0}")]
    DecodeError(String),

    // === Processing Errors ===
    #[error("Reprojection failed: {0}")]
    ReprojectionError(String),

    // === Storage Errors ===
    #[error("Storage error: {0}")]
    StorageError(String),

    // === Infrastructure Errors ===
    #[error("Request deadline exceeded")]
    Timeout,

    #[error("Request cancelled")]
    Cancelled,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DemError {
    /// Stable name of the error kind, used in structured responses and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            DemError::InvalidExtent(_) => "InvalidExtent",
            DemError::ZoomOutOfRange { .. } => "ZoomOutOfRange",
            DemError::TooManyTiles { .. } => "TooManyTiles",
            DemError::UnsupportedFormat(_) => "UnsupportedFormat",
            DemError::SourceUnavailable { .. } => "SourceUnavailable",
            DemError::DecodeError(_) => "DecodeError",
            DemError::ReprojectionError(_) => "ReprojectionError",
            DemError::StorageError(_) => "StorageError",
            DemError::Timeout => "Timeout",
            DemError::Cancelled => "Cancelled",
            DemError::Internal(_) => "Internal",
        }
    }

    /// Whether this error is raised by request validation (before any fetch).
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            DemError::InvalidExtent(_)
                | DemError::ZoomOutOfRange { .. }
                | DemError::TooManyTiles { .. }
                | DemError::UnsupportedFormat(_)
        )
    }

    /// Get the HTTP status code for this error.
    pub fn http_status_code(&self) -> u16 {
        match self {
            DemError::InvalidExtent(_)
            | DemError::ZoomOutOfRange { .. }
            | DemError::TooManyTiles { .. }
            | DemError::UnsupportedFormat(_) => 400,

            // An unsupported target CRS is a client error; a singular
            // transform for a valid CRS is too.
            DemError::ReprojectionError(_) => 422,

            DemError::SourceUnavailable { .. } | DemError::DecodeError(_) => 502,

            DemError::Timeout => 504,
            DemError::Cancelled => 499,

            DemError::StorageError(_) | DemError::Internal(_) => 500,
        }
    }
}

impl From<std::io::Error> for DemError {
    fn from(err: std::io::Error) -> Self {
        DemError::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for DemError {
    fn from(err: serde_json::Error) -> Self {
        DemError::Internal(format!("JSON error: {}", err))
    }
}
