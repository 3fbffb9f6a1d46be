//! Tile source error types.

use thiserror::Error;

/// A failed attempt to read one tile from a source.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SourceError {
    /// Worth retrying: timeouts, connection failures, 5xx, 429.
    #[error("Transient source error: {0}")]
    Transient(String),

    /// Retrying will not help: other 4xx, malformed addresses.
    #[error("Permanent source error: {0}")]
    Permanent(String),
}

impl SourceError {
    pub fn is_transient(&self) -> bool {
        matches!(self, SourceError::Transient(_))
    }

    pub fn message(&self) -> &str {
        match self {
            SourceError::Transient(m) | SourceError::Permanent(m) => m,
        }
    }
}
