//! Projection error types.

use dem_common::DemError;
use thiserror::Error;

pub type ProjectionResult<T> = Result<T, ProjectionError>;

#[derive(Debug, Error, PartialEq)]
pub enum ProjectionError {
    /// The point lies where the projection is undefined or singular.
    #[error("Point ({x}, {y}) is outside the domain of {crs}")]
    OutOfDomain { crs: String, x: f64, y: f64 },
}

impl From<ProjectionError> for DemError {
    fn from(err: ProjectionError) -> Self {
        DemError::ReprojectionError(err.to_string())
    }
}
