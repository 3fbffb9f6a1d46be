//! Coordinate reference system transformations.
//!
//! Implements the handful of projections the elevation pipeline targets
//! from scratch, without an external geoprocessing library. Callers go
//! through [`Transformer::transform_point`]; individual projections are
//! exposed for tests and tooling.

pub mod error;
pub mod geographic;
pub mod mercator;
pub mod transform;
pub mod transverse_mercator;

pub use error::{ProjectionError, ProjectionResult};
pub use geographic::Geographic;
pub use mercator::WebMercator;
pub use transform::{projection_for, CoordinateTransform, Transformer};
pub use transverse_mercator::TransverseMercator;
