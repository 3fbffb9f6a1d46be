//! Elevation grid processing.
//!
//! The CPU-bound middle of the pipeline:
//!
//! ```text
//! EncodedTile ──► decode ──► ElevationGrid (per tile, 3857)
//!                                 │
//!                                 ▼
//!                      mosaic::assemble(window)
//!                                 │
//!                                 ▼
//!                      ElevationGrid (request window, 3857)
//!                                 │
//!                                 ▼
//!                    Reprojector::reproject(target)
//!                                 │
//!                                 ▼
//!                      ElevationGrid (target CRS)
//! ```
//!
//! All stages treat `NaN` as no-data and never blend it into valid values.

pub mod decode;
pub mod mosaic;
pub mod projection;

pub use decode::{decode_all, decode_tile};
pub use mosaic::{assemble, MosaicWindow};
pub use projection::{
    bilinear_interpolate, cubic_interpolate, nearest_interpolate, ReprojectTarget, Reprojector,
};
