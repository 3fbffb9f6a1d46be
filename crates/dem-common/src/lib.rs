//! Common types shared across the elevation mosaic crates and services.

pub mod artifact;
pub mod bbox;
pub mod crs;
pub mod error;
pub mod grid;
pub mod request;
pub mod resolver;
pub mod tile;

pub use artifact::{ArtifactMetadata, RasterArtifact};
pub use bbox::BoundingBox;
pub use crs::CrsCode;
pub use error::{DemError, DemResult};
pub use grid::{ElevationGrid, GeoTransform};
pub use request::{ElevationRequest, GeoExtent, OutputFormat, ResamplingMethod};
pub use resolver::{resolve_tiles, zoom_for_resolution, ColumnRange, TileSet};
pub use tile::{EncodedTile, TileCoordinate, TileEncoding, TilePyramid, TileSourceSpec};
