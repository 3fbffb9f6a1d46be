//! Elevation mosaic pipeline.
//!
//! One [`ElevationPipeline::run`] call turns an [`ElevationRequest`] into
//! encoded rasters:
//!
//! ```text
//! resolve tiles -> fetch (bounded) -> decode (rayon) -> assemble
//!     -> reproject -> encode
//! ```
//!
//! Requests are validated in full before the first tile is fetched. The whole
//! run is bounded by [`PipelineConfig::deadline`].
//!
//! [`ElevationRequest`]: dem_common::ElevationRequest

pub mod config;
pub mod pipeline;

pub use config::{ConfigError, PipelineConfig};
pub use pipeline::{ElevationPipeline, PipelineOutput, PipelineStats, RequestPlan};
