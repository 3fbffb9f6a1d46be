//! Raster encoding for assembled elevation grids.
//!
//! Each [`OutputFormat`] has one [`RasterEncoder`]:
//!
//! - [`GeoTiffEncoder`]: Float32 GeoTIFF with internal overviews
//! - [`DisplayGeoTiffEncoder`]: 8-bit scaled GeoTIFF for quick viewing
//! - [`TerrariumPngEncoder`]: Terrarium-packed RGB PNG

pub mod display;
pub mod geotiff;
pub mod options;
pub mod png;

pub use display::DisplayGeoTiffEncoder;
pub use geotiff::GeoTiffEncoder;
pub use options::{EncoderOptions, TiffCompression};
pub use png::TerrariumPngEncoder;

use dem_common::{DemResult, ElevationGrid, OutputFormat, RasterArtifact};

/// Serializes an elevation grid into one output format.
pub trait RasterEncoder: Send + Sync {
    fn format(&self) -> OutputFormat;

    /// Encode the grid. `NaN` cells are written as the format's no-data value.
    fn encode(&self, grid: &ElevationGrid) -> DemResult<RasterArtifact>;
}

/// Build the encoder for `format`.
pub fn encoder_for(format: OutputFormat, options: &EncoderOptions) -> Box<dyn RasterEncoder> {
    match format {
        OutputFormat::GeoTiff => Box::new(GeoTiffEncoder::new(options.clone())),
        OutputFormat::GeoTiffDisplay => Box::new(DisplayGeoTiffEncoder::new(options.clone())),
        OutputFormat::TerrariumPng => Box::new(TerrariumPngEncoder::new()),
    }
}
