//! 8-bit display GeoTIFF.
//!
//! The valid elevation range is stretched linearly onto 1..=255; 0 is
//! reserved for no-data.

use std::io::Cursor;

use bytes::Bytes;
use dem_common::{DemError, DemResult, ElevationGrid, OutputFormat, RasterArtifact};
use tiff::encoder::colortype::Gray8;
use tiff::encoder::TiffEncoder;
use tracing::debug;

use crate::geotiff::{tiff_err, write_geo_tags};
use crate::{EncoderOptions, RasterEncoder};

const DISPLAY_NODATA: u8 = 0;

/// Stretch elevations onto 1..=255.
pub fn scale_to_display(data: &[f32]) -> Vec<u8> {
    let (lo, hi) = data
        .iter()
        .filter(|v| !v.is_nan())
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let span = (hi - lo) as f64;

    data.iter()
        .map(|&v| {
            if v.is_nan() {
                DISPLAY_NODATA
            } else if span > 0.0 {
                (1.0 + ((v - lo) as f64 / span * 254.0).round()) as u8
            } else {
                1
            }
        })
        .collect()
}

/// Scaled 8-bit GeoTIFF encoder.
#[derive(Debug, Clone, Default)]
pub struct DisplayGeoTiffEncoder {
    options: EncoderOptions,
}

impl DisplayGeoTiffEncoder {
    pub fn new(options: EncoderOptions) -> Self {
        Self { options }
    }
}

impl RasterEncoder for DisplayGeoTiffEncoder {
    fn format(&self) -> OutputFormat {
        OutputFormat::GeoTiffDisplay
    }

    fn encode(&self, grid: &ElevationGrid) -> DemResult<RasterArtifact> {
        if grid.is_empty() {
            return Err(DemError::Internal("cannot encode an empty grid".to_string()));
        }

        let pixels = scale_to_display(&grid.data);
        let nodata = DISPLAY_NODATA.to_string();

        let mut buf = Cursor::new(Vec::new());
        {
            let mut encoder = TiffEncoder::new(&mut buf)
                .map_err(tiff_err)?
                .with_compression(self.options.compression.to_tiff());
            let mut image = encoder
                .new_image::<Gray8>(grid.width as u32, grid.height as u32)
                .map_err(tiff_err)?;
            write_geo_tags(image.encoder(), &grid.transform, grid.crs, &nodata)
                .map_err(tiff_err)?;
            image.write_data(&pixels).map_err(tiff_err)?;
        }

        let bytes = buf.into_inner();
        debug!(size_bytes = bytes.len(), "Encoded display GeoTIFF");

        Ok(RasterArtifact {
            bytes: Bytes::from(bytes),
            format: OutputFormat::GeoTiffDisplay,
            width: grid.width,
            height: grid.height,
            transform: grid.transform,
            crs: grid.crs,
            nodata: Some(DISPLAY_NODATA as f64),
        })
    }
}
