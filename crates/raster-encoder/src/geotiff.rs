//! Float32 GeoTIFF output.
//!
//! Writes a single-band IEEE float image georeferenced with
//! ModelPixelScale, ModelTiepoint and a GeoKeyDirectory naming the EPSG
//! code, plus the GDAL_NODATA tag. Reduced-resolution overviews follow the
//! full-resolution image as extra IFDs.

use std::io::{Cursor, Seek, Write};

use bytes::Bytes;
use dem_common::{CrsCode, DemError, DemResult, ElevationGrid, GeoTransform, OutputFormat, RasterArtifact};
use tiff::encoder::colortype::Gray32Float;
use tiff::encoder::{DirectoryEncoder, TiffEncoder, TiffKind};
use tiff::tags::Tag;
use tracing::debug;

use crate::{EncoderOptions, RasterEncoder};

// GeoTIFF tag IDs
pub(crate) const TAG_MODEL_PIXEL_SCALE: u16 = 33550;
pub(crate) const TAG_MODEL_TIEPOINT: u16 = 33922;
pub(crate) const TAG_GEO_KEY_DIRECTORY: u16 = 34735;
pub(crate) const TAG_GDAL_NODATA: u16 = 42113;

// GeoKey IDs
const GT_MODEL_TYPE_GEO_KEY: u16 = 1024;
const GT_RASTER_TYPE_GEO_KEY: u16 = 1025;
const GEOGRAPHIC_TYPE_GEO_KEY: u16 = 2048;
const PROJECTED_CS_TYPE_GEO_KEY: u16 = 3072;

// GeoKey values
const MODEL_TYPE_PROJECTED: u16 = 1;
const MODEL_TYPE_GEOGRAPHIC: u16 = 2;
const RASTER_PIXEL_IS_AREA: u16 = 1;

/// NewSubfileType bit marking a reduced-resolution image
const SUBFILE_REDUCED_IMAGE: u32 = 1;

const OVERVIEW_FACTORS: [usize; 6] = [2, 4, 8, 16, 32, 64];

pub(crate) fn tiff_err(e: tiff::TiffError) -> DemError {
    DemError::Internal(format!("GeoTIFF encoding failed: {}", e))
}

/// GeoKeyDirectory entries for a CRS.
pub(crate) fn geo_key_directory(crs: CrsCode) -> Vec<u16> {
    let (model_type, crs_key) = if crs.is_geographic() {
        (MODEL_TYPE_GEOGRAPHIC, GEOGRAPHIC_TYPE_GEO_KEY)
    } else {
        (MODEL_TYPE_PROJECTED, PROJECTED_CS_TYPE_GEO_KEY)
    };

    let mut keys = vec![
        1, // KeyDirectoryVersion
        1, // KeyRevision
        0, // MinorRevision
        3, // NumberOfKeys
    ];
    keys.extend_from_slice(&[GT_MODEL_TYPE_GEO_KEY, 0, 1, model_type]);
    keys.extend_from_slice(&[GT_RASTER_TYPE_GEO_KEY, 0, 1, RASTER_PIXEL_IS_AREA]);
    keys.extend_from_slice(&[crs_key, 0, 1, crs.epsg() as u16]);
    keys
}

/// Write georeferencing and no-data tags into an image directory.
pub(crate) fn write_geo_tags<W: Write + Seek, K: TiffKind>(
    dir: &mut DirectoryEncoder<'_, W, K>,
    transform: &GeoTransform,
    crs: CrsCode,
    nodata: &str,
) -> tiff::TiffResult<()> {
    let pixel_scale = [transform.pixel_width, transform.pixel_height, 0.0];
    dir.write_tag(Tag::Unknown(TAG_MODEL_PIXEL_SCALE), pixel_scale.as_slice())?;

    // Ties pixel (0, 0) to the top-left corner
    let tiepoint = [0.0, 0.0, 0.0, transform.origin_x, transform.origin_y, 0.0];
    dir.write_tag(Tag::Unknown(TAG_MODEL_TIEPOINT), tiepoint.as_slice())?;

    let geokeys = geo_key_directory(crs);
    dir.write_tag(Tag::Unknown(TAG_GEO_KEY_DIRECTORY), geokeys.as_slice())?;

    dir.write_tag(Tag::Unknown(TAG_GDAL_NODATA), nodata)?;
    Ok(())
}

/// Overview decimation factors for a `width` x `height` image.
///
/// Levels stop once the larger side of the overview would drop below
/// `min_size`.
pub fn overview_factors(width: usize, height: usize, min_size: usize) -> Vec<usize> {
    OVERVIEW_FACTORS
        .iter()
        .copied()
        .take_while(|f| width.max(height).div_ceil(*f) >= min_size)
        .collect()
}

/// Nearest-neighbour decimation by `factor`, sampling each block's center.
fn decimate(data: &[f32], width: usize, height: usize, factor: usize) -> (usize, usize, Vec<f32>) {
    let out_w = width.div_ceil(factor);
    let out_h = height.div_ceil(factor);
    let mut out = Vec::with_capacity(out_w * out_h);
    for row in 0..out_h {
        let src_row = (row * factor + factor / 2).min(height - 1);
        for col in 0..out_w {
            let src_col = (col * factor + factor / 2).min(width - 1);
            out.push(data[src_row * width + src_col]);
        }
    }
    (out_w, out_h, out)
}

/// Float32 GeoTIFF encoder.
#[derive(Debug, Clone, Default)]
pub struct GeoTiffEncoder {
    options: EncoderOptions,
}

impl GeoTiffEncoder {
    pub fn new(options: EncoderOptions) -> Self {
        Self { options }
    }
}

impl RasterEncoder for GeoTiffEncoder {
    fn format(&self) -> OutputFormat {
        OutputFormat::GeoTiff
    }

    fn encode(&self, grid: &ElevationGrid) -> DemResult<RasterArtifact> {
        if grid.is_empty() {
            return Err(DemError::Internal("cannot encode an empty grid".to_string()));
        }

        let nodata = self.options.nodata_value as f32;
        let nodata_str = self.options.nodata_value.to_string();
        let data: Vec<f32> = grid
            .data
            .iter()
            .map(|v| if v.is_nan() { nodata } else { *v })
            .collect();

        let (width, height) = (grid.width as u32, grid.height as u32);
        let factors = if self.options.overviews {
            overview_factors(grid.width, grid.height, self.options.overview_min_size)
        } else {
            Vec::new()
        };

        let mut buf = Cursor::new(Vec::new());
        {
            let mut encoder = TiffEncoder::new(&mut buf)
                .map_err(tiff_err)?
                .with_compression(self.options.compression.to_tiff());

            let mut image = encoder
                .new_image::<Gray32Float>(width, height)
                .map_err(tiff_err)?;
            write_geo_tags(image.encoder(), &grid.transform, grid.crs, &nodata_str)
                .map_err(tiff_err)?;
            image.write_data(&data).map_err(tiff_err)?;

            for factor in &factors {
                let (ow, oh, overview) = decimate(&data, grid.width, grid.height, *factor);
                let mut image = encoder
                    .new_image::<Gray32Float>(ow as u32, oh as u32)
                    .map_err(tiff_err)?;
                image
                    .encoder()
                    .write_tag(Tag::NewSubfileType, SUBFILE_REDUCED_IMAGE)
                    .map_err(tiff_err)?;
                image
                    .encoder()
                    .write_tag(Tag::Unknown(TAG_GDAL_NODATA), nodata_str.as_str())
                    .map_err(tiff_err)?;
                image.write_data(&overview).map_err(tiff_err)?;
            }
        }

        let bytes = buf.into_inner();
        debug!(
            width = grid.width,
            height = grid.height,
            overviews = factors.len(),
            size_bytes = bytes.len(),
            "Encoded GeoTIFF"
        );

        Ok(RasterArtifact {
            bytes: Bytes::from(bytes),
            format: OutputFormat::GeoTiff,
            width: grid.width,
            height: grid.height,
            transform: grid.transform,
            crs: grid.crs,
            nodata: Some(self.options.nodata_value),
        })
    }
}
