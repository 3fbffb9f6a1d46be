//! Reprojection of elevation grids between coordinate systems.
//!
//! The output grid is laid out over the target-CRS bounds of the request
//! extent. Each output pixel center is carried back into the source CRS and
//! sampled with the configured kernel.

use dem_common::tile::HALF_WORLD;
use dem_common::{
    BoundingBox, CrsCode, DemError, DemResult, ElevationGrid, GeoExtent, GeoTransform,
    ResamplingMethod,
};
use projection::Transformer;
use rayon::prelude::*;
use tracing::debug;

use super::{bilinear_interpolate, cubic_interpolate, nearest_interpolate};

/// Samples per extent edge when computing target bounds.
const EDGE_SAMPLES: usize = 21;

/// Where a grid should be reprojected to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReprojectTarget {
    pub crs: CrsCode,
    /// Requested extent in geographic degrees
    pub extent: GeoExtent,
    /// Output pixel size in target CRS units; `None` keeps the source
    /// pixel dimensions
    pub resolution: Option<f64>,
}

impl ReprojectTarget {
    pub fn new(crs: CrsCode, extent: GeoExtent) -> Self {
        Self {
            crs,
            extent,
            resolution: None,
        }
    }

    pub fn with_resolution(mut self, resolution: Option<f64>) -> Self {
        self.resolution = resolution;
        self
    }
}

/// Grid reprojector / resampler.
#[derive(Debug, Clone, Copy)]
pub struct Reprojector {
    method: ResamplingMethod,
    max_output_pixels: usize,
}

impl Reprojector {
    pub fn new(method: ResamplingMethod, max_output_pixels: usize) -> Self {
        Self {
            method,
            max_output_pixels,
        }
    }

    pub fn method(&self) -> ResamplingMethod {
        self.method
    }

    /// Reproject `grid` onto `target`.
    ///
    /// A grid already in the target CRS with no explicit resolution is
    /// returned unchanged.
    pub fn reproject(&self, grid: ElevationGrid, target: &ReprojectTarget) -> DemResult<ElevationGrid> {
        if grid.crs == target.crs && target.resolution.is_none() {
            return Ok(grid);
        }
        if grid.is_empty() {
            return Err(DemError::ReprojectionError(
                "cannot reproject an empty grid".to_string(),
            ));
        }

        let bounds = target_bounds(&target.extent, target.crs)?;

        let (width, height, pixel_width, pixel_height) = match target.resolution {
            Some(res) => {
                if !(res.is_finite() && res > 0.0) {
                    return Err(DemError::ReprojectionError(format!(
                        "invalid output resolution {}",
                        res
                    )));
                }
                let width = (bounds.width() / res).ceil().max(1.0);
                let height = (bounds.height() / res).ceil().max(1.0);
                if width * height > self.max_output_pixels as f64 {
                    return Err(too_large(width, height, self.max_output_pixels));
                }
                (width as usize, height as usize, res, res)
            }
            None => (
                grid.width,
                grid.height,
                bounds.width() / grid.width as f64,
                bounds.height() / grid.height as f64,
            ),
        };

        if width * height > self.max_output_pixels {
            return Err(too_large(width as f64, height as f64, self.max_output_pixels));
        }

        let transform = GeoTransform::new(bounds.min_x, bounds.max_y, pixel_width, pixel_height);
        let inverse = Transformer::new(target.crs, grid.crs);
        let period = wrap_period(grid.crs).map(|p| p / grid.transform.pixel_width);

        debug!(
            source_crs = %grid.crs,
            target_crs = %target.crs,
            width = width,
            height = height,
            method = self.method.as_str(),
            "Reprojecting grid"
        );

        let mut data = vec![f32::NAN; width * height];
        data.par_chunks_mut(width).enumerate().for_each(|(row, out)| {
            for (col, value) in out.iter_mut().enumerate() {
                let (x, y) = transform.pixel_center(col, row);
                let Some((sx, sy)) = inverse.try_transform(x, y) else {
                    continue;
                };
                let (px, py) = grid.transform.world_to_pixel(sx, sy);
                let px = wrap_column(px - 0.5, grid.width, period);
                *value = self.sample(&grid, px, py - 0.5);
            }
        });

        Ok(ElevationGrid::new(data, width, height, transform, target.crs))
    }

    fn sample(&self, grid: &ElevationGrid, x: f64, y: f64) -> f32 {
        match self.method {
            ResamplingMethod::Nearest => nearest_interpolate(&grid.data, grid.width, grid.height, x, y),
            ResamplingMethod::Bilinear => {
                bilinear_interpolate(&grid.data, grid.width, grid.height, x, y)
            }
            ResamplingMethod::Cubic => cubic_interpolate(&grid.data, grid.width, grid.height, x, y),
        }
    }
}

fn too_large(width: f64, height: f64, limit: usize) -> DemError {
    DemError::ReprojectionError(format!(
        "output of {}x{} pixels exceeds the limit of {} pixels",
        width, height, limit
    ))
}

/// Bounds of a geographic extent in `crs`, from densified edges.
fn target_bounds(extent: &GeoExtent, crs: CrsCode) -> DemResult<BoundingBox> {
    let forward = Transformer::new(CrsCode::Wgs84, crs);
    let mut bounds = BoundingBox::empty();

    let steps = (EDGE_SAMPLES - 1) as f64;
    for i in 0..EDGE_SAMPLES {
        let t = i as f64 / steps;
        let lon = extent.west + (extent.east - extent.west) * t;
        let lat = extent.south + (extent.north - extent.south) * t;
        for (x, y) in [
            (lon, extent.south),
            (lon, extent.north),
            (extent.west, lat),
            (extent.east, lat),
        ] {
            let (px, py) = forward.transform_point(x, y)?;
            bounds.include_point(px, py);
        }
    }

    if !bounds.is_finite() || bounds.width() <= 0.0 || bounds.height() <= 0.0 {
        return Err(DemError::ReprojectionError(format!(
            "extent has no area in {}",
            crs
        )));
    }
    Ok(bounds)
}

/// Horizontal period of a CRS in its own units, if it wraps.
fn wrap_period(crs: CrsCode) -> Option<f64> {
    match crs {
        CrsCode::WebMercator => Some(2.0 * HALF_WORLD),
        CrsCode::Wgs84 | CrsCode::Nad83 => Some(360.0),
        CrsCode::Utm { .. } => None,
    }
}

/// Shift a column by whole world widths so it lands inside the grid.
fn wrap_column(col: f64, width: usize, period: Option<f64>) -> f64 {
    let inside = |c: f64| c >= -0.5 && c <= width as f64 - 0.5;
    match period {
        Some(period) if !inside(col) => {
            let shifted = col - (col / period).floor() * period;
            [shifted, shifted - period, shifted + period]
                .into_iter()
                .find(|c| inside(*c))
                .unwrap_or(col)
        }
        _ => col,
    }
}
