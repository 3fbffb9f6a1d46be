//! Elevation grids and their affine georeferencing.

use crate::{BoundingBox, CrsCode, TileCoordinate};
use serde::{Deserialize, Serialize};

/// North-up affine transform from pixel (col, row) to CRS coordinates.
///
/// `(origin_x, origin_y)` is the outer corner of the top-left pixel. Rows grow
/// southward, so y decreases by `pixel_height` per row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub origin_y: f64,
    pub pixel_width: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
        }
    }

    /// Coordinates of a pixel corner (fractional indices allowed).
    pub fn pixel_to_world(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.origin_x + col * self.pixel_width,
            self.origin_y - row * self.pixel_height,
        )
    }

    /// Coordinates of the center of pixel (col, row).
    pub fn pixel_center(&self, col: usize, row: usize) -> (f64, f64) {
        self.pixel_to_world(col as f64 + 0.5, row as f64 + 0.5)
    }

    /// Fractional pixel position of a world coordinate (corner convention).
    pub fn world_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        (
            (x - self.origin_x) / self.pixel_width,
            (self.origin_y - y) / self.pixel_height,
        )
    }

    /// GDAL-ordered six coefficients.
    pub fn to_gdal(&self) -> [f64; 6] {
        [
            self.origin_x,
            self.pixel_width,
            0.0,
            self.origin_y,
            0.0,
            -self.pixel_height,
        ]
    }

    /// Extent covered by a `width` x `height` raster using this transform.
    pub fn bounds(&self, width: usize, height: usize) -> BoundingBox {
        let (max_x, min_y) = self.pixel_to_world(width as f64, height as f64);
        BoundingBox::new(self.origin_x, min_y, max_x, self.origin_y)
    }
}

/// A 2D grid of elevations in meters.
///
/// Values are stored row-major, top row first. `NaN` marks no-data; encoders
/// translate it to the output format's own sentinel.
#[derive(Debug, Clone, PartialEq)]
pub struct ElevationGrid {
    pub data: Vec<f32>,
    pub width: usize,
    pub height: usize,
    pub transform: GeoTransform,
    pub crs: CrsCode,
}

impl ElevationGrid {
    /// Create a grid from existing data.
    ///
    /// # Panics
    /// Panics if `data.len() != width * height`.
    pub fn new(
        data: Vec<f32>,
        width: usize,
        height: usize,
        transform: GeoTransform,
        crs: CrsCode,
    ) -> Self {
        assert_eq!(data.len(), width * height, "grid data does not match dimensions");
        Self {
            data,
            width,
            height,
            transform,
            crs,
        }
    }

    /// A grid where every cell is no-data.
    pub fn filled_nodata(width: usize, height: usize, transform: GeoTransform, crs: CrsCode) -> Self {
        Self {
            data: vec![f32::NAN; width * height],
            width,
            height,
            transform,
            crs,
        }
    }

    /// All no-data grid standing in for a tile the source does not have.
    pub fn nodata_tile(coord: &TileCoordinate, tile_size: u32) -> Self {
        Self::filled_nodata(
            tile_size as usize,
            tile_size as usize,
            coord.geo_transform(tile_size),
            CrsCode::WebMercator,
        )
    }

    /// Get the value at a grid cell, `None` outside the grid.
    pub fn get(&self, col: usize, row: usize) -> Option<f32> {
        if col >= self.width || row >= self.height {
            return None;
        }
        self.data.get(row * self.width + col).copied()
    }

    /// Set the value at a grid cell. Out-of-range writes are ignored.
    pub fn set(&mut self, col: usize, row: usize, value: f32) {
        if col < self.width && row < self.height {
            self.data[row * self.width + col] = value;
        }
    }

    /// Get the value at a CRS coordinate using the covering cell.
    pub fn sample_nearest(&self, x: f64, y: f64) -> Option<f32> {
        let (col, row) = self.transform.world_to_pixel(x, y);
        if col < 0.0 || row < 0.0 {
            return None;
        }
        self.get(col.floor() as usize, row.floor() as usize)
    }

    /// Number of no-data cells.
    pub fn nodata_count(&self) -> usize {
        self.data.iter().filter(|v| v.is_nan()).count()
    }

    /// Minimum and maximum of the valid cells, `None` if every cell is no-data.
    pub fn valid_range(&self) -> Option<(f32, f32)> {
        self.data
            .iter()
            .filter(|v| !v.is_nan())
            .fold(None, |acc, &v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }

    /// Extent covered by the grid in its CRS.
    pub fn bounds(&self) -> BoundingBox {
        self.transform.bounds(self.width, self.height)
    }

    /// Total number of cells.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if grid is empty.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transform() -> GeoTransform {
        GeoTransform::new(100.0, 200.0, 10.0, 10.0)
    }

    #[test]
    fn test_pixel_world_roundtrip() {
        let t = transform();
        let (x, y) = t.pixel_to_world(3.0, 2.0);
        assert_eq!((x, y), (130.0, 180.0));
        assert_eq!(t.world_to_pixel(x, y), (3.0, 2.0));
        assert_eq!(t.pixel_center(0, 0), (105.0, 195.0));
    }

    #[test]
    fn test_bounds() {
        let t = transform();
        assert_eq!(t.bounds(4, 2), BoundingBox::new(100.0, 180.0, 140.0, 200.0));
        assert_eq!(t.to_gdal(), [100.0, 10.0, 0.0, 200.0, 0.0, -10.0]);
    }

    #[test]
    fn test_valid_range_skips_nodata() {
        let grid = ElevationGrid::new(
            vec![5.0, f32::NAN, -3.0, 12.5],
            2,
            2,
            transform(),
            CrsCode::WebMercator,
        );
        assert_eq!(grid.valid_range(), Some((-3.0, 12.5)));
        assert_eq!(grid.nodata_count(), 1);
        assert_eq!(grid.sample_nearest(115.0, 195.0).map(|v| v.is_nan()), Some(true));
        assert_eq!(grid.sample_nearest(101.0, 181.0), Some(-3.0));
    }

    #[test]
    fn test_filled_nodata() {
        let grid = ElevationGrid::filled_nodata(3, 3, transform(), CrsCode::Wgs84);
        assert_eq!(grid.nodata_count(), 9);
        assert!(grid.valid_range().is_none());
    }

    #[test]
    fn test_nodata_tile_georeferenced() {
        let coord = TileCoordinate::new(1, 1, 0);
        let grid = ElevationGrid::nodata_tile(&coord, 4);
        assert_eq!((grid.width, grid.height), (4, 4));
        assert_eq!(grid.nodata_count(), 16);
        assert_eq!(grid.crs, CrsCode::WebMercator);
        assert_eq!(grid.bounds(), coord.mercator_bounds());
    }
}
