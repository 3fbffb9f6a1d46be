//! Mosaic assembly of decoded tiles into one request-window grid.

use std::collections::HashMap;

use dem_common::tile::MAX_LATITUDE;
use dem_common::{CrsCode, ElevationGrid, GeoExtent, GeoTransform, TileCoordinate, TilePyramid};
use rayon::prelude::*;
use tracing::debug;

/// Pixel window of a request in global pyramid pixel space at one zoom.
///
/// `px_start` may be negative or run past the world width; columns wrap
/// modulo the pyramid width when tiles are looked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MosaicWindow {
    pub zoom: u8,
    pub tile_size: u32,
    pub px_start: i64,
    pub py_start: i64,
    pub width: usize,
    pub height: usize,
}

impl MosaicWindow {
    /// Window enclosing `extent`: `floor(px(west))..ceil(px(east))` and
    /// `floor(py(north))..ceil(py(south))`, at least one pixel each way.
    pub fn for_extent(extent: &GeoExtent, zoom: u8, tile_size: u32) -> Self {
        let pyramid = TilePyramid::new(tile_size, zoom);
        let world = pyramid.world_pixels(zoom) as i64;

        let px_start = pyramid.lon_to_pixel_x(extent.west, zoom).floor() as i64;
        let px_end = pyramid.lon_to_pixel_x(extent.east, zoom).ceil() as i64;
        let width = (px_end - px_start).clamp(1, world.max(1)) as usize;

        let north = extent.north.min(MAX_LATITUDE);
        let south = extent.south.max(-MAX_LATITUDE);
        let py_start = (pyramid.lat_to_pixel_y(north, zoom).floor() as i64).clamp(0, world - 1);
        let py_end = (pyramid.lat_to_pixel_y(south, zoom).ceil() as i64).clamp(0, world);
        let height = (py_end - py_start).max(1) as usize;

        Self {
            zoom,
            tile_size,
            px_start,
            py_start,
            width,
            height,
        }
    }

    fn pyramid(&self) -> TilePyramid {
        TilePyramid::new(self.tile_size, self.zoom)
    }

    /// Width of the world in pixels at the window's zoom.
    pub fn world_pixels(&self) -> i64 {
        self.pyramid().world_pixels(self.zoom) as i64
    }

    /// Native pixel size in meters.
    pub fn resolution(&self) -> f64 {
        self.pyramid().resolution(self.zoom)
    }

    /// Web Mercator georeferencing of the assembled grid.
    pub fn transform(&self) -> GeoTransform {
        let pyramid = self.pyramid();
        let res = pyramid.resolution(self.zoom);
        GeoTransform::new(
            pyramid.pixel_x_to_meters(self.px_start as f64, self.zoom),
            pyramid.pixel_y_to_meters(self.py_start as f64, self.zoom),
            res,
            res,
        )
    }
}

/// Copy decoded tiles into the window grid.
///
/// Every output pixel takes the value of the covering source tile pixel.
/// Pixels whose tile is absent, or whose tile grid has the wrong size, stay
/// no-data.
pub fn assemble(tiles: &[(TileCoordinate, ElevationGrid)], window: &MosaicWindow) -> ElevationGrid {
    let tile_size = window.tile_size as usize;
    let world = window.world_pixels();

    let lookup: HashMap<(u32, u32), &ElevationGrid> = tiles
        .iter()
        .filter(|(coord, grid)| {
            coord.z == window.zoom && grid.width == tile_size && grid.height == tile_size
        })
        .map(|(coord, grid)| ((coord.x, coord.y), grid))
        .collect();

    if lookup.len() != tiles.len() {
        debug!(
            supplied = tiles.len(),
            usable = lookup.len(),
            "Ignoring tiles that do not belong to the mosaic window"
        );
    }

    let mut data = vec![f32::NAN; window.width * window.height];

    data.par_chunks_mut(window.width)
        .enumerate()
        .for_each(|(row, out)| {
            let gy = window.py_start + row as i64;
            if gy < 0 || gy >= world {
                return;
            }
            let tile_y = (gy as usize / tile_size) as u32;
            let in_y = gy as usize % tile_size;

            let mut col = 0usize;
            while col < window.width {
                let gx = (window.px_start + col as i64).rem_euclid(world) as usize;
                let tile_x = (gx / tile_size) as u32;
                let in_x = gx % tile_size;
                let run = (tile_size - in_x).min(window.width - col);

                if let Some(grid) = lookup.get(&(tile_x, tile_y)) {
                    let start = in_y * tile_size + in_x;
                    out[col..col + run].copy_from_slice(&grid.data[start..start + run]);
                }
                col += run;
            }
        });

    ElevationGrid::new(
        data,
        window.width,
        window.height,
        window.transform(),
        CrsCode::WebMercator,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use dem_common::tile::HALF_WORLD;

    const TS: u32 = 4;

    /// Tile whose pixels hold their global pixel index `gx * 1000 + gy`.
    fn indexed_tile(coord: TileCoordinate) -> (TileCoordinate, ElevationGrid) {
        let ts = TS as usize;
        let mut data = Vec::with_capacity(ts * ts);
        for row in 0..ts {
            for col in 0..ts {
                let gx = coord.x as usize * ts + col;
                let gy = coord.y as usize * ts + row;
                data.push((gx * 1000 + gy) as f32);
            }
        }
        (
            coord,
            ElevationGrid::new(data, ts, ts, coord.geo_transform(TS), CrsCode::WebMercator),
        )
    }

    fn all_tiles(zoom: u8) -> Vec<(TileCoordinate, ElevationGrid)> {
        let n = 1u32 << zoom;
        (0..n)
            .flat_map(|y| (0..n).map(move |x| TileCoordinate::new(zoom, x, y)))
            .map(indexed_tile)
            .collect()
    }

    #[test]
    fn test_window_dimensions() {
        let extent = GeoExtent::normalize(-122.5, 37.7, -122.3, 37.9).unwrap();
        let window = MosaicWindow::for_extent(&extent, 10, 256);
        assert_eq!(window.px_start, 41870);
        assert_eq!(window.width, 146);
        assert!(window.height > 140 && window.height < 200);
        assert_eq!(window, MosaicWindow::for_extent(&extent, 10, 256));
    }

    #[test]
    fn test_window_transform_covers_extent() {
        let extent = GeoExtent::normalize(-122.5, 37.7, -122.3, 37.9).unwrap();
        let window = MosaicWindow::for_extent(&extent, 10, 256);
        let bounds = window.transform().bounds(window.width, window.height);
        let (west, south) = dem_common::tile::lonlat_to_mercator(extent.west, extent.south);
        let (east, north) = dem_common::tile::lonlat_to_mercator(extent.east, extent.north);
        assert!(bounds.min_x <= west && bounds.max_x >= east);
        assert!(bounds.min_y <= south && bounds.max_y >= north);
        assert!((window.resolution() - 152.874).abs() < 0.001);
    }

    #[test]
    fn test_assemble_across_seams() {
        let zoom = 2;
        let tiles = all_tiles(zoom);
        let window = MosaicWindow {
            zoom,
            tile_size: TS,
            px_start: 2,
            py_start: 3,
            width: 9,
            height: 6,
        };
        let grid = assemble(&tiles, &window);

        assert_eq!((grid.width, grid.height), (9, 6));
        for row in 0..6 {
            for col in 0..9 {
                let expected = ((2 + col) * 1000 + 3 + row) as f32;
                assert_eq!(grid.get(col, row), Some(expected), "pixel ({}, {})", col, row);
            }
        }
        assert_eq!(grid.nodata_count(), 0);
    }

    #[test]
    fn test_assemble_wraps_columns() {
        let zoom = 1;
        let tiles = all_tiles(zoom);
        // World is 8 px wide; start 2 px before the antimeridian.
        let window = MosaicWindow {
            zoom,
            tile_size: TS,
            px_start: 6,
            py_start: 0,
            width: 4,
            height: 1,
        };
        let grid = assemble(&tiles, &window);
        let row: Vec<f32> = grid.data.clone();
        assert_eq!(row, vec![6000.0, 7000.0, 0.0, 1000.0]);
        // Georeferencing keeps counting eastward.
        assert!(grid.bounds().max_x > HALF_WORLD);
    }

    #[test]
    fn test_missing_tile_is_nodata() {
        let zoom = 1;
        let tiles: Vec<_> = all_tiles(zoom)
            .into_iter()
            .filter(|(c, _)| !(c.x == 1 && c.y == 0))
            .collect();
        let window = MosaicWindow {
            zoom,
            tile_size: TS,
            px_start: 0,
            py_start: 0,
            width: 8,
            height: 8,
        };
        let grid = assemble(&tiles, &window);
        assert_eq!(grid.nodata_count(), 16);
        assert!(grid.get(5, 1).unwrap().is_nan());
        assert_eq!(grid.get(3, 1), Some(3001.0));
    }

    #[test]
    fn test_assemble_is_bit_identical() {
        let tiles = all_tiles(2);
        let extent = GeoExtent::normalize(-100.0, -30.0, 60.0, 40.0).unwrap();
        let window = MosaicWindow::for_extent(&extent, 2, TS);
        let a = assemble(&tiles, &window);
        let b = assemble(&tiles, &window);
        let bits = |g: &ElevationGrid| g.data.iter().map(|v| v.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&a), bits(&b));
        assert_eq!(a.transform, b.transform);
    }
}
