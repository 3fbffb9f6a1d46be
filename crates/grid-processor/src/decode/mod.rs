//! Tile decoding.
//!
//! Turns encoded tile bytes into per-tile elevation grids georeferenced to
//! the tile's Web Mercator footprint.

pub mod geotiff;
pub mod rgb;

use dem_common::{
    DemError, DemResult, ElevationGrid, EncodedTile, TileCoordinate, TileEncoding, TileSourceSpec,
};
use rayon::prelude::*;
use tracing::debug;

/// Decode one tile according to the source's encoding.
pub fn decode_tile(tile: &EncodedTile, spec: &TileSourceSpec) -> DemResult<ElevationGrid> {
    let (width, height, mut data) = match spec.encoding {
        TileEncoding::Terrarium | TileEncoding::TerrainRgb => {
            rgb::decode_rgb(&tile.bytes, spec.encoding)?
        }
        TileEncoding::GeoTiff => geotiff::decode_geotiff(&tile.bytes)?,
    };

    if width != spec.tile_size || height != spec.tile_size {
        return Err(DemError::DecodeError(format!(
            "tile {} is {}x{}, expected {}x{}",
            tile.coord, width, height, spec.tile_size, spec.tile_size
        )));
    }

    if let Some(sentinel) = spec.nodata_sentinel() {
        for v in data.iter_mut() {
            if *v == sentinel {
                *v = f32::NAN;
            }
        }
    }
    for v in data.iter_mut() {
        if !v.is_finite() {
            *v = f32::NAN;
        }
    }

    Ok(ElevationGrid::new(
        data,
        width as usize,
        height as usize,
        tile.coord.geo_transform(spec.tile_size),
        dem_common::CrsCode::WebMercator,
    ))
}

/// Decode a set of tiles in parallel.
///
/// `None` entries are tiles the source did not provide; they become
/// all-no-data grids. Output order matches input order.
pub fn decode_all(
    tiles: &[(TileCoordinate, Option<EncodedTile>)],
    spec: &TileSourceSpec,
) -> DemResult<Vec<(TileCoordinate, ElevationGrid)>> {
    let grids = tiles
        .par_iter()
        .map(|(coord, tile)| {
            let grid = match tile {
                Some(tile) => decode_tile(tile, spec)?,
                None => ElevationGrid::nodata_tile(coord, spec.tile_size),
            };
            Ok((*coord, grid))
        })
        .collect::<DemResult<Vec<_>>>()?;

    debug!(tiles = grids.len(), "Decoded tiles");
    Ok(grids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::assert_approx_eq;
    use test_utils::generators::{
        terrain_rgb_png_with, terrarium_png, terrarium_png_with, terrarium_rgba_png_with,
    };

    fn spec(tile_size: u32) -> TileSourceSpec {
        TileSourceSpec::new(TileEncoding::Terrarium, tile_size)
    }

    #[test]
    fn test_decode_terrarium_tile() {
        let coord = TileCoordinate::new(10, 163, 395);
        let values: Vec<f32> = (0..16).map(|i| i as f32 * 10.5 - 20.0).collect();
        let tile = EncodedTile::new(coord, terrarium_png(&values, 4));

        let grid = decode_tile(&tile, &spec(4)).unwrap();
        assert_eq!(grid.data, values);
        assert_eq!(grid.bounds(), coord.mercator_bounds());
    }

    #[test]
    fn test_decode_terrain_rgb_tile() {
        let coord = TileCoordinate::new(12, 655, 1582);
        let heights = [0.0f32, 12.3, 1523.7, -45.6, 8848.8, f32::NAN];
        let value_at = |col: u32, row: u32| heights[((row * 4 + col) % 6) as usize];
        let tile = EncodedTile::new(coord, terrain_rgb_png_with(4, value_at));
        let spec = TileSourceSpec::new(TileEncoding::TerrainRgb, 4);

        let grid = decode_tile(&tile, &spec).unwrap();
        assert_eq!(grid.bounds(), coord.mercator_bounds());
        for row in 0..4u32 {
            for col in 0..4u32 {
                let expected = value_at(col, row);
                let actual = grid.data[(row * 4 + col) as usize];
                if expected.is_nan() {
                    assert!(actual.is_nan(), "({}, {})", col, row);
                } else {
                    assert_approx_eq!(actual, expected, 0.01);
                }
            }
        }
        assert_eq!(grid.nodata_count(), 2);
    }

    #[test]
    fn test_transparent_pixels_become_nodata() {
        let tile = EncodedTile::new(
            TileCoordinate::new(2, 1, 1),
            terrarium_rgba_png_with(4, |col, _| col as f32 * 100.0, |col, row| col == row),
        );

        let grid = decode_tile(&tile, &spec(4)).unwrap();
        assert_eq!(grid.nodata_count(), 4);
        assert!(grid.data[5].is_nan());
        assert_eq!(grid.data[1], 100.0);
    }

    #[test]
    fn test_wrong_dimensions_rejected() {
        let tile = EncodedTile::new(
            TileCoordinate::new(3, 0, 0),
            terrarium_png(&[1.0; 16], 4),
        );
        let err = decode_tile(&tile, &spec(256)).unwrap_err();
        assert!(matches!(err, DemError::DecodeError(_)));
    }

    #[test]
    fn test_malformed_bytes_rejected() {
        let tile = EncodedTile::new(TileCoordinate::new(3, 0, 0), b"not a png".to_vec());
        assert!(matches!(
            decode_tile(&tile, &spec(256)),
            Err(DemError::DecodeError(_))
        ));
    }

    #[test]
    fn test_sentinel_becomes_nodata() {
        let mut values = vec![100.0f32; 4];
        values[2] = f32::NAN;
        let tile = EncodedTile::new(TileCoordinate::new(1, 0, 0), terrarium_png(&values, 2));

        let grid = decode_tile(&tile, &spec(2)).unwrap();
        assert!(grid.data[2].is_nan());
        assert_eq!(grid.nodata_count(), 1);

        let custom = TileSourceSpec {
            nodata: Some(100.0),
            ..spec(2)
        };
        assert_eq!(decode_tile(&tile, &custom).unwrap().nodata_count(), 4);
    }

    #[test]
    fn test_decode_all_fills_missing() {
        let present = TileCoordinate::new(1, 0, 0);
        let missing = TileCoordinate::new(1, 1, 0);
        let tiles = vec![
            (present, Some(EncodedTile::new(present, terrarium_png_with(2, |_, _| 5.0)))),
            (missing, None),
        ];

        let grids = decode_all(&tiles, &spec(2)).unwrap();
        assert_eq!(grids[0].0, present);
        assert_eq!(grids[0].1.nodata_count(), 0);
        assert_eq!(grids[1].0, missing);
        assert_eq!(grids[1].1.nodata_count(), 4);
        assert_eq!(grids[1].1.bounds(), missing.mercator_bounds());
    }

    #[test]
    fn test_decode_all_propagates_errors() {
        let coord = TileCoordinate::new(1, 0, 0);
        let tiles = vec![(coord, Some(EncodedTile::new(coord, vec![0u8; 8])))];
        assert!(decode_all(&tiles, &spec(2)).is_err());
    }
}
