//! Integration tests: decode synthetic tiles, assemble and reproject.

use dem_common::tile::lonlat_to_mercator;
use dem_common::{
    CrsCode, EncodedTile, GeoExtent, ResamplingMethod, TileCoordinate, TileEncoding,
    TileSourceSpec,
};
use grid_processor::{assemble, decode_all, MosaicWindow, ReprojectTarget, Reprojector};
use test_utils::fixtures::{extents, sf_tiles, synthetic_tiles};
use test_utils::generators::synthetic_elevation;

const TILE_SIZE: u32 = 256;

fn sf_extent() -> GeoExtent {
    let (w, s, e, n) = extents::SAN_FRANCISCO;
    GeoExtent::normalize(w, s, e, n).unwrap()
}

fn encoded(coords: &[TileCoordinate]) -> Vec<(TileCoordinate, Option<EncodedTile>)> {
    synthetic_tiles(coords, TILE_SIZE)
        .into_iter()
        .map(|(c, bytes)| (c, Some(EncodedTile::new(c, bytes))))
        .collect()
}

// =============================================================================
// Decode + assemble
// =============================================================================

#[test]
fn test_sf_mosaic_matches_synthetic_surface() {
    let spec = TileSourceSpec::new(TileEncoding::Terrarium, TILE_SIZE);
    let grids = decode_all(&encoded(&sf_tiles()), &spec).unwrap();

    let window = MosaicWindow::for_extent(&sf_extent(), 10, TILE_SIZE);
    let mosaic = assemble(&grids, &window);

    assert_eq!(mosaic.crs, CrsCode::WebMercator);
    assert_eq!(mosaic.nodata_count(), 0);
    for (col, row) in [(0, 0), (113, 0), (114, 40), (window.width - 1, window.height - 1)] {
        let gx = (window.px_start + col as i64) as u64;
        let gy = (window.py_start + row as i64) as u64;
        assert_eq!(mosaic.get(col, row), Some(synthetic_elevation(gx, gy)));
    }

    let bounds = mosaic.bounds();
    let (west, south) = lonlat_to_mercator(-122.5, 37.7);
    let (east, north) = lonlat_to_mercator(-122.3, 37.9);
    assert!(bounds.min_x <= west && bounds.max_x >= east);
    assert!(bounds.min_y <= south && bounds.max_y >= north);
}

#[test]
fn test_missing_tile_leaves_nodata_quadrant() {
    let spec = TileSourceSpec::new(TileEncoding::Terrarium, TILE_SIZE);
    let mut tiles = encoded(&sf_tiles());
    // Drop the south-east tile
    tiles[3].1 = None;
    let grids = decode_all(&tiles, &spec).unwrap();

    let window = MosaicWindow::for_extent(&sf_extent(), 10, TILE_SIZE);
    let mosaic = assemble(&grids, &window);

    let split_col = (164 * TILE_SIZE as i64 - window.px_start) as usize;
    let split_row = (396 * TILE_SIZE as i64 - window.py_start) as usize;
    let expected = (window.width - split_col) * (window.height - split_row);
    assert_eq!(mosaic.nodata_count(), expected);
    assert!(mosaic.get(split_col, split_row).unwrap().is_nan());
    assert!(!mosaic.get(split_col - 1, split_row).unwrap().is_nan());
}

#[test]
fn test_assembly_dimensions_are_deterministic() {
    let extent = sf_extent();
    for zoom in [8u8, 10, 12] {
        let a = MosaicWindow::for_extent(&extent, zoom, TILE_SIZE);
        let b = MosaicWindow::for_extent(&extent, zoom, TILE_SIZE);
        assert_eq!(a, b);
    }
    let z10 = MosaicWindow::for_extent(&extent, 10, TILE_SIZE);
    let z11 = MosaicWindow::for_extent(&extent, 11, TILE_SIZE);
    assert!(z11.width >= 2 * z10.width - 2);
}

// =============================================================================
// Reprojection
// =============================================================================

#[test]
fn test_reproject_mosaic_to_geographic() {
    let spec = TileSourceSpec::new(TileEncoding::Terrarium, TILE_SIZE);
    let grids = decode_all(&encoded(&sf_tiles()), &spec).unwrap();
    let extent = sf_extent();
    let mosaic = assemble(&grids, &MosaicWindow::for_extent(&extent, 10, TILE_SIZE));
    let (w, h) = (mosaic.width, mosaic.height);

    let out = Reprojector::new(ResamplingMethod::Bilinear, 10_000_000)
        .reproject(mosaic, &ReprojectTarget::new(CrsCode::Wgs84, extent))
        .unwrap();

    assert_eq!(out.crs, CrsCode::Wgs84);
    assert_eq!((out.width, out.height), (w, h));
    assert_eq!(out.nodata_count(), 0);
    let bounds = out.bounds();
    assert!((bounds.min_x + 122.5).abs() < 1e-9);
    assert!((bounds.max_y - 37.9).abs() < 1e-9);
}

#[test]
fn test_reproject_to_utm_with_resolution() {
    let spec = TileSourceSpec::new(TileEncoding::Terrarium, TILE_SIZE);
    let grids = decode_all(&encoded(&sf_tiles()), &spec).unwrap();
    let extent = sf_extent();
    let mosaic = assemble(&grids, &MosaicWindow::for_extent(&extent, 10, TILE_SIZE));

    let target = ReprojectTarget::new(
        CrsCode::Utm {
            zone: 10,
            north: true,
        },
        extent,
    )
    .with_resolution(Some(200.0));
    let out = Reprojector::new(ResamplingMethod::Cubic, 10_000_000)
        .reproject(mosaic, &target)
        .unwrap();

    assert_eq!(out.transform.pixel_width, 200.0);
    // ~17.6 km x ~22.2 km
    assert!(out.width > 85 && out.width < 95, "width {}", out.width);
    assert!(out.height > 105 && out.height < 118, "height {}", out.height);
    let (lo, hi) = out.valid_range().unwrap();
    assert!(lo >= 0.0 && hi < 8192.0);
}
