//! Coverage tests for tile resolution.

use dem_common::tile::{latlon_to_tile, tile_to_latlon_bounds, MAX_LATITUDE};
use dem_common::{resolve_tiles, DemError, GeoExtent, TileCoordinate, TilePyramid};

/// Sample a regular lattice of points inside the extent, including the edges.
fn sample_points(extent: &GeoExtent, steps: usize) -> Vec<(f64, f64)> {
    let mut points = Vec::new();
    for i in 0..=steps {
        for j in 0..=steps {
            let lon = extent.west + (extent.east - extent.west) * i as f64 / steps as f64;
            let lat = extent.south + (extent.north - extent.south) * j as f64 / steps as f64;
            points.push((lon, lat));
        }
    }
    points
}

fn wrap(lon: f64) -> f64 {
    (lon + 180.0).rem_euclid(360.0) - 180.0
}

// ============================================================================
// Coverage
// ============================================================================

#[test]
fn test_tile_set_covers_extent() {
    let pyramid = TilePyramid::default();
    let extents = [
        (-122.5, 37.7, -122.3, 37.9),
        (2.2, 48.8, 2.5, 48.95),
        (-0.5, -0.5, 0.5, 0.5),
        (138.5, 35.0, 140.0, 36.2),
        (-70.0, -55.0, -66.0, -52.0),
    ];

    for (w, s, e, n) in extents {
        let extent = GeoExtent::normalize(w, s, e, n).unwrap();
        for zoom in [3u32, 7, 10] {
            let tiles = resolve_tiles(&pyramid, &extent, zoom).unwrap();
            for (lon, lat) in sample_points(&extent, 8) {
                // Points on the far edge belong to the tile to their west/north.
                let lon = lon.min(extent.east - 1e-9);
                let lat = lat.max(extent.south + 1e-9);
                let coord = latlon_to_tile(lat, wrap(lon), zoom as u8);
                assert!(
                    tiles.contains(&coord),
                    "{:?} at zoom {} misses {} for ({}, {})",
                    (w, s, e, n),
                    zoom,
                    coord,
                    lon,
                    lat
                );
            }
        }
    }
}

#[test]
fn test_tile_set_is_minimal() {
    let pyramid = TilePyramid::default();
    let extent = GeoExtent::normalize(-122.5, 37.7, -122.3, 37.9).unwrap();
    let tiles = resolve_tiles(&pyramid, &extent, 12).unwrap();

    for coord in tiles.coordinates() {
        let bounds = tile_to_latlon_bounds(&coord);
        let overlaps = bounds.min_x < extent.east
            && bounds.max_x > extent.west
            && bounds.min_y < extent.north
            && bounds.max_y > extent.south;
        assert!(
            overlaps,
            "tile {} does not touch the extent",
            coord
        );
    }
}

#[test]
fn test_extent_inside_one_tile_resolves_single_tile() {
    let pyramid = TilePyramid::default();
    let coord = TileCoordinate::new(6, 20, 25);
    let bounds = tile_to_latlon_bounds(&coord);
    let eps = 1e-7;
    let extent = GeoExtent::normalize(
        bounds.min_x + eps,
        bounds.min_y + eps,
        bounds.max_x - eps,
        bounds.max_y - eps,
    )
    .unwrap();

    let tiles = resolve_tiles(&pyramid, &extent, 6).unwrap();
    assert_eq!(tiles.coordinates(), vec![coord]);
}

#[test]
fn test_coordinates_within_matrix() {
    let pyramid = TilePyramid::default();
    let extent = GeoExtent::normalize(-180.0, -MAX_LATITUDE, 180.0, MAX_LATITUDE).unwrap();
    let tiles = resolve_tiles(&pyramid, &extent, 3).unwrap();

    assert_eq!(tiles.len(), 64);
    assert!(tiles.coordinates().iter().all(|c| c.is_valid()));
}

// ============================================================================
// Antimeridian
// ============================================================================

#[test]
fn test_wraparound_returns_both_sides() {
    let pyramid = TilePyramid::default();
    let extent = GeoExtent::normalize(178.5, 50.0, -178.0, 52.0).unwrap();
    let tiles = resolve_tiles(&pyramid, &extent, 8).unwrap();
    let coords = tiles.coordinates();
    let n = 1u32 << 8;

    assert!(tiles.is_split());
    assert!(coords.iter().any(|c| c.x == n - 1));
    assert!(coords.iter().any(|c| c.x == 0));
    assert!(coords.iter().all(|c| c.x >= n - 2 || c.x <= 2));

    for (lon, lat) in sample_points(&extent, 6) {
        let lon = lon.min(extent.east - 1e-9);
        let lat = lat.max(extent.south + 1e-9);
        assert!(tiles.contains(&latlon_to_tile(lat, wrap(lon), 8)));
    }
}

#[test]
fn test_wraparound_row_major_order() {
    let pyramid = TilePyramid::default();
    let extent = GeoExtent::normalize(179.0, -1.0, -179.0, 1.0).unwrap();
    let coords = resolve_tiles(&pyramid, &extent, 4).unwrap().coordinates();

    assert_eq!(
        coords,
        vec![
            TileCoordinate::new(4, 15, 7),
            TileCoordinate::new(4, 0, 7),
            TileCoordinate::new(4, 15, 8),
            TileCoordinate::new(4, 0, 8),
        ]
    );
}

// ============================================================================
// Validation
// ============================================================================

#[test]
fn test_polar_extent_rejected() {
    let pyramid = TilePyramid::default();

    let above = GeoExtent::normalize(0.0, 86.0, 10.0, 89.0).unwrap();
    let err = resolve_tiles(&pyramid, &above, 5).unwrap_err();
    assert!(matches!(err, DemError::InvalidExtent(_)));

    let straddling = GeoExtent::normalize(0.0, -89.0, 10.0, -80.0).unwrap();
    let err = resolve_tiles(&pyramid, &straddling, 5).unwrap_err();
    assert!(matches!(err, DemError::InvalidExtent(_)));
}

#[test]
fn test_extent_at_pyramid_edge_resolves() {
    let pyramid = TilePyramid::default();
    let extent = GeoExtent::normalize(0.0, 80.0, 10.0, MAX_LATITUDE).unwrap();
    let tiles = resolve_tiles(&pyramid, &extent, 5).unwrap();
    assert_eq!(tiles.row_start, 0);
}

#[test]
fn test_invalid_extent_rejected_before_resolution() {
    let err = GeoExtent::normalize(-122.4, 37.7, -122.4, 37.9).unwrap_err();
    assert_eq!(err.kind(), "InvalidExtent");
}

#[test]
fn test_zoom_beyond_pyramid() {
    let pyramid = TilePyramid::new(512, 14);
    let extent = GeoExtent::normalize(-122.5, 37.7, -122.3, 37.9).unwrap();
    let err = resolve_tiles(&pyramid, &extent, 15).unwrap_err();
    assert!(matches!(err, DemError::ZoomOutOfRange { zoom: 15, max_zoom: 14 }));
}
