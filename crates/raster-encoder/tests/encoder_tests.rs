//! Round-trip tests for every output format.

use std::io::Cursor;

use dem_common::{
    CrsCode, ElevationGrid, EncodedTile, GeoTransform, OutputFormat, TileCoordinate,
    TileEncoding, TileSourceSpec,
};
use grid_processor::decode::geotiff::decode_geotiff;
use grid_processor::decode_tile;
use raster_encoder::{encoder_for, EncoderOptions, RasterEncoder, TerrariumPngEncoder, TiffCompression};
use test_utils::generators::{create_cone_grid, create_test_grid};
use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;

fn sample_grid(width: usize, height: usize) -> ElevationGrid {
    let mut data: Vec<f32> = create_cone_grid(width, height, 4321.5);
    data[width + 1] = f32::NAN;
    ElevationGrid::new(
        data,
        width,
        height,
        GeoTransform::new(-13_637_000.0, 4_566_000.0, 152.5, 152.5),
        CrsCode::WebMercator,
    )
}

// =============================================================================
// Float32 GeoTIFF
// =============================================================================

#[test]
fn test_geotiff_roundtrip_is_lossless() {
    let grid = sample_grid(32, 20);
    let artifact = encoder_for(OutputFormat::GeoTiff, &EncoderOptions::default())
        .encode(&grid)
        .unwrap();

    assert_eq!(artifact.format, OutputFormat::GeoTiff);
    assert_eq!(artifact.content_type(), "image/tiff");
    assert_eq!((artifact.width, artifact.height), (32, 20));
    assert_eq!(artifact.nodata, Some(-9999.0));

    let (w, h, data) = decode_geotiff(&artifact.bytes).unwrap();
    assert_eq!((w, h), (32, 20));
    for (decoded, original) in data.iter().zip(&grid.data) {
        if original.is_nan() {
            assert!(decoded.is_nan());
        } else {
            assert_eq!(decoded.to_bits(), original.to_bits());
        }
    }
}

#[test]
fn test_geotiff_tags() {
    let grid = sample_grid(16, 16);
    let artifact = encoder_for(OutputFormat::GeoTiff, &EncoderOptions::default())
        .encode(&grid)
        .unwrap();

    let mut decoder = Decoder::new(Cursor::new(artifact.bytes.to_vec())).unwrap();
    let scale = decoder.get_tag_f64_vec(Tag::Unknown(33550)).unwrap();
    assert_eq!(scale, vec![152.5, 152.5, 0.0]);

    let tiepoint = decoder.get_tag_f64_vec(Tag::Unknown(33922)).unwrap();
    assert_eq!(tiepoint[3], -13_637_000.0);
    assert_eq!(tiepoint[4], 4_566_000.0);

    let geokeys = decoder.get_tag_u16_vec(Tag::Unknown(34735)).unwrap();
    assert_eq!(geokeys[3], 3);
    assert_eq!(*geokeys.last().unwrap(), 3857);

    let nodata = decoder.get_tag_ascii_string(Tag::Unknown(42113)).unwrap();
    assert_eq!(nodata.trim_end_matches('\0'), "-9999");

    match decoder.read_image().unwrap() {
        DecodingResult::F32(data) => assert_eq!(data[17], -9999.0),
        _ => panic!("expected Float32 samples"),
    }
}

#[test]
fn test_geotiff_overviews() {
    let data = create_test_grid(64, 40);
    let grid = ElevationGrid::new(
        data,
        64,
        40,
        GeoTransform::new(0.0, 0.0, 1.0, 1.0),
        CrsCode::Wgs84,
    );
    let options = EncoderOptions {
        overview_min_size: 8,
        ..Default::default()
    };
    let artifact = encoder_for(OutputFormat::GeoTiff, &options)
        .encode(&grid)
        .unwrap();

    let mut decoder = Decoder::new(Cursor::new(artifact.bytes.to_vec())).unwrap();
    let mut sizes = vec![decoder.dimensions().unwrap()];
    while decoder.more_images() {
        decoder.next_image().unwrap();
        sizes.push(decoder.dimensions().unwrap());
    }
    assert_eq!(sizes, vec![(64, 40), (32, 20), (16, 10), (8, 5)]);

    let without = EncoderOptions {
        overviews: false,
        ..Default::default()
    };
    let artifact = encoder_for(OutputFormat::GeoTiff, &without)
        .encode(&grid)
        .unwrap();
    let decoder = Decoder::new(Cursor::new(artifact.bytes.to_vec())).unwrap();
    assert!(!decoder.more_images());
}

#[test]
fn test_geotiff_compression_variants() {
    let grid = sample_grid(24, 24);
    for compression in [TiffCompression::None, TiffCompression::Lzw, TiffCompression::Deflate] {
        let options = EncoderOptions {
            compression,
            ..Default::default()
        };
        let artifact = encoder_for(OutputFormat::GeoTiff, &options)
            .encode(&grid)
            .unwrap();
        let (_, _, data) = decode_geotiff(&artifact.bytes).unwrap();
        assert_eq!(data[0].to_bits(), grid.data[0].to_bits(), "{:?}", compression);
    }
}

// =============================================================================
// Display GeoTIFF
// =============================================================================

#[test]
fn test_display_geotiff() {
    let grid = sample_grid(16, 16);
    let artifact = encoder_for(OutputFormat::GeoTiffDisplay, &EncoderOptions::default())
        .encode(&grid)
        .unwrap();
    assert_eq!(artifact.nodata, Some(0.0));

    let mut decoder = Decoder::new(Cursor::new(artifact.bytes.to_vec())).unwrap();
    match decoder.read_image().unwrap() {
        DecodingResult::U8(pixels) => {
            assert_eq!(pixels[17], 0);
            assert_eq!(pixels.iter().copied().max(), Some(255));
            assert_eq!(pixels.iter().filter(|p| **p != 0).min(), Some(&1));
        }
        _ => panic!("expected 8-bit samples"),
    }
}

// =============================================================================
// Terrarium PNG
// =============================================================================

#[test]
fn test_terrarium_roundtrip_is_lossless() {
    let size = 8;
    let mut data: Vec<f32> = (0..size * size).map(|i| i as f32 * 37.25 - 120.5).collect();
    data[5] = f32::NAN;
    let coord = TileCoordinate::new(3, 2, 1);
    let grid = ElevationGrid::new(data.clone(), size, size, coord.geo_transform(8), CrsCode::WebMercator);

    let artifact = TerrariumPngEncoder::new().encode(&grid).unwrap();
    assert_eq!(artifact.content_type(), "image/png");
    assert_eq!(artifact.nodata, Some(-32768.0));

    let decoded = decode_tile(
        &EncodedTile::new(coord, artifact.bytes.clone()),
        &TileSourceSpec::new(TileEncoding::Terrarium, 8),
    )
    .unwrap();
    assert!(decoded.data[5].is_nan());
    for (i, (a, b)) in decoded.data.iter().zip(&data).enumerate() {
        if i != 5 {
            assert_eq!(a, b, "pixel {}", i);
        }
    }
}

#[test]
fn test_terrarium_png_carries_georeferencing() {
    let grid = sample_grid(4, 3);
    let artifact = TerrariumPngEncoder::new().encode(&grid).unwrap();

    let img = image::load_from_memory(&artifact.bytes).unwrap();
    assert_eq!((img.width(), img.height()), (4, 3));

    let text = String::from_utf8_lossy(&artifact.bytes);
    assert!(text.contains("crs\0EPSG:3857"));
    assert!(text.contains("geotransform\0-13637000,152.5,0,4566000,0,-152.5"));
    assert!(text.contains("nodata\0-32768"));
}
