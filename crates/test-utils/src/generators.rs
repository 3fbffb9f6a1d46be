//! Test data generators for synthetic elevation data.
//!
//! These generators create predictable, verifiable elevation patterns and
//! encode them the way public tile pyramids do.

use std::io::Cursor;

use image::{ImageOutputFormat, Rgb, RgbImage, Rgba, RgbaImage};

/// Creates a test grid with predictable values.
///
/// Each cell value is calculated as: `col * 1000 + row`
///
/// This makes it easy to verify that data is being read/written correctly
/// by checking that grid[row][col] == col * 1000 + row.
///
/// # Example
///
/// ```
/// use test_utils::create_test_grid;
///
/// let grid = create_test_grid(10, 5);
/// assert_eq!(grid.len(), 50); // 10 * 5
/// assert_eq!(grid[0], 0.0);   // col=0, row=0 -> 0*1000 + 0
/// assert_eq!(grid[1], 1000.0); // col=1, row=0 -> 1*1000 + 0
/// assert_eq!(grid[10], 1.0);  // col=0, row=1 -> 0*1000 + 1
/// ```
pub fn create_test_grid(width: usize, height: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            data.push((col * 1000 + row) as f32);
        }
    }
    data
}

/// Creates a single-peak terrain grid.
///
/// Elevation falls off linearly from `peak` meters at the center to zero at
/// the corners, giving a cone with a known maximum.
pub fn create_cone_grid(width: usize, height: usize, peak: f32) -> Vec<f32> {
    let cx = (width as f32 - 1.0) / 2.0;
    let cy = (height as f32 - 1.0) / 2.0;
    let max_dist = (cx * cx + cy * cy).sqrt().max(1.0);

    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            let dx = col as f32 - cx;
            let dy = row as f32 - cy;
            let dist = (dx * dx + dy * dy).sqrt();
            data.push(peak * (1.0 - dist / max_dist));
        }
    }
    data
}

/// Synthetic elevation at a global pyramid pixel.
///
/// Values are multiples of 0.25 m so they survive Terrarium packing
/// unchanged, and vary smoothly within a tile.
pub fn synthetic_elevation(global_x: u64, global_y: u64) -> f32 {
    ((global_x * 2 + global_y) % 32_768) as f32 * 0.25
}

/// Terrarium RGB triplet for an elevation; `NaN` encodes as (0, 0, 0).
pub fn terrarium_rgb(height: f32) -> [u8; 3] {
    if height.is_nan() {
        return [0, 0, 0];
    }
    let v = (height as f64 + 32_768.0).clamp(0.0, 65_535.0 + 255.0 / 256.0);
    let whole = v.floor();
    let r = (whole / 256.0).floor() as u8;
    let g = (whole as u32 % 256) as u8;
    let b = ((v - whole) * 256.0).floor() as u8;
    [r, g, b]
}

/// Terrain-RGB (Mapbox) triplet for an elevation; `NaN` encodes as the
/// -10000 m sentinel.
pub fn terrain_rgb(height: f32) -> [u8; 3] {
    let height = if height.is_nan() { -10_000.0 } else { height as f64 };
    let code = ((height + 10_000.0) * 10.0).round().clamp(0.0, 16_777_215.0) as u32;
    [(code >> 16) as u8, (code >> 8) as u8, code as u8]
}

fn encode_png_rgb(size: u32, pixel: impl Fn(u32, u32) -> [u8; 3]) -> Vec<u8> {
    let img = RgbImage::from_fn(size, size, |col, row| Rgb(pixel(col, row)));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageOutputFormat::Png)
        .expect("in-memory PNG encoding");
    buf.into_inner()
}

/// Terrarium PNG of a `size` x `size` tile from row-major values.
///
/// # Panics
///
/// Panics if `values.len() != size * size`.
pub fn terrarium_png(values: &[f32], size: u32) -> Vec<u8> {
    assert_eq!(values.len(), (size * size) as usize, "values do not fill the tile");
    encode_png_rgb(size, |col, row| {
        terrarium_rgb(values[(row * size + col) as usize])
    })
}

/// Terrarium PNG whose pixels are produced by `f(col, row)`.
pub fn terrarium_png_with(size: u32, f: impl Fn(u32, u32) -> f32) -> Vec<u8> {
    encode_png_rgb(size, |col, row| terrarium_rgb(f(col, row)))
}

/// Terrain-RGB PNG whose pixels are produced by `f(col, row)`.
pub fn terrain_rgb_png_with(size: u32, f: impl Fn(u32, u32) -> f32) -> Vec<u8> {
    encode_png_rgb(size, |col, row| terrain_rgb(f(col, row)))
}

/// Terrarium RGBA PNG where `transparent(col, row)` pixels get alpha 0.
pub fn terrarium_rgba_png_with(
    size: u32,
    f: impl Fn(u32, u32) -> f32,
    transparent: impl Fn(u32, u32) -> bool,
) -> Vec<u8> {
    let img = RgbaImage::from_fn(size, size, |col, row| {
        let [r, g, b] = terrarium_rgb(f(col, row));
        let a = if transparent(col, row) { 0 } else { 255 };
        Rgba([r, g, b, a])
    });
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageOutputFormat::Png)
        .expect("in-memory PNG encoding");
    buf.into_inner()
}
