//! Interpolation kernels for grid resampling.
//!
//! Positions are fractional pixel indices where pixel `i` is centered on
//! `i`. A grid covers `[-0.5, width - 0.5]` on each axis; positions outside
//! that footprint sample as `NaN`, positions inside it but beyond the outer
//! pixel centers clamp to the edge.
//!
//! No-data never blends into valid values: a `NaN` tap that contributes to
//! the result makes the result `NaN`.

#[inline]
fn in_footprint(pos: f64, len: usize) -> bool {
    pos >= -0.5 && pos <= len as f64 - 0.5
}

#[inline]
fn tap(data: &[f32], width: usize, height: usize, col: i64, row: i64) -> f32 {
    let col = col.clamp(0, width as i64 - 1) as usize;
    let row = row.clamp(0, height as i64 - 1) as usize;
    data[row * width + col]
}

/// Nearest neighbor interpolation.
///
/// Returns the value of the nearest grid point.
pub fn nearest_interpolate(data: &[f32], width: usize, height: usize, x: f64, y: f64) -> f32 {
    if width == 0 || height == 0 || !in_footprint(x, width) || !in_footprint(y, height) {
        return f32::NAN;
    }
    tap(data, width, height, x.round() as i64, y.round() as i64)
}

/// Bilinear interpolation.
///
/// Blends the four surrounding grid points. Taps with zero weight are not
/// read, so sampling exactly on a valid pixel next to no-data stays valid.
pub fn bilinear_interpolate(data: &[f32], width: usize, height: usize, x: f64, y: f64) -> f32 {
    if width == 0 || height == 0 || !in_footprint(x, width) || !in_footprint(y, height) {
        return f32::NAN;
    }

    let x = x.clamp(0.0, (width - 1) as f64);
    let y = y.clamp(0.0, (height - 1) as f64);
    let x0 = x.floor() as i64;
    let y0 = y.floor() as i64;
    let xf = x - x0 as f64;
    let yf = y - y0 as f64;

    let mut acc = 0.0f64;
    for (dy, wy) in [(0, 1.0 - yf), (1, yf)] {
        for (dx, wx) in [(0, 1.0 - xf), (1, xf)] {
            let weight = wx * wy;
            if weight == 0.0 {
                continue;
            }
            let v = tap(data, width, height, x0 + dx, y0 + dy);
            if v.is_nan() {
                return f32::NAN;
            }
            acc += v as f64 * weight;
        }
    }
    acc as f32
}

/// Bicubic (Catmull-Rom) interpolation.
///
/// Uses the 16 surrounding points; returns `NaN` if any of them is no-data.
pub fn cubic_interpolate(data: &[f32], width: usize, height: usize, x: f64, y: f64) -> f32 {
    if width == 0 || height == 0 || !in_footprint(x, width) || !in_footprint(y, height) {
        return f32::NAN;
    }

    let x = x.clamp(0.0, (width - 1) as f64);
    let y = y.clamp(0.0, (height - 1) as f64);
    let xi = x.floor() as i64;
    let yi = y.floor() as i64;
    let xf = x - xi as f64;
    let yf = y - yi as f64;

    let mut rows = [0.0f64; 4];
    for (j, row_value) in rows.iter_mut().enumerate() {
        let mut p = [0.0f64; 4];
        for (i, value) in p.iter_mut().enumerate() {
            let v = tap(data, width, height, xi + i as i64 - 1, yi + j as i64 - 1);
            if v.is_nan() {
                return f32::NAN;
            }
            *value = v as f64;
        }
        *row_value = cubic_1d(p[0], p[1], p[2], p[3], xf);
    }

    cubic_1d(rows[0], rows[1], rows[2], rows[3], yf) as f32
}

/// 1D cubic interpolation using Catmull-Rom spline.
fn cubic_1d(p0: f64, p1: f64, p2: f64, p3: f64, t: f64) -> f64 {
    let t2 = t * t;
    let t3 = t2 * t;

    // Catmull-Rom coefficients
    let a = -0.5 * p0 + 1.5 * p1 - 1.5 * p2 + 0.5 * p3;
    let b = p0 - 2.5 * p1 + 2.0 * p2 - 0.5 * p3;
    let c = -0.5 * p0 + 0.5 * p2;
    let d = p1;

    a * t3 + b * t2 + c * t + d
}
