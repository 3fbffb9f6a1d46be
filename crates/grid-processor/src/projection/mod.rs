//! Reprojection and resampling of elevation grids.

pub mod interpolation;
pub mod reproject;

pub use interpolation::{bilinear_interpolate, cubic_interpolate, nearest_interpolate};
pub use reproject::{ReprojectTarget, Reprojector};
