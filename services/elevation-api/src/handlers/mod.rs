//! HTTP request handlers for the elevation API.

pub mod elevation;
pub mod health;
