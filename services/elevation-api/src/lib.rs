//! Elevation API Service Library
//!
//! HTTP surface of the elevation mosaic pipeline: request intake, artifact
//! persistence, health and Prometheus metrics.

pub mod config;
pub mod error;
pub mod handlers;
pub mod router;
pub mod state;

pub use config::ServiceConfig;
pub use router::build_router;
pub use state::AppState;
