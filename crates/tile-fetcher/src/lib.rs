//! Elevation tile fetching.
//!
//! [`TileFetcher`] retrieves the encoded bytes for a set of tile coordinates
//! from a [`TileSource`], with bounded concurrency, exponential backoff on
//! transient failures and cooperative cancellation.

pub mod config;
pub mod error;
pub mod fetcher;
pub mod http;
pub mod memory;
pub mod source;

pub use config::{FetchConfig, TileSourceConfig};
pub use error::SourceError;
pub use fetcher::{FetchOutcome, FetchReport, TileFetcher};
pub use http::HttpTileSource;
pub use memory::{FailureMode, MemoryTileSource};
pub use source::TileSource;
