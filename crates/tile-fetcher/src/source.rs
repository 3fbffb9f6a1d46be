//! Tile source abstraction.

use async_trait::async_trait;
use bytes::Bytes;
use dem_common::TileCoordinate;

use crate::SourceError;

/// A read-only provider of encoded tiles.
///
/// `Ok(None)` means the source has no tile at that coordinate, which is a
/// valid answer outside data coverage and not an error.
#[async_trait]
pub trait TileSource: Send + Sync {
    async fn fetch(&self, coord: TileCoordinate) -> Result<Option<Bytes>, SourceError>;

    /// Short human readable description for logs.
    fn describe(&self) -> String;
}
