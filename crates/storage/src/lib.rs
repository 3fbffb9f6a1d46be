//! Storage abstractions for elevation mosaic services.
//!
//! Provides:
//! - Object storage (S3, local filesystem or in-memory) via `object_store`
//! - The [`ArtifactStore`] seam the service persists encoded rasters through

pub mod artifacts;
pub mod object_store;

pub use self::object_store::{ObjectStorage, ObjectStorageConfig, StorageBackend};
pub use artifacts::{persist_artifacts, ArtifactStore, StoredArtifact};
