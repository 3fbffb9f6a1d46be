//! Persisting encoded artifacts of one request.

use async_trait::async_trait;
use dem_common::{ArtifactMetadata, DemError, DemResult, RasterArtifact};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::ObjectStorage;

/// Where the service writes finished artifacts.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Store an artifact under `key`, returning its locator.
    async fn put(&self, key: &str, artifact: &RasterArtifact) -> DemResult<String>;

    /// Remove a stored artifact.
    async fn delete(&self, key: &str) -> DemResult<()>;

    /// Locator of a key prefix, e.g. `s3://bucket/{request_id}`.
    fn location(&self, prefix: &str) -> String;
}

#[async_trait]
impl ArtifactStore for ObjectStorage {
    async fn put(&self, key: &str, artifact: &RasterArtifact) -> DemResult<String> {
        ObjectStorage::put(self, key, artifact.bytes.clone()).await?;
        Ok(self.locator(key))
    }

    async fn delete(&self, key: &str) -> DemResult<()> {
        ObjectStorage::delete(self, key).await
    }

    fn location(&self, prefix: &str) -> String {
        self.locator(prefix)
    }
}

/// A persisted artifact as reported to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredArtifact {
    pub key: String,
    pub url: String,
    #[serde(flatten)]
    pub metadata: ArtifactMetadata,
}

/// Store every artifact of a request under `{request_id}/{name}.{ext}`.
///
/// All or nothing: if any write fails, artifacts already written for this
/// request are deleted and `StorageError` is returned.
#[instrument(skip(store, artifacts), fields(request_id = %request_id, count = artifacts.len()))]
pub async fn persist_artifacts(
    store: &dyn ArtifactStore,
    request_id: &str,
    artifacts: &[RasterArtifact],
) -> DemResult<Vec<StoredArtifact>> {
    let mut stored: Vec<StoredArtifact> = Vec::with_capacity(artifacts.len());

    for artifact in artifacts {
        let key = artifact.format.artifact_key(request_id);
        match store.put(&key, artifact).await {
            Ok(url) => stored.push(StoredArtifact {
                key,
                url,
                metadata: artifact.metadata(),
            }),
            Err(err) => {
                warn!(key = %key, error = %err, "Artifact write failed, rolling back");
                for done in &stored {
                    if let Err(e) = store.delete(&done.key).await {
                        warn!(key = %done.key, error = %e, "Failed to roll back artifact");
                    }
                }
                return Err(match err {
                    DemError::StorageError(msg) => DemError::StorageError(msg),
                    other => DemError::StorageError(other.to_string()),
                });
            }
        }
    }

    info!(
        location = %store.location(request_id),
        artifacts = stored.len(),
        "Persisted artifacts"
    );
    Ok(stored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ObjectStorageConfig;
    use bytes::Bytes;
    use dem_common::{CrsCode, GeoTransform, OutputFormat};

    fn artifact(format: OutputFormat) -> RasterArtifact {
        RasterArtifact {
            bytes: Bytes::from_static(b"payload"),
            format,
            width: 2,
            height: 2,
            transform: GeoTransform::new(0.0, 0.0, 1.0, 1.0),
            crs: CrsCode::WebMercator,
            nodata: Some(-9999.0),
        }
    }

    #[tokio::test]
    async fn test_persist_artifacts_keys() {
        let storage = ObjectStorage::new(&ObjectStorageConfig::memory()).unwrap();
        let stored = persist_artifacts(
            &storage,
            "req-1",
            &[artifact(OutputFormat::GeoTiff), artifact(OutputFormat::TerrariumPng)],
        )
        .await
        .unwrap();

        assert_eq!(stored[0].key, "req-1/mosaic.tif");
        assert_eq!(stored[0].url, "memory://req-1/mosaic.tif");
        assert_eq!(stored[1].key, "req-1/mosaic_terrarium.png");
        assert_eq!(stored[1].metadata.content_type, "image/png");
    }

    #[test]
    fn test_stored_artifact_serializes_flat() {
        let a = artifact(OutputFormat::GeoTiffDisplay);
        let stored = StoredArtifact {
            key: "r/mosaic_display.tif".to_string(),
            url: "memory://r/mosaic_display.tif".to_string(),
            metadata: a.metadata(),
        };
        let json = serde_json::to_string(&stored).unwrap();
        assert!(json.contains("\"format\":\"geotiff_display\""));
        assert!(json.contains("\"key\":\"r/mosaic_display.tif\""));
        assert!(json.contains("\"geo_transform\":[0.0,1.0,0.0,0.0,0.0,-1.0]"));
    }
}
