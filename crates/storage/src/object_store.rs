//! Object storage for encoded artifacts (S3 compatible, local or memory).

use bytes::Bytes;
use object_store::{
    aws::AmazonS3Builder, local::LocalFileSystem, memory::InMemory, path::Path, ObjectStore,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, instrument};

use dem_common::{DemError, DemResult};

/// Which object store implementation to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    S3,
    Local,
    Memory,
}

impl StorageBackend {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "s3" | "minio" => Some(Self::S3),
            "local" | "file" | "fs" => Some(Self::Local),
            "memory" | "mem" => Some(Self::Memory),
            _ => None,
        }
    }
}

/// Configuration for object storage connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectStorageConfig {
    pub backend: StorageBackend,
    /// S3 endpoint URL; `None` uses AWS
    pub endpoint: Option<String>,
    /// Bucket name
    pub bucket: String,
    /// Access key ID; `None` falls back to the AWS environment
    pub access_key_id: Option<String>,
    /// Secret access key
    pub secret_access_key: Option<String>,
    /// AWS region
    pub region: String,
    /// Allow HTTP (for local MinIO)
    pub allow_http: bool,
    /// Root directory of the local backend
    pub root: PathBuf,
}

impl Default for ObjectStorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::S3,
            endpoint: None,
            bucket: "dem-mosaics".to_string(),
            access_key_id: None,
            secret_access_key: None,
            region: "us-east-1".to_string(),
            allow_http: false,
            root: PathBuf::from("./data/artifacts"),
        }
    }
}

impl ObjectStorageConfig {
    /// In-memory storage, mostly for tests.
    pub fn memory() -> Self {
        Self {
            backend: StorageBackend::Memory,
            ..Default::default()
        }
    }

    /// Local filesystem storage under `root`.
    pub fn local(root: impl Into<PathBuf>) -> Self {
        Self {
            backend: StorageBackend::Local,
            root: root.into(),
            ..Default::default()
        }
    }

    /// Create configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("STORAGE_BACKEND") {
            if let Some(backend) = StorageBackend::parse(&val) {
                config.backend = backend;
            }
        }
        if let Ok(val) = std::env::var("S3_ENDPOINT") {
            config.endpoint = Some(val);
        }
        if let Ok(val) = std::env::var("S3_BUCKET") {
            config.bucket = val;
        }
        if let Ok(val) = std::env::var("S3_ACCESS_KEY") {
            config.access_key_id = Some(val);
        }
        if let Ok(val) = std::env::var("S3_SECRET_KEY") {
            config.secret_access_key = Some(val);
        }
        if let Ok(val) = std::env::var("S3_REGION") {
            config.region = val;
        }
        if let Ok(val) = std::env::var("S3_ALLOW_HTTP") {
            config.allow_http = val.to_lowercase() == "true" || val == "1";
        }
        if let Ok(val) = std::env::var("STORAGE_ROOT") {
            config.root = PathBuf::from(val);
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        match self.backend {
            StorageBackend::S3 if self.bucket.trim().is_empty() => {
                Err("S3 bucket name must not be empty".to_string())
            }
            StorageBackend::S3
                if self.access_key_id.is_some() != self.secret_access_key.is_some() =>
            {
                Err("S3 access key and secret key must be set together".to_string())
            }
            StorageBackend::Local if self.root.as_os_str().is_empty() => {
                Err("local storage root must not be empty".to_string())
            }
            _ => Ok(()),
        }
    }
}

/// Object storage client for artifacts.
pub struct ObjectStorage {
    store: Arc<dyn ObjectStore>,
    backend: StorageBackend,
    /// Bucket name or root directory, used to build locators
    base: String,
}

impl std::fmt::Debug for ObjectStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStorage")
            .field("backend", &self.backend)
            .field("base", &self.base)
            .finish()
    }
}

impl ObjectStorage {
    /// Create a new object storage client from config.
    pub fn new(config: &ObjectStorageConfig) -> DemResult<Self> {
        config.validate().map_err(DemError::StorageError)?;

        let (store, base): (Arc<dyn ObjectStore>, String) = match config.backend {
            StorageBackend::S3 => {
                let mut builder = AmazonS3Builder::from_env()
                    .with_bucket_name(&config.bucket)
                    .with_region(&config.region);

                if let Some(endpoint) = &config.endpoint {
                    builder = builder.with_endpoint(endpoint);
                }
                if let (Some(key), Some(secret)) =
                    (&config.access_key_id, &config.secret_access_key)
                {
                    builder = builder
                        .with_access_key_id(key)
                        .with_secret_access_key(secret);
                }
                if config.allow_http {
                    builder = builder.with_allow_http(true);
                }

                let store = builder.build().map_err(|e| {
                    DemError::StorageError(format!("Failed to create S3 client: {}", e))
                })?;
                (Arc::new(store), config.bucket.clone())
            }
            StorageBackend::Local => {
                std::fs::create_dir_all(&config.root).map_err(|e| {
                    DemError::StorageError(format!(
                        "Failed to create {}: {}",
                        config.root.display(),
                        e
                    ))
                })?;
                let root = config.root.canonicalize().map_err(|e| {
                    DemError::StorageError(format!(
                        "Failed to resolve {}: {}",
                        config.root.display(),
                        e
                    ))
                })?;
                let store = LocalFileSystem::new_with_prefix(&root).map_err(|e| {
                    DemError::StorageError(format!("Failed to open local store: {}", e))
                })?;
                (Arc::new(store), root.display().to_string())
            }
            StorageBackend::Memory => (Arc::new(InMemory::new()), String::new()),
        };

        Ok(Self {
            store,
            backend: config.backend,
            base,
        })
    }

    pub fn backend(&self) -> StorageBackend {
        self.backend
    }

    /// URL-style locator of a key, e.g. `s3://bucket/key`.
    pub fn locator(&self, key: &str) -> String {
        let key = key.trim_start_matches('/');
        match self.backend {
            StorageBackend::S3 => format!("s3://{}/{}", self.base, key),
            StorageBackend::Local => format!("file://{}/{}", self.base.trim_end_matches('/'), key),
            StorageBackend::Memory => format!("memory://{}", key),
        }
    }

    /// Write bytes to a path in the bucket.
    #[instrument(skip(self, data), fields(base = %self.base, path = %path))]
    pub async fn put(&self, path: &str, data: Bytes) -> DemResult<()> {
        let location = Path::from(path);
        debug!(size = data.len(), "Writing object");

        self.store
            .put(&location, data.into())
            .await
            .map_err(|e| DemError::StorageError(format!("Failed to write {}: {}", path, e)))?;

        Ok(())
    }

    /// Delete an object. Deleting a missing object succeeds.
    #[instrument(skip(self), fields(base = %self.base, path = %path))]
    pub async fn delete(&self, path: &str) -> DemResult<()> {
        let location = Path::from(path);

        match self.store.delete(&location).await {
            Ok(()) | Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(e) => Err(DemError::StorageError(format!(
                "Failed to delete {}: {}",
                path, e
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_local_put_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let storage = ObjectStorage::new(&ObjectStorageConfig::local(dir.path())).unwrap();
        storage
            .put("req-1/mosaic.tif", Bytes::from_static(b"data"))
            .await
            .unwrap();

        let file = dir.path().join("req-1").join("mosaic.tif");
        assert_eq!(std::fs::read(&file).unwrap(), b"data");
        assert!(storage.locator("req-1/mosaic.tif").starts_with("file://"));

        storage.delete("req-1/mosaic.tif").await.unwrap();
        assert!(!file.exists());
        // Idempotent
        storage.delete("req-1/mosaic.tif").await.unwrap();
    }

    #[tokio::test]
    async fn test_memory_delete_missing_succeeds() {
        let storage = ObjectStorage::new(&ObjectStorageConfig::memory()).unwrap();
        storage
            .put("abc/mosaic.tif", Bytes::from_static(b"tiff"))
            .await
            .unwrap();
        storage.delete("abc/mosaic.tif").await.unwrap();
        storage.delete("abc/never-written.tif").await.unwrap();
    }

    #[test]
    fn test_locators() {
        let storage = ObjectStorage::new(&ObjectStorageConfig::memory()).unwrap();
        assert_eq!(storage.locator("a/b.png"), "memory://a/b.png");
    }

    #[test]
    fn test_validate() {
        assert!(ObjectStorageConfig::default().validate().is_ok());

        let config = ObjectStorageConfig {
            bucket: " ".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ObjectStorageConfig {
            access_key_id: Some("key".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_backend_parse() {
        assert_eq!(StorageBackend::parse("MinIO"), Some(StorageBackend::S3));
        assert_eq!(StorageBackend::parse("fs"), Some(StorageBackend::Local));
        assert_eq!(StorageBackend::parse("gcs"), None);
    }
}
