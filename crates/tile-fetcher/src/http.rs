//! HTTP tile source.

use async_trait::async_trait;
use bytes::Bytes;
use dem_common::TileCoordinate;
use reqwest::{Client, StatusCode};
use tracing::debug;

use crate::{FetchConfig, SourceError, TileSource};

/// Fetches tiles over HTTP(S) from a `{z}/{x}/{y}` URL template.
pub struct HttpTileSource {
    client: Client,
    url_template: String,
}

impl HttpTileSource {
    /// Create a source with a client built from the fetch timeouts.
    pub fn new(url_template: impl Into<String>, config: &FetchConfig) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(config.concurrency)
            .tcp_nodelay(true)
            .user_agent(concat!("dem-mosaic/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SourceError::Permanent(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self::with_client(client, url_template))
    }

    pub fn with_client(client: Client, url_template: impl Into<String>) -> Self {
        Self {
            client,
            url_template: url_template.into(),
        }
    }

    pub fn url_for(&self, coord: &TileCoordinate) -> String {
        coord.fill_template(&self.url_template)
    }
}

/// Classify an HTTP status into found/not-found/error.
fn classify_status(status: StatusCode) -> Result<bool, SourceError> {
    match status {
        s if s.is_success() => Ok(true),
        StatusCode::NOT_FOUND | StatusCode::GONE => Ok(false),
        StatusCode::TOO_MANY_REQUESTS | StatusCode::REQUEST_TIMEOUT => {
            Err(SourceError::Transient(format!("HTTP {}", status)))
        }
        s if s.is_server_error() => Err(SourceError::Transient(format!("HTTP {}", status))),
        s => Err(SourceError::Permanent(format!("HTTP {}", s))),
    }
}

fn classify_reqwest(err: reqwest::Error) -> SourceError {
    if err.is_timeout() || err.is_connect() || err.is_request() || err.is_body() {
        SourceError::Transient(err.to_string())
    } else {
        SourceError::Permanent(err.to_string())
    }
}

#[async_trait]
impl TileSource for HttpTileSource {
    async fn fetch(&self, coord: TileCoordinate) -> Result<Option<Bytes>, SourceError> {
        let url = self.url_for(&coord);
        let response = self.client.get(&url).send().await.map_err(classify_reqwest)?;

        let status = response.status();
        if !classify_status(status)? {
            debug!(tile = %coord, status = %status, "Tile not present at source");
            return Ok(None);
        }

        let bytes = response.bytes().await.map_err(classify_reqwest)?;
        Ok(Some(bytes))
    }

    fn describe(&self) -> String {
        self.url_template.clone()
    }
}
