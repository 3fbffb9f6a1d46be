//! Application state for the elevation API.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use elevation_pipeline::{ElevationPipeline, PipelineConfig};
use metrics_exporter_prometheus::PrometheusHandle;
use storage::{ArtifactStore, ObjectStorage};
use tracing::info;

use crate::config::ServiceConfig;

/// Shared application state.
pub struct AppState {
    pub pipeline: ElevationPipeline,

    /// Where finished artifacts are written.
    pub store: Arc<dyn ArtifactStore>,

    /// Renders `/metrics`; absent when no recorder is installed.
    pub prometheus: Option<PrometheusHandle>,

    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(pipeline: ElevationPipeline, store: Arc<dyn ArtifactStore>) -> Self {
        Self {
            pipeline,
            store,
            prometheus: None,
            started_at: Utc::now(),
        }
    }

    pub fn with_prometheus(mut self, handle: PrometheusHandle) -> Self {
        self.prometheus = Some(handle);
        self
    }

    /// Build the pipeline and object store from configuration.
    pub fn from_config(config: &ServiceConfig) -> Result<Self> {
        let pipeline_config = match &config.pipeline_config {
            Some(path) => {
                info!(path = %path.display(), "Loading pipeline config");
                PipelineConfig::from_yaml_file(path)?
            }
            None => PipelineConfig::from_env(),
        };
        pipeline_config
            .validate()
            .map_err(|e| anyhow!("invalid pipeline config: {}", e))?;

        info!(
            url_template = %pipeline_config.source.url_template,
            encoding = ?pipeline_config.source.encoding,
            max_tiles = pipeline_config.max_tiles,
            deadline_ms = pipeline_config.deadline.as_millis() as u64,
            "Pipeline configured"
        );

        let pipeline = ElevationPipeline::from_config(pipeline_config)?;
        let store = ObjectStorage::new(&config.storage)?;
        info!(backend = ?store.backend(), "Artifact store ready");

        Ok(Self::new(pipeline, Arc::new(store)))
    }
}
