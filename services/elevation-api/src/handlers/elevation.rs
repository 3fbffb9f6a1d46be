//! Elevation mosaic requests.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{rejection::JsonRejection, Extension},
    Json,
};
use dem_common::ElevationRequest;
use elevation_pipeline::PipelineStats;
use metrics::{counter, histogram};
use serde::Serialize;
use storage::{persist_artifacts, StoredArtifact};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, Span};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ElevationResponse {
    pub request_id: String,
    /// Prefix under which every artifact of this request is stored
    pub location: String,
    pub artifacts: Vec<StoredArtifact>,
    pub stats: PipelineStats,
}

/// POST /v1/elevation
#[instrument(skip_all, fields(request_id = tracing::field::Empty))]
pub async fn elevation_handler(
    Extension(state): Extension<Arc<AppState>>,
    body: Result<Json<ElevationRequest>, JsonRejection>,
) -> Result<Json<ElevationResponse>, ApiError> {
    let start = Instant::now();
    let request_id = Uuid::new_v4().to_string();
    Span::current().record("request_id", request_id.as_str());

    let result = process(&state, &request_id, body).await;

    let status = match &result {
        Ok(_) => "200".to_string(),
        Err(e) => e.status().as_u16().to_string(),
    };
    counter!("api_requests_total", "endpoint" => "elevation", "status" => status).increment(1);
    histogram!("api_request_duration_ms", "endpoint" => "elevation")
        .record(start.elapsed().as_secs_f64() * 1000.0);

    result.map(Json)
}

async fn process(
    state: &AppState,
    request_id: &str,
    body: Result<Json<ElevationRequest>, JsonRejection>,
) -> Result<ElevationResponse, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    // Dropping the handler (client gone) cancels outstanding work.
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    let output = state.pipeline.run(&request, &cancel).await?;
    let artifacts = persist_artifacts(state.store.as_ref(), request_id, &output.artifacts).await?;

    info!(
        artifacts = artifacts.len(),
        total_ms = output.stats.total_ms,
        "Elevation request completed"
    );

    Ok(ElevationResponse {
        request_id: request_id.to_string(),
        location: state.store.location(request_id),
        artifacts,
        stats: output.stats,
    })
}
