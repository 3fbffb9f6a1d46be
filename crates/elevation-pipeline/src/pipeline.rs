//! Request orchestration.

use std::sync::Arc;
use std::time::Instant;

use dem_common::resolver::check_zoom;
use dem_common::{
    resolve_tiles, zoom_for_resolution, CrsCode, DemError, DemResult, ElevationRequest,
    EncodedTile, GeoExtent, OutputFormat, RasterArtifact, ResamplingMethod, TileCoordinate,
    TilePyramid, TileSet, TileSourceSpec,
};
use grid_processor::{assemble, decode_all, MosaicWindow, ReprojectTarget, Reprojector};
use metrics::{counter, histogram};
use raster_encoder::{encoder_for, RasterEncoder};
use serde::Serialize;
use tile_fetcher::{FetchOutcome, HttpTileSource, TileFetcher, TileSource};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::PipelineConfig;

/// A request after validation, ready to execute.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestPlan {
    pub extent: GeoExtent,
    pub zoom: u8,
    pub tiles: TileSet,
    pub target_crs: CrsCode,
    pub resolution: Option<f64>,
    pub formats: Vec<OutputFormat>,
    pub resampling: ResamplingMethod,
    pub tolerance: f64,
}

/// Counters and timings of one run, reported to the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PipelineStats {
    pub zoom: u8,
    pub tiles_requested: usize,
    pub tiles_fetched: usize,
    pub tiles_missing: usize,
    pub tiles_unavailable: usize,
    pub bytes_fetched: usize,
    pub mosaic_width: usize,
    pub mosaic_height: usize,
    pub output_width: usize,
    pub output_height: usize,
    pub nodata_pixels: usize,
    pub fetch_ms: u64,
    pub process_ms: u64,
    pub total_ms: u64,
}

/// Encoded rasters of one request, in requested format order.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub artifacts: Vec<RasterArtifact>,
    pub stats: PipelineStats,
}

/// Turns elevation requests into encoded rasters.
#[derive(Clone)]
pub struct ElevationPipeline {
    config: Arc<PipelineConfig>,
    pyramid: TilePyramid,
    fetcher: TileFetcher,
}

impl ElevationPipeline {
    pub fn new(config: PipelineConfig, source: Arc<dyn TileSource>) -> Self {
        let pyramid = config.source.pyramid();
        let fetcher = TileFetcher::new(source, config.fetch.clone());
        Self {
            config: Arc::new(config),
            pyramid,
            fetcher,
        }
    }

    /// Pipeline reading tiles over HTTP from the configured URL template.
    pub fn from_config(config: PipelineConfig) -> DemResult<Self> {
        config.validate().map_err(DemError::Internal)?;
        let source = HttpTileSource::new(config.source.url_template.clone(), &config.fetch)
            .map_err(|e| DemError::Internal(e.to_string()))?;
        Ok(Self::new(config, Arc::new(source)))
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Validate a request and resolve its tile set without fetching.
    ///
    /// Every validation error kind is raised here.
    pub fn plan(&self, request: &ElevationRequest) -> DemResult<RequestPlan> {
        let extent = request.extent()?;
        let target_crs = request.target_crs()?;
        let formats = request.formats()?;
        let resampling = request.resampling()?.unwrap_or(self.config.resampling);
        let resolution = request.resolution()?;
        let tolerance = request.tolerance()?.unwrap_or(self.config.tolerance);

        let zoom = match (request.zoom, resolution) {
            (Some(zoom), _) => check_zoom(&self.pyramid, zoom)?,
            (None, Some(res)) => zoom_for_resolution(&self.pyramid, &extent, res, target_crs),
            (None, None) => check_zoom(&self.pyramid, self.config.default_zoom as u32)?,
        };

        let tiles = resolve_tiles(&self.pyramid, &extent, zoom as u32)?;
        tiles.enforce_limit(self.config.max_tiles)?;

        Ok(RequestPlan {
            extent,
            zoom,
            tiles,
            target_crs,
            resolution,
            formats,
            resampling,
            tolerance,
        })
    }

    /// Run a request to completion.
    ///
    /// Cancelling `cancel` aborts with `Cancelled`. Exceeding the configured
    /// deadline cancels outstanding work and fails with `Timeout`.
    #[instrument(skip(self, request, cancel), fields(
        west = request.west,
        south = request.south,
        east = request.east,
        north = request.north,
    ))]
    pub async fn run(
        &self,
        request: &ElevationRequest,
        cancel: &CancellationToken,
    ) -> DemResult<PipelineOutput> {
        let start = Instant::now();

        let result = match self.plan(request) {
            Ok(plan) => {
                let token = cancel.child_token();
                match tokio::time::timeout(self.config.deadline, self.execute(plan, &token)).await
                {
                    Ok(result) => result,
                    Err(_) => {
                        token.cancel();
                        warn!(
                            deadline_ms = self.config.deadline.as_millis() as u64,
                            "Request deadline exceeded"
                        );
                        Err(DemError::Timeout)
                    }
                }
            }
            Err(e) => Err(e),
        };

        let elapsed = start.elapsed();
        histogram!("pipeline_duration_ms").record(elapsed.as_secs_f64() * 1000.0);

        match result {
            Ok(mut output) => {
                output.stats.total_ms = elapsed.as_millis() as u64;
                counter!("pipeline_requests_total", "outcome" => "success").increment(1);
                info!(
                    zoom = output.stats.zoom,
                    tiles = output.stats.tiles_requested,
                    width = output.stats.output_width,
                    height = output.stats.output_height,
                    artifacts = output.artifacts.len(),
                    total_ms = output.stats.total_ms,
                    "Pipeline completed"
                );
                Ok(output)
            }
            Err(e) => {
                counter!("pipeline_requests_total", "outcome" => e.kind()).increment(1);
                if e.is_validation() {
                    debug!(error = %e, "Request rejected");
                } else {
                    warn!(error = %e, kind = e.kind(), "Pipeline failed");
                }
                Err(e)
            }
        }
    }

    async fn execute(
        &self,
        plan: RequestPlan,
        cancel: &CancellationToken,
    ) -> DemResult<PipelineOutput> {
        let coords = plan.tiles.coordinates();
        histogram!("pipeline_tiles_per_request").record(coords.len() as f64);

        let report = self.fetcher.fetch_all(&coords, cancel).await?;
        report.check_tolerance(plan.tolerance)?;

        let mut stats = PipelineStats {
            zoom: plan.zoom,
            tiles_requested: report.total(),
            tiles_fetched: report.fetched_count(),
            tiles_missing: report.missing_count(),
            tiles_unavailable: report.unavailable_count(),
            bytes_fetched: report.bytes_fetched(),
            fetch_ms: report.elapsed.as_millis() as u64,
            ..PipelineStats::default()
        };

        // Unavailable tiles within tolerance are treated as missing.
        let tiles: Vec<(TileCoordinate, Option<EncodedTile>)> = report
            .outcomes
            .into_iter()
            .map(|(coord, outcome)| match outcome {
                FetchOutcome::Fetched(tile) => (coord, Some(tile)),
                FetchOutcome::Missing | FetchOutcome::Unavailable { .. } => (coord, None),
            })
            .collect();

        let job = ProcessJob {
            spec: self.config.source.spec(),
            reprojector: Reprojector::new(plan.resampling, self.config.max_output_pixels),
            encoders: plan
                .formats
                .iter()
                .map(|format| encoder_for(*format, &self.config.encoder))
                .collect(),
            plan,
            cancel: cancel.clone(),
        };

        let process_start = Instant::now();
        let processed = tokio::task::spawn_blocking(move || job.run(tiles))
            .await
            .map_err(|e| DemError::Internal(format!("processing task failed: {}", e)))??;

        stats.process_ms = process_start.elapsed().as_millis() as u64;
        stats.mosaic_width = processed.mosaic_size.0;
        stats.mosaic_height = processed.mosaic_size.1;
        stats.output_width = processed.output_size.0;
        stats.output_height = processed.output_size.1;
        stats.nodata_pixels = processed.nodata_pixels;

        Ok(PipelineOutput {
            artifacts: processed.artifacts,
            stats,
        })
    }
}

/// CPU-bound stages, run on the blocking pool.
struct ProcessJob {
    plan: RequestPlan,
    spec: TileSourceSpec,
    reprojector: Reprojector,
    encoders: Vec<Box<dyn RasterEncoder>>,
    cancel: CancellationToken,
}

struct Processed {
    artifacts: Vec<RasterArtifact>,
    mosaic_size: (usize, usize),
    output_size: (usize, usize),
    nodata_pixels: usize,
}

impl ProcessJob {
    fn run(self, tiles: Vec<(TileCoordinate, Option<EncodedTile>)>) -> DemResult<Processed> {
        let grids = decode_all(&tiles, &self.spec)?;
        drop(tiles);
        self.checkpoint()?;

        let window = MosaicWindow::for_extent(&self.plan.extent, self.plan.zoom, self.spec.tile_size);
        let mosaic = assemble(&grids, &window);
        drop(grids);
        let mosaic_size = (mosaic.width, mosaic.height);
        debug!(width = mosaic.width, height = mosaic.height, "Assembled mosaic");
        self.checkpoint()?;

        let target = ReprojectTarget::new(self.plan.target_crs, self.plan.extent)
            .with_resolution(self.plan.resolution);
        let output = self.reprojector.reproject(mosaic, &target)?;
        self.checkpoint()?;

        let artifacts = self
            .encoders
            .iter()
            .map(|encoder| {
                let artifact = encoder.encode(&output)?;
                counter!("pipeline_artifacts_total", "format" => artifact.format.as_str())
                    .increment(1);
                histogram!("pipeline_artifact_bytes", "format" => artifact.format.as_str())
                    .record(artifact.size_bytes() as f64);
                Ok(artifact)
            })
            .collect::<DemResult<Vec<_>>>()?;

        Ok(Processed {
            artifacts,
            mosaic_size,
            output_size: (output.width, output.height),
            nodata_pixels: output.nodata_count(),
        })
    }

    fn checkpoint(&self) -> DemResult<()> {
        if self.cancel.is_cancelled() {
            return Err(DemError::Cancelled);
        }
        Ok(())
    }
}
