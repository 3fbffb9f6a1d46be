//! Bounded concurrent tile fetching with retry.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dem_common::{DemError, DemResult, EncodedTile, TileCoordinate};
use futures::future::try_join_all;
use metrics::counter;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::{FetchConfig, SourceError, TileSource};

/// Result of fetching one tile.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    Fetched(EncodedTile),
    /// The source has no tile here; decodes to all no-data.
    Missing,
    /// Retries exhausted or a permanent error.
    Unavailable { attempts: u32, reason: String },
}

impl FetchOutcome {
    fn label(&self) -> &'static str {
        match self {
            FetchOutcome::Fetched(_) => "fetched",
            FetchOutcome::Missing => "missing",
            FetchOutcome::Unavailable { .. } => "unavailable",
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, FetchOutcome::Unavailable { .. })
    }
}

/// Per-tile outcomes of one fetch run, in request order.
#[derive(Debug, Clone)]
pub struct FetchReport {
    pub outcomes: Vec<(TileCoordinate, FetchOutcome)>,
    pub elapsed: Duration,
}

impl FetchReport {
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn fetched_count(&self) -> usize {
        self.count(|o| matches!(o, FetchOutcome::Fetched(_)))
    }

    pub fn missing_count(&self) -> usize {
        self.count(|o| matches!(o, FetchOutcome::Missing))
    }

    pub fn unavailable_count(&self) -> usize {
        self.count(FetchOutcome::is_unavailable)
    }

    pub fn bytes_fetched(&self) -> usize {
        self.outcomes
            .iter()
            .map(|(_, o)| match o {
                FetchOutcome::Fetched(tile) => tile.bytes.len(),
                _ => 0,
            })
            .sum()
    }

    fn count(&self, pred: impl Fn(&FetchOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, o)| pred(o)).count()
    }

    /// Fail with `SourceUnavailable` when the unavailable fraction exceeds
    /// `tolerance` (0.0 means any unavailable tile is fatal).
    pub fn check_tolerance(&self, tolerance: f64) -> DemResult<()> {
        let unavailable = self.unavailable_count();
        let total = self.total();
        if unavailable == 0 || total == 0 {
            return Ok(());
        }

        if unavailable as f64 / total as f64 > tolerance {
            return Err(DemError::SourceUnavailable {
                unavailable,
                total,
                tolerance,
            });
        }
        Ok(())
    }
}

/// Fetches tiles from a source with bounded parallelism.
#[derive(Clone)]
pub struct TileFetcher {
    source: Arc<dyn TileSource>,
    config: FetchConfig,
}

impl TileFetcher {
    pub fn new(source: Arc<dyn TileSource>, config: FetchConfig) -> Self {
        Self { source, config }
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Fetch every coordinate, at most `concurrency` at a time.
    ///
    /// Returns `Cancelled` as soon as `cancel` fires; outstanding requests
    /// are dropped.
    #[instrument(skip(self, coords, cancel), fields(tiles = coords.len(), source = %self.source.describe()))]
    pub async fn fetch_all(
        &self,
        coords: &[TileCoordinate],
        cancel: &CancellationToken,
    ) -> DemResult<FetchReport> {
        let start = Instant::now();
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1)));

        let tasks = coords.iter().map(|&coord| {
            let semaphore = semaphore.clone();
            async move {
                let _permit = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(DemError::Cancelled),
                    permit = semaphore.acquire_owned() => permit
                        .map_err(|e| DemError::Internal(format!("fetch semaphore closed: {}", e)))?,
                };

                let outcome = self.fetch_one(coord, cancel).await?;
                counter!("tile_fetch_total", "outcome" => outcome.label()).increment(1);
                Ok((coord, outcome))
            }
        });

        let outcomes = try_join_all(tasks).await?;
        let report = FetchReport {
            outcomes,
            elapsed: start.elapsed(),
        };

        info!(
            fetched = report.fetched_count(),
            missing = report.missing_count(),
            unavailable = report.unavailable_count(),
            bytes = report.bytes_fetched(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Tile fetch complete"
        );

        Ok(report)
    }

    /// Fetch one tile, retrying transient failures with exponential backoff.
    async fn fetch_one(
        &self,
        coord: TileCoordinate,
        cancel: &CancellationToken,
    ) -> DemResult<FetchOutcome> {
        let mut attempts = 0u32;

        loop {
            if cancel.is_cancelled() {
                return Err(DemError::Cancelled);
            }
            attempts += 1;

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(DemError::Cancelled),
                result = self.source.fetch(coord) => result,
            };

            let err = match result {
                Ok(Some(bytes)) => {
                    debug!(tile = %coord, bytes = bytes.len(), attempts, "Tile fetched");
                    return Ok(FetchOutcome::Fetched(EncodedTile::new(coord, bytes)));
                }
                Ok(None) => return Ok(FetchOutcome::Missing),
                Err(SourceError::Permanent(reason)) => {
                    warn!(tile = %coord, error = %reason, "Tile fetch failed permanently");
                    return Ok(FetchOutcome::Unavailable { attempts, reason });
                }
                Err(err) => err,
            };

            if attempts > self.config.max_retries {
                warn!(
                    tile = %coord,
                    error = %err,
                    attempts,
                    "Tile fetch retries exhausted"
                );
                return Ok(FetchOutcome::Unavailable {
                    attempts,
                    reason: err.message().to_string(),
                });
            }

            let delay = self.config.backoff_for(attempts);
            warn!(
                tile = %coord,
                error = %err,
                retry = attempts,
                max_retries = self.config.max_retries,
                delay_ms = delay.as_millis() as u64,
                "Tile fetch failed, retrying"
            );
            counter!("tile_fetch_retries_total").increment(1);

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(DemError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn report(outcomes: Vec<FetchOutcome>) -> FetchReport {
        FetchReport {
            outcomes: outcomes
                .into_iter()
                .enumerate()
                .map(|(i, o)| (TileCoordinate::new(4, i as u32, 0), o))
                .collect(),
            elapsed: Duration::ZERO,
        }
    }

    fn fetched() -> FetchOutcome {
        FetchOutcome::Fetched(EncodedTile::new(
            TileCoordinate::new(4, 0, 0),
            Bytes::from_static(b"x"),
        ))
    }

    fn unavailable() -> FetchOutcome {
        FetchOutcome::Unavailable {
            attempts: 4,
            reason: "HTTP 503".into(),
        }
    }

    #[test]
    fn test_zero_tolerance_rejects_any_unavailable() {
        let r = report(vec![fetched(), fetched(), fetched(), unavailable()]);
        let err = r.check_tolerance(0.0).unwrap_err();
        assert!(matches!(
            err,
            DemError::SourceUnavailable {
                unavailable: 1,
                total: 4,
                ..
            }
        ));
    }

    #[test]
    fn test_tolerance_fraction() {
        let r = report(vec![fetched(), fetched(), fetched(), unavailable()]);
        assert!(r.check_tolerance(0.25).is_ok());
        assert!(r.check_tolerance(0.2).is_err());
    }

    #[test]
    fn test_missing_is_not_unavailable() {
        let r = report(vec![fetched(), FetchOutcome::Missing]);
        assert!(r.check_tolerance(0.0).is_ok());
        assert_eq!(r.missing_count(), 1);
        assert_eq!(r.bytes_fetched(), 1);
    }
}
