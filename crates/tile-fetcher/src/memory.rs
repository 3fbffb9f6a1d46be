//! In-memory tile source for tests and offline runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use dem_common::TileCoordinate;

use crate::{SourceError, TileSource};

/// Injected failure for one coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    /// Every attempt fails transiently.
    AlwaysTransient,
    /// The first `n` attempts fail transiently, then the tile is served.
    TransientTimes(u32),
    /// Every attempt fails permanently.
    Permanent,
}

/// Tiles held in a map. Coordinates without an entry are "not found".
#[derive(Default)]
pub struct MemoryTileSource {
    tiles: HashMap<TileCoordinate, Bytes>,
    failures: Mutex<HashMap<TileCoordinate, FailureMode>>,
    attempts: Mutex<HashMap<TileCoordinate, u32>>,
    requests: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    latency: Option<Duration>,
}

impl MemoryTileSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tile(mut self, coord: TileCoordinate, bytes: impl Into<Bytes>) -> Self {
        self.tiles.insert(coord, bytes.into());
        self
    }

    pub fn insert(&mut self, coord: TileCoordinate, bytes: impl Into<Bytes>) {
        self.tiles.insert(coord, bytes.into());
    }

    pub fn with_failure(mut self, coord: TileCoordinate, mode: FailureMode) -> Self {
        if let Ok(failures) = self.failures.get_mut() {
            failures.insert(coord, mode);
        }
        self
    }

    /// Delay every response, e.g. to exercise deadlines.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Total fetch calls across all coordinates.
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// Fetch calls made for one coordinate.
    pub fn attempts_for(&self, coord: &TileCoordinate) -> u32 {
        self.attempts
            .lock()
            .map(|a| a.get(coord).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Highest number of concurrent fetch calls observed.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn record_attempt(&self, coord: TileCoordinate) -> u32 {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let mut attempts = match self.attempts.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let count = attempts.entry(coord).or_insert(0);
        *count += 1;
        *count
    }

    fn injected_failure(&self, coord: &TileCoordinate, attempt: u32) -> Option<SourceError> {
        let failures = match self.failures.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        match failures.get(coord)? {
            FailureMode::AlwaysTransient => Some(SourceError::Transient(format!(
                "injected transient failure for {}",
                coord
            ))),
            FailureMode::TransientTimes(n) if attempt <= *n => Some(SourceError::Transient(
                format!("injected transient failure {} of {} for {}", attempt, n, coord),
            )),
            FailureMode::TransientTimes(_) => None,
            FailureMode::Permanent => Some(SourceError::Permanent(format!(
                "injected permanent failure for {}",
                coord
            ))),
        }
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl TileSource for MemoryTileSource {
    async fn fetch(&self, coord: TileCoordinate) -> Result<Option<Bytes>, SourceError> {
        let attempt = self.record_attempt(coord);

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        match self.latency {
            Some(latency) => tokio::time::sleep(latency).await,
            None => tokio::task::yield_now().await,
        }

        if let Some(err) = self.injected_failure(&coord, attempt) {
            return Err(err);
        }

        Ok(self.tiles.get(&coord).cloned())
    }

    fn describe(&self) -> String {
        format!("memory ({} tiles)", self.tiles.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_serves_and_misses() {
        let coord = TileCoordinate::new(2, 1, 1);
        let source = MemoryTileSource::new().with_tile(coord, vec![1u8, 2, 3]);

        assert_eq!(
            source.fetch(coord).await.unwrap(),
            Some(Bytes::from_static(&[1, 2, 3]))
        );
        assert_eq!(source.fetch(TileCoordinate::new(2, 0, 0)).await.unwrap(), None);
        assert_eq!(source.request_count(), 2);
    }

    #[tokio::test]
    async fn test_transient_times_then_success() {
        let coord = TileCoordinate::new(1, 0, 0);
        let source = MemoryTileSource::new()
            .with_tile(coord, vec![9u8])
            .with_failure(coord, FailureMode::TransientTimes(2));

        assert!(source.fetch(coord).await.unwrap_err().is_transient());
        assert!(source.fetch(coord).await.unwrap_err().is_transient());
        assert!(source.fetch(coord).await.unwrap().is_some());
        assert_eq!(source.attempts_for(&coord), 3);
    }
}
