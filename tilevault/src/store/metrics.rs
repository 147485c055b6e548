//! Tile-serving metrics.
//!
//! Lock-free atomic counters recorded on the rendering path, exposed as
//! point-in-time snapshots for diagnostics and status displays.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for the tile read path.
#[derive(Debug, Default)]
pub struct StoreMetrics {
    tile_reads: AtomicU64,
    tile_hits: AtomicU64,
    tile_misses: AtomicU64,
    read_errors: AtomicU64,
}

impl StoreMetrics {
    /// Create zeroed metrics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a tile read attempt.
    pub fn record_read(&self) {
        self.tile_reads.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a read that produced tile data.
    pub fn record_hit(&self) {
        self.tile_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a read that produced no tile.
    pub fn record_miss(&self) {
        self.tile_misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a storage-level failure that degraded to "no tile".
    pub fn record_error(&self) {
        self.read_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a point-in-time copy of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            tile_reads: self.tile_reads.load(Ordering::Relaxed),
            tile_hits: self.tile_hits.load(Ordering::Relaxed),
            tile_misses: self.tile_misses.load(Ordering::Relaxed),
            read_errors: self.read_errors.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`StoreMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Total tile read attempts.
    pub tile_reads: u64,
    /// Reads that produced tile data.
    pub tile_hits: u64,
    /// Reads that produced no tile.
    pub tile_misses: u64,
    /// Storage failures degraded to "no tile".
    pub read_errors: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reflects_counters() {
        let metrics = StoreMetrics::new();
        metrics.record_read();
        metrics.record_read();
        metrics.record_hit();
        metrics.record_miss();
        metrics.record_error();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.tile_reads, 2);
        assert_eq!(snapshot.tile_hits, 1);
        assert_eq!(snapshot.tile_misses, 1);
        assert_eq!(snapshot.read_errors, 1);
    }

    #[test]
    fn test_default_is_zeroed() {
        let snapshot = StoreMetrics::new().snapshot();
        assert_eq!(snapshot, MetricsSnapshot::default());
    }
}
