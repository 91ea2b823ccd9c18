use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

///
/// CacheStats
///
/// Counters owned by one cache instance. Atomic so readers on other
/// threads can snapshot while the owning session keeps working.
///

#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    stores: AtomicU64,
    rejected: AtomicU64,
    invalidations: AtomicU64,
}

impl CacheStats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_store(&self) {
        self.stores.fetch_add(1, Ordering::Relaxed);
    }

    /// A row set over the size ceiling was not stored.
    pub(crate) fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_invalidation(&self) {
        self.invalidations.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn snapshot(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            stores: self.stores.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        for counter in [
            &self.hits,
            &self.misses,
            &self.stores,
            &self.rejected,
            &self.invalidations,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

///
/// CacheStatsSnapshot
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct CacheStatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub stores: u64,
    pub rejected: u64,
    pub invalidations: u64,
}

impl CacheStatsSnapshot {
    /// Hits over lookups, `0.0` before the first lookup.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_ratio(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        }
    }
}
