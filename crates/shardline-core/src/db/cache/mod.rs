//! Session-scoped result cache indexed by table, predicate shape and bound
//! values.
//!
//! Layout: table → [`KeyDimension`] → [`DimCache`] (bound values → rows).
//! Writes invalidate conservatively: everything cached for the written
//! table is dropped except the bucket sharing the write's predicate shape,
//! from which only the written tuple is removed.

mod key;
mod stats;

#[cfg(test)]
mod tests;

use crate::{
    db::executor::Row,
    obs::{MetricsEvent, sink::record},
    value::Value,
};
use shardline_config::CacheConfig;
use std::collections::BTreeMap;
use tracing::debug;

// re-exports
pub use key::{CacheKey, KeyDimension};
pub use stats::{CacheStats, CacheStatsSnapshot};

use key::normalize_table;

///
/// DimCache
///
/// Bound-value tuple → cached rows, for one `(table, KeyDimension)` pair.
///

#[derive(Clone, Debug)]
pub struct DimCache<R> {
    entries: BTreeMap<Vec<Value>, Vec<R>>,
}

impl<R> Default for DimCache<R> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<R> DimCache<R> {
    #[must_use]
    pub fn get(&self, params: &[Value]) -> Option<&[R]> {
        self.entries.get(params).map(Vec::as_slice)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

///
/// PointIdentity
///
/// Primary-key predicate shape, key values and the inserted row, used to
/// refresh a single entry instead of clearing the table.
///

#[derive(Clone, Debug)]
pub struct PointIdentity<R> {
    pub dimension: KeyDimension,
    pub key: Vec<Value>,
    pub row: R,
}

///
/// WriteEvent
///

#[derive(Clone, Debug)]
pub enum WriteEvent<R> {
    Truncate {
        table: String,
    },
    Delete {
        table: String,
        dimension: KeyDimension,
        params: Vec<Value>,
    },
    Update {
        table: String,
        dimension: KeyDimension,
        params: Vec<Value>,
    },
    Insert {
        table: String,
        identity: Option<PointIdentity<R>>,
    },
}

impl<R> WriteEvent<R> {
    #[must_use]
    pub fn table(&self) -> &str {
        match self {
            Self::Truncate { table }
            | Self::Delete { table, .. }
            | Self::Update { table, .. }
            | Self::Insert { table, .. } => table,
        }
    }
}

///
/// SessionCache
///
/// Owned by exactly one session; mutation needs `&mut self`.
///

#[derive(Debug)]
pub struct SessionCache<R = Row> {
    tables: BTreeMap<String, BTreeMap<KeyDimension, DimCache<R>>>,
    stats: CacheStats,
    enabled: bool,
    debug: bool,
    max_rows: usize,
    dialect: String,
}

impl<R: Clone> SessionCache<R> {
    #[must_use]
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            tables: BTreeMap::new(),
            stats: CacheStats::new(),
            enabled: config.enabled,
            debug: config.debug,
            max_rows: config.max_rows,
            dialect: config.dialect.clone(),
        }
    }

    /// Dialect mixed into every [`KeyDimension`] built for this cache.
    #[must_use]
    pub fn dialect(&self) -> &str {
        &self.dialect
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Disabling drops every entry.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.tables.clear();
        }
    }

    pub const fn set_debug(&mut self, debug: bool) {
        self.debug = debug;
    }

    /// Cached rows for `key`. Never fails; a miss is just `None`.
    #[must_use]
    pub fn load(&self, key: &CacheKey) -> Option<&[R]> {
        if !self.enabled {
            return None;
        }

        let rows = self.lookup(key);
        if rows.is_some() {
            self.stats.record_hit();
        } else {
            self.stats.record_miss();
        }
        if self.debug {
            debug!(
                table = %key.table,
                dimension = %key.dimension,
                hit = rows.is_some(),
                "cache lookup"
            );
        }

        rows
    }

    /// Store rows loaded for `key`. Row sets over the size ceiling are not
    /// cached. Returns whether the rows were stored.
    pub fn on_load(&mut self, key: CacheKey, rows: &[R]) -> bool {
        if !self.enabled {
            return false;
        }
        if rows.len() > self.max_rows {
            self.stats.record_rejected();
            if self.debug {
                debug!(table = %key.table, rows = rows.len(), "cache store skipped, too many rows");
            }
            return false;
        }

        if self.debug {
            debug!(
                table = %key.table,
                dimension = %key.dimension,
                rows = rows.len(),
                "cache store"
            );
        }
        self.tables
            .entry(key.table)
            .or_default()
            .entry(key.dimension)
            .or_default()
            .entries
            .insert(key.params, rows.to_vec());
        self.stats.record_store();

        true
    }

    /// Apply a write to the cached state of its table.
    pub fn on_write(&mut self, event: WriteEvent<R>) {
        let table = normalize_table(event.table());
        let Some(buckets) = self.tables.get_mut(&table) else {
            return;
        };
        let before = buckets.len();

        match event {
            WriteEvent::Truncate { .. } | WriteEvent::Insert { identity: None, .. } => {
                self.tables.remove(&table);
            }
            WriteEvent::Delete {
                dimension, params, ..
            }
            | WriteEvent::Update {
                dimension, params, ..
            } => {
                buckets.retain(|kd, _| *kd == dimension);
                if let Some(bucket) = buckets.get_mut(&dimension) {
                    bucket.entries.remove(&params);
                }
            }
            WriteEvent::Insert {
                identity: Some(identity),
                ..
            } => {
                buckets.retain(|kd, _| *kd == identity.dimension);
                buckets
                    .entry(identity.dimension)
                    .or_default()
                    .entries
                    .insert(identity.key, vec![identity.row]);
            }
        }

        let after = self.tables.get(&table).map_or(0, BTreeMap::len);
        let cleared = before.saturating_sub(after);
        self.stats.record_invalidation();
        record(MetricsEvent::CacheInvalidate {
            table: &table,
            buckets_cleared: u64::try_from(cleared).unwrap_or(u64::MAX),
        });
        if self.debug {
            debug!(table = %table, buckets_cleared = cleared, "cache invalidated");
        }
    }

    /// Drop one entry.
    pub fn evict(&mut self, key: &CacheKey) -> bool {
        self.tables
            .get_mut(&key.table)
            .and_then(|buckets| buckets.get_mut(&key.dimension))
            .is_some_and(|bucket| bucket.entries.remove(&key.params).is_some())
    }

    /// Drop every entry of one table; returns the number of buckets removed.
    pub fn evict_table(&mut self, table: &str) -> usize {
        self.tables
            .remove(&normalize_table(table))
            .map_or(0, |buckets| buckets.len())
    }

    pub fn evict_all(&mut self) {
        self.tables.clear();
    }

    /// Presence check that leaves the statistics untouched.
    #[must_use]
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.lookup(key).is_some()
    }

    /// Bucket of one `(table, KeyDimension)` pair.
    #[must_use]
    pub fn bucket(&self, table: &str, dimension: &KeyDimension) -> Option<&DimCache<R>> {
        self.tables
            .get(&normalize_table(table))
            .and_then(|buckets| buckets.get(dimension))
    }

    /// Number of cached entries across all tables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tables
            .values()
            .flat_map(BTreeMap::values)
            .map(DimCache::len)
            .sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn stats(&self) -> CacheStatsSnapshot {
        self.stats.snapshot()
    }

    pub fn reset_stats(&self) {
        self.stats.reset();
    }

    fn lookup(&self, key: &CacheKey) -> Option<&[R]> {
        self.tables
            .get(&key.table)
            .and_then(|buckets| buckets.get(&key.dimension))
            .and_then(|bucket| bucket.get(&key.params))
    }
}
