use time::OffsetDateTime;
use serde::{Deserialize, Serialize};
use std::{cell::RefCell, cmp::Ordering, collections::BTreeMap};

///
/// EventState
/// Ephemeral, in-memory counters for routing, fan-out and cache activity.
///

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct EventState {
    pub ops: EventOps,
    pub tables: BTreeMap<String, TableCounters>,
    pub window_start_ms: u64,
}

impl Default for EventState {
    fn default() -> Self {
        Self {
            ops: EventOps::default(),
            tables: BTreeMap::new(),
            window_start_ms: now_millis(),
        }
    }
}

///
/// EventOps
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventOps {
    // Routing decisions
    pub route_pruned: u64,
    pub route_broadcast: u64,
    pub route_direct: u64,

    // Fan-out
    pub fanout_calls: u64,
    pub fanout_parallel: u64,
    pub partitions_touched: u64,
    pub rows_returned: u64,

    // Cache
    pub cache_invalidations: u64,
    pub cache_buckets_cleared: u64,
}

///
/// TableCounters
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct TableCounters {
    pub routes: u64,
    pub broadcasts: u64,
    pub fanout_calls: u64,
    pub partitions_touched: u64,
    pub rows_returned: u64,
    pub cache_invalidations: u64,
}

thread_local! {
    static EVENT_STATE: RefCell<EventState> = RefCell::new(EventState::default());
}

pub(crate) fn now_millis() -> u64 {
    let nanos = OffsetDateTime::now_utc().unix_timestamp_nanos();

    u64::try_from(nanos / 1_000_000).unwrap_or(0)
}

/// Borrow metrics immutably.
pub(crate) fn with_state<R>(f: impl FnOnce(&EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&m.borrow()))
}

/// Borrow metrics mutably.
pub(crate) fn with_state_mut<R>(f: impl FnOnce(&mut EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&mut m.borrow_mut()))
}

/// Reset all counters and restart the window.
pub(crate) fn reset_all() {
    with_state_mut(|m| *m = EventState::default());
}

///
/// EventReport
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventReport {
    /// Ephemeral runtime counters since `window_start_ms`.
    pub counters: Option<EventState>,
    /// Per-table counters and averages.
    pub table_counters: Vec<TableSummary>,
}

///
/// TableSummary
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct TableSummary {
    pub table: String,
    pub routes: u64,
    pub broadcasts: u64,
    pub fanout_calls: u64,
    pub rows_returned: u64,
    pub cache_invalidations: u64,
    pub avg_partitions_per_fanout: f64,
    pub avg_rows_per_fanout: f64,
}

/// Build a report from in-memory counters.
///
/// When `window_start_ms` is later than the current window start, the
/// window is considered unobserved and the report is empty.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub(crate) fn report_window_start(window_start_ms: Option<u64>) -> EventReport {
    let snap = with_state(Clone::clone);
    if let Some(requested) = window_start_ms
        && requested > snap.window_start_ms
    {
        return EventReport::default();
    }

    let mut table_counters: Vec<TableSummary> = snap
        .tables
        .iter()
        .map(|(table, c)| {
            let per_fanout = |total: u64| {
                if c.fanout_calls > 0 {
                    total as f64 / c.fanout_calls as f64
                } else {
                    0.0
                }
            };

            TableSummary {
                table: table.clone(),
                routes: c.routes,
                broadcasts: c.broadcasts,
                fanout_calls: c.fanout_calls,
                rows_returned: c.rows_returned,
                cache_invalidations: c.cache_invalidations,
                avg_partitions_per_fanout: per_fanout(c.partitions_touched),
                avg_rows_per_fanout: per_fanout(c.rows_returned),
            }
        })
        .collect();

    // Widest fan-out first, then busiest, then by name.
    table_counters.sort_by(|a, b| {
        match b
            .avg_partitions_per_fanout
            .partial_cmp(&a.avg_partitions_per_fanout)
            .unwrap_or(Ordering::Equal)
        {
            Ordering::Equal => match b.fanout_calls.cmp(&a.fanout_calls) {
                Ordering::Equal => a.table.cmp(&b.table),
                other => other,
            },
            other => other,
        }
    });

    EventReport {
        counters: Some(snap),
        table_counters,
    }
}

///
/// TESTS
///
