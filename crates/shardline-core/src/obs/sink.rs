//! Metrics sink boundary.
//!
//! Routing, fan-out and cache code MUST NOT depend on obs::metrics directly.
//! All instrumentation flows through MetricsEvent and MetricsSink.
//!
//! This module is the only allowed bridge between execution logic
//! and the global metrics state.
use crate::obs::metrics;
use std::cell::RefCell;

thread_local! {
    static SINK_OVERRIDE: RefCell<Option<*const dyn MetricsSink>> = RefCell::new(None);
}

///
/// RouteKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RouteKind {
    /// Every partition key was determined and the resolver narrowed.
    Pruned,
    /// At least one partition key was undetermined.
    Broadcast,
    /// Table is not partitioned; the statement ran on its home database.
    Direct,
}

///
/// MetricsEvent
///

#[derive(Clone, Copy, Debug)]
pub enum MetricsEvent<'a> {
    Route {
        table: &'a str,
        kind: RouteKind,
        partitions: u64,
    },
    FanOutStart {
        table: &'a str,
        partitions: u64,
        parallel: bool,
    },
    FanOutFinish {
        table: &'a str,
        partitions: u64,
        parallel: bool,
        rows: u64,
    },
    CacheInvalidate {
        table: &'a str,
        buckets_cleared: u64,
    },
}

///
/// MetricsSink
///

pub trait MetricsSink {
    fn record(&self, event: MetricsEvent<'_>);
}

/// GlobalMetricsSink
/// Default thread-local sink that writes into global metrics state.
/// Acts as the concrete sink when no scoped override is installed.

pub(crate) struct GlobalMetricsSink;

impl MetricsSink for GlobalMetricsSink {
    fn record(&self, event: MetricsEvent<'_>) {
        match event {
            MetricsEvent::Route {
                table,
                kind,
                partitions: _,
            } => {
                metrics::with_state_mut(|m| {
                    match kind {
                        RouteKind::Pruned => {
                            m.ops.route_pruned = m.ops.route_pruned.saturating_add(1);
                        }
                        RouteKind::Broadcast => {
                            m.ops.route_broadcast = m.ops.route_broadcast.saturating_add(1);
                        }
                        RouteKind::Direct => {
                            m.ops.route_direct = m.ops.route_direct.saturating_add(1);
                        }
                    }

                    let entry = m.tables.entry(table.to_string()).or_default();
                    entry.routes = entry.routes.saturating_add(1);
                    if kind == RouteKind::Broadcast {
                        entry.broadcasts = entry.broadcasts.saturating_add(1);
                    }
                });
            }

            MetricsEvent::FanOutStart {
                table,
                partitions,
                parallel,
            } => {
                metrics::with_state_mut(|m| {
                    m.ops.fanout_calls = m.ops.fanout_calls.saturating_add(1);
                    if parallel {
                        m.ops.fanout_parallel = m.ops.fanout_parallel.saturating_add(1);
                    }
                    m.ops.partitions_touched = m.ops.partitions_touched.saturating_add(partitions);

                    let entry = m.tables.entry(table.to_string()).or_default();
                    entry.fanout_calls = entry.fanout_calls.saturating_add(1);
                    entry.partitions_touched = entry.partitions_touched.saturating_add(partitions);
                });
            }

            MetricsEvent::FanOutFinish { table, rows, .. } => {
                metrics::with_state_mut(|m| {
                    m.ops.rows_returned = m.ops.rows_returned.saturating_add(rows);
                    let entry = m.tables.entry(table.to_string()).or_default();
                    entry.rows_returned = entry.rows_returned.saturating_add(rows);
                });
            }

            MetricsEvent::CacheInvalidate {
                table,
                buckets_cleared,
            } => {
                metrics::with_state_mut(|m| {
                    m.ops.cache_invalidations = m.ops.cache_invalidations.saturating_add(1);
                    m.ops.cache_buckets_cleared =
                        m.ops.cache_buckets_cleared.saturating_add(buckets_cleared);
                    let entry = m.tables.entry(table.to_string()).or_default();
                    entry.cache_invalidations = entry.cache_invalidations.saturating_add(1);
                });
            }
        }
    }
}

pub(crate) const GLOBAL_METRICS_SINK: GlobalMetricsSink = GlobalMetricsSink;

pub(crate) fn record(event: MetricsEvent<'_>) {
    let override_ptr = SINK_OVERRIDE.with(|cell| *cell.borrow());
    if let Some(ptr) = override_ptr {
        // SAFETY:
        // - `ptr` was produced from a valid `&dyn MetricsSink` in `with_metrics_sink`,
        //   which restores the previous pointer on every exit (including unwind)
        //   through `Guard::drop`.
        // - `record` is synchronous and never stores `ptr` beyond this call.
        // - Only a shared reference is materialized, matching the original borrow.
        unsafe { (&*ptr).record(event) };
    } else {
        GLOBAL_METRICS_SINK.record(event);
    }
}

/// Snapshot the current metrics state.
///
/// `window_start_ms` filters by window start (`EventState::window_start_ms`),
/// not by per-event timestamps.
#[must_use]
pub fn metrics_report(window_start_ms: Option<u64>) -> metrics::EventReport {
    metrics::report_window_start(window_start_ms)
}

/// Reset all metrics state on the calling thread.
pub fn metrics_reset_all() {
    metrics::reset_all();
}

/// Run a closure with a temporary metrics sink override for the calling
/// thread. Events are recorded on the thread that drives routing and
/// fan-out, never on pool workers, so the override sees every event.
pub fn with_metrics_sink<T>(sink: &dyn MetricsSink, f: impl FnOnce() -> T) -> T {
    struct Guard(Option<*const dyn MetricsSink>);

    impl Drop for Guard {
        fn drop(&mut self) {
            SINK_OVERRIDE.with(|cell| {
                *cell.borrow_mut() = self.0;
            });
        }
    }

    // SAFETY:
    // - `sink_ptr` is installed only for this dynamic scope and `Guard`
    //   restores the previous slot on all exits, including panic.
    // - `record` only dereferences synchronously and never persists `sink_ptr`.
    let sink_ptr = unsafe { std::mem::transmute::<&dyn MetricsSink, *const dyn MetricsSink>(sink) };
    let prev = SINK_OVERRIDE.with(|cell| {
        let mut slot = cell.borrow_mut();
        slot.replace(sink_ptr)
    });
    let _guard = Guard(prev);

    f()
}

///
/// FanOutSpan
/// RAII guard that emits start/finish events for one fan-out.
/// Ensures finish accounting happens even when a partition fails.
///

pub(crate) struct FanOutSpan<'a> {
    table: &'a str,
    partitions: u64,
    parallel: bool,
    rows: u64,
}

impl<'a> FanOutSpan<'a> {
    #[must_use]
    pub(crate) fn new(table: &'a str, partitions: usize, parallel: bool) -> Self {
        let partitions = u64::try_from(partitions).unwrap_or(u64::MAX);
        record(MetricsEvent::FanOutStart {
            table,
            partitions,
            parallel,
        });

        Self {
            table,
            partitions,
            parallel,
            rows: 0,
        }
    }

    pub(crate) const fn set_rows(&mut self, rows: u64) {
        self.rows = rows;
    }
}

impl Drop for FanOutSpan<'_> {
    fn drop(&mut self) {
        record(MetricsEvent::FanOutFinish {
            table: self.table,
            partitions: self.partitions,
            parallel: self.parallel,
            rows: self.rows,
        });
    }
}

///
/// TESTS
///
