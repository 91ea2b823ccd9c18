//! Observability: runtime telemetry (metrics) and sink abstractions.
//!
//! Routing, fan-out and cache code never touch metrics state directly;
//! everything flows through [`MetricsEvent`] and [`MetricsSink`].

pub(crate) mod metrics;
pub(crate) mod sink;

// re-exports
pub use metrics::{EventOps, EventReport, EventState, TableCounters, TableSummary};
pub use sink::{
    MetricsEvent, MetricsSink, RouteKind, metrics_report, metrics_reset_all, with_metrics_sink,
};
