//! Routing, planning, execution and caching over partitioned tables.

pub mod cache;
pub mod dimension;
pub mod executor;
pub mod plan;
pub mod route;
pub mod session;

// re-exports
pub use cache::{
    CacheKey, CacheStats, CacheStatsSnapshot, DimCache, KeyDimension, PointIdentity, SessionCache,
    WriteEvent,
};
pub use dimension::{Dimension, DimensionMap};
pub use executor::{FanOutExecutor, PlanOutput, Row, StatementExecutor};
pub use plan::{AggregateMode, ExecutionPlan, PlanEntry};
pub use route::{
    BoundParams, Bucket, BucketShardMap, PartitionResult, Route, Router, ShardResolver,
    StatementContext,
};
pub use session::ShardSession;
