//! Fan-out execution of plans against partition databases.
//!
//! Plans touching at least `parallel_threshold` partitions run one task per
//! partition on a shared rayon pool and the caller blocks until the group
//! finishes; smaller plans run sequentially on the caller. The first failure
//! aborts the plan and is returned unchanged. Partitions that already
//! committed are not compensated.

mod merge;


use crate::{
    db::plan::{AggregateMode, ExecutionPlan, PlanEntry},
    error::InternalError,
    obs::sink::FanOutSpan,
    sql::Statement,
    value::Value,
};
use rayon::{ThreadPool, ThreadPoolBuilder, prelude::*};
use shardline_config::ExecutorConfig;
use std::sync::Arc;
use tracing::debug;

///
/// Row
///
/// One result row; column names are shared by every row of a result set.
///

#[derive(Clone, Debug, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    #[must_use]
    pub const fn new(columns: Arc<[String]>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Value of a column, matched case-insensitively.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(column))
            .and_then(|i| self.values.get(i))
    }
}

///
/// StatementExecutor
///
/// Runs one rewritten statement against one database. Implementations own
/// connections and transactions; errors come back to the caller unchanged.
///

pub trait StatementExecutor: Send + Sync {
    fn query(
        &self,
        database: &str,
        statement: &Statement,
        params: &[Value],
    ) -> Result<Vec<Row>, InternalError>;

    fn count(
        &self,
        database: &str,
        statement: &Statement,
        params: &[Value],
    ) -> Result<u64, InternalError>;

    fn update(
        &self,
        database: &str,
        statement: &Statement,
        params: &[Value],
    ) -> Result<u64, InternalError>;
}

///
/// PlanOutput
///

#[derive(Clone, Debug, PartialEq)]
pub enum PlanOutput {
    Rows(Vec<Row>),
    Count(u64),
    Affected(u64),
}

impl PlanOutput {
    pub fn into_rows(self) -> Result<Vec<Row>, InternalError> {
        match self {
            Self::Rows(rows) => Ok(rows),
            Self::Count(_) | Self::Affected(_) => Err(InternalError::executor_invariant(
                "plan did not produce rows",
            )),
        }
    }

    /// Count or affected-row total.
    pub fn into_total(self) -> Result<u64, InternalError> {
        match self {
            Self::Count(n) | Self::Affected(n) => Ok(n),
            Self::Rows(_) => Err(InternalError::executor_invariant(
                "plan produced rows, not a total",
            )),
        }
    }
}

// Per-partition result, before aggregation.
enum EntryOutput {
    Streams(Vec<Vec<Row>>),
    Total(u64),
}

///
/// FanOutExecutor
///

#[derive(Clone)]
pub struct FanOutExecutor {
    pool: Arc<ThreadPool>,
    parallel_threshold: usize,
}

impl FanOutExecutor {
    #[must_use]
    pub fn new(pool: Arc<ThreadPool>, parallel_threshold: usize) -> Self {
        Self {
            pool,
            parallel_threshold: parallel_threshold.max(1),
        }
    }

    /// Build an executor with its own worker pool.
    pub fn from_config(config: &ExecutorConfig) -> Result<Self, InternalError> {
        let mut builder = ThreadPoolBuilder::new().thread_name(|i| format!("shardline-fanout-{i}"));
        if let Some(threads) = config.worker_threads {
            builder = builder.num_threads(threads);
        }
        let pool = builder.build().map_err(|err| {
            InternalError::executor_internal(format!("failed to build worker pool: {err}"))
        })?;

        Ok(Self::new(Arc::new(pool), config.parallel_threshold))
    }

    #[must_use]
    pub const fn parallel_threshold(&self) -> usize {
        self.parallel_threshold
    }

    /// Execute every entry of `plan` and aggregate per its mode.
    pub fn execute(
        &self,
        plan: &ExecutionPlan,
        executor: &dyn StatementExecutor,
    ) -> Result<PlanOutput, InternalError> {
        let parallel = plan.partition_count() >= self.parallel_threshold;
        let mut span = FanOutSpan::new(&plan.table, plan.partition_count(), parallel);
        debug!(
            table = %plan.table,
            partitions = plan.partition_count(),
            statements = plan.statement_count(),
            parallel,
            "fan-out start"
        );

        let run = |entry: &PlanEntry| run_entry(entry, plan, executor);
        let outputs = if parallel {
            self.pool
                .install(|| plan.entries.par_iter().map(run).collect::<Result<Vec<_>, _>>())?
        } else {
            plan.entries.iter().map(run).collect::<Result<Vec<_>, _>>()?
        };

        let output = aggregate(plan, outputs);
        span.set_rows(match &output {
            PlanOutput::Rows(rows) => u64::try_from(rows.len()).unwrap_or(u64::MAX),
            PlanOutput::Count(n) | PlanOutput::Affected(n) => *n,
        });

        Ok(output)
    }
}

// One partition: its statements run in order on the same task.
fn run_entry(
    entry: &PlanEntry,
    plan: &ExecutionPlan,
    executor: &dyn StatementExecutor,
) -> Result<EntryOutput, InternalError> {
    let database = entry.target.database.as_str();

    match plan.mode {
        AggregateMode::UnionRows => entry
            .statements
            .iter()
            .map(|(_, statement)| executor.query(database, statement, &plan.params))
            .collect::<Result<Vec<_>, _>>()
            .map(EntryOutput::Streams),
        AggregateMode::Sum => {
            let mut total = 0u64;
            for (_, statement) in &entry.statements {
                total = total.saturating_add(executor.count(database, statement, &plan.params)?);
            }
            Ok(EntryOutput::Total(total))
        }
        AggregateMode::SumAffectedRows => {
            let mut total = 0u64;
            for (_, statement) in &entry.statements {
                total = total.saturating_add(executor.update(database, statement, &plan.params)?);
            }
            Ok(EntryOutput::Total(total))
        }
    }
}

fn aggregate(plan: &ExecutionPlan, outputs: Vec<EntryOutput>) -> PlanOutput {
    match plan.mode {
        AggregateMode::UnionRows => {
            let streams: Vec<Vec<Row>> = outputs
                .into_iter()
                .flat_map(|output| match output {
                    EntryOutput::Streams(streams) => streams,
                    EntryOutput::Total(_) => Vec::new(),
                })
                .collect();

            let rows = if plan.order.is_empty() {
                streams.into_iter().flatten().collect()
            } else {
                merge::merge_sorted(streams, &plan.order)
            };

            PlanOutput::Rows(match plan.window {
                Some(window) => merge::apply_window(rows, window),
                None => rows,
            })
        }
        AggregateMode::Sum | AggregateMode::SumAffectedRows => {
            let total = outputs
                .iter()
                .map(|output| match output {
                    EntryOutput::Total(n) => *n,
                    EntryOutput::Streams(_) => 0,
                })
                .fold(0u64, u64::saturating_add);

            if plan.mode == AggregateMode::Sum {
                PlanOutput::Count(total)
            } else {
                PlanOutput::Affected(total)
            }
        }
    }
}
