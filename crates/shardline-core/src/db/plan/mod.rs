//! Execution plans: one rewritten statement per physical table, grouped by
//! database, plus how partition results combine.

mod builder;
mod rewrite;

#[cfg(test)]
mod tests;

use crate::{
    db::route::PartitionResult,
    sql::{Statement, StatementKind},
    value::Value,
};

// re-exports
pub use builder::{build_count_plan, build_plan};

///
/// AggregateMode
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AggregateMode {
    /// Concatenate (or order-merge) row sets.
    UnionRows,
    /// Add per-partition counts.
    Sum,
    /// Add per-partition affected-row counts.
    SumAffectedRows,
}

///
/// OrderKey
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OrderKey {
    pub column: String,
    pub desc: bool,
}

///
/// RowWindow
///
/// Client-side offset/limit applied after partition rows are merged.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct RowWindow {
    pub offset: u64,
    pub limit: Option<u64>,
}

///
/// PlanEntry
///
/// Work for one database: `(physical table, statement)` pairs.
///

#[derive(Clone, Debug, PartialEq)]
pub struct PlanEntry {
    pub target: PartitionResult,
    pub statements: Vec<(String, Statement)>,
}

///
/// ExecutionPlan
///

#[derive(Clone, Debug, PartialEq)]
pub struct ExecutionPlan {
    pub table: String,
    pub kind: StatementKind,
    pub mode: AggregateMode,
    pub entries: Vec<PlanEntry>,
    pub params: Vec<Value>,
    pub order: Vec<OrderKey>,
    pub window: Option<RowWindow>,
}

impl ExecutionPlan {
    #[must_use]
    pub const fn partition_count(&self) -> usize {
        self.entries.len()
    }

    /// Total number of physical statements across every entry.
    #[must_use]
    pub fn statement_count(&self) -> usize {
        self.entries.iter().map(|e| e.statements.len()).sum()
    }
}
