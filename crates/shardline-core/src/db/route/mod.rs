//! Partition routing: bind parameters, collect dimensions, resolve
//! partitions.

mod bucket;
mod collect;
mod params;
mod resolve;

#[cfg(test)]
mod tests;

use crate::{
    error::InternalError,
    model::{Catalog, TableModel},
    obs::{MetricsEvent, RouteKind, sink::record},
    sql::{SelectBody, Statement},
    value::Value,
};
use std::sync::Arc;
use tracing::trace;

// re-exports
pub use bucket::{Bucket, BucketPartition, BucketShardMap};
pub use collect::collect;
pub use params::BoundParams;
pub use resolve::{PartitionResult, Route, ShardResolver, resolve_partitions};

///
/// ModificationPoint
///
/// Position of a partition-key value written by an insert (column list
/// index) or an update (`SET` list index).
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ModificationPoint {
    pub field: String,
    pub position: usize,
}

///
/// StatementContext
///
/// A statement with its parameter slots stamped and bound, plus the model
/// of the table it targets (when registered).
///

#[derive(Clone, Debug)]
pub struct StatementContext {
    pub statement: Statement,
    pub model: Option<Arc<TableModel>>,
    pub params: BoundParams,
    pub modification_points: Vec<ModificationPoint>,
}

impl StatementContext {
    /// Logical table name used for metrics and cache keys.
    #[must_use]
    pub fn table_name(&self) -> String {
        match (&self.model, self.statement.target_table()) {
            (Some(model), _) => model.name.clone(),
            (None, Some(table)) => table.name.clone(),
            (None, None) => String::new(),
        }
    }

    #[must_use]
    pub fn is_partitioned(&self) -> bool {
        self.model.as_ref().is_some_and(|m| m.is_partitioned())
    }
}

///
/// Router
///
/// Shared, read-only routing front end over a catalog and a shard resolver.
///

#[derive(Clone)]
pub struct Router {
    catalog: Arc<Catalog>,
    resolver: Arc<dyn ShardResolver>,
}

impl Router {
    #[must_use]
    pub fn new(catalog: Arc<Catalog>, resolver: Arc<dyn ShardResolver>) -> Self {
        Self { catalog, resolver }
    }

    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Reconcile `values` with the statement's parameter slots and attach
    /// the target table model.
    pub fn bind(
        &self,
        mut statement: Statement,
        values: Vec<Value>,
    ) -> Result<StatementContext, InternalError> {
        let params = BoundParams::bind(&mut statement, values)?;
        let model = self.model_for(&statement)?;
        let modification_points = match &model {
            Some(model) if model.is_partitioned() => modification_points(&statement, model)?,
            _ => Vec::new(),
        };

        Ok(StatementContext {
            statement,
            model,
            params,
            modification_points,
        })
    }

    /// Route a bound statement. `None` when the table is not partitioned
    /// (or not registered); such statements run on one database directly.
    pub fn route(&self, ctx: &StatementContext) -> Result<Option<Route>, InternalError> {
        let Some(model) = ctx.model.as_ref().filter(|m| m.is_partitioned()) else {
            return Ok(None);
        };

        let dimensions = collect(ctx)?;
        let route = resolve_partitions(self.resolver.as_ref(), model, dimensions)?;

        trace!(
            table = %model.name,
            kind = ?route.kind,
            partitions = route.partitions.len(),
            "statement routed"
        );
        record(MetricsEvent::Route {
            table: &model.name,
            kind: route.kind,
            partitions: u64::try_from(route.partitions.len()).unwrap_or(u64::MAX),
        });

        Ok(Some(route))
    }

    /// Record a direct (unpartitioned) route for metrics.
    pub(crate) fn record_direct(table: &str) {
        record(MetricsEvent::Route {
            table,
            kind: RouteKind::Direct,
            partitions: 1,
        });
    }

    fn model_for(&self, statement: &Statement) -> Result<Option<Arc<TableModel>>, InternalError> {
        if let Statement::Select(SelectBody::Union { selects, .. }) = statement {
            let partitioned = selects
                .iter()
                .filter_map(|s| s.table())
                .filter_map(|t| self.catalog.resolve(t))
                .any(|m| m.is_partitioned());
            if partitioned {
                return Err(InternalError::unroutable(
                    "union selects over partitioned tables are not supported",
                ));
            }

            return Ok(None);
        }

        Ok(statement
            .target_table()
            .and_then(|table| self.catalog.resolve(table))
            .cloned())
    }
}

fn modification_points(
    statement: &Statement,
    model: &TableModel,
) -> Result<Vec<ModificationPoint>, InternalError> {
    let columns = model.partition_columns()?;
    let written: Vec<&str> = match statement {
        Statement::Insert(insert) => insert.columns.iter().map(|c| c.name.as_str()).collect(),
        Statement::Update(update) => update.sets.iter().map(|(c, _)| c.name.as_str()).collect(),
        Statement::Select(_) | Statement::Delete(_) | Statement::Truncate(_) => Vec::new(),
    };

    Ok(written
        .into_iter()
        .enumerate()
        .filter_map(|(position, column)| {
            columns.field_for(column).map(|field| ModificationPoint {
                field: field.to_string(),
                position,
            })
        })
        .collect())
}
