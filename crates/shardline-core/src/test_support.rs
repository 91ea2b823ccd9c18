//! Shared fixtures: an `orders` table split over four shard databases by
//! `tenant_id mod 4`, an unpartitioned `audit` table, and an in-memory
//! statement executor.

use crate::{
    db::{
        executor::{Row, StatementExecutor},
        route::{Bucket, BucketShardMap, Router},
    },
    error::InternalError,
    model::{Catalog, TableModel},
    sql::{Expr, PlainSelect, Statement, TableRef},
    value::Value,
};
use std::{
    collections::{BTreeMap, BTreeSet},
    sync::{Arc, Mutex},
};

pub(crate) fn orders_model() -> TableModel {
    TableModel::new("orders", "shard0")
        .field("id", "ID")
        .field("tenant", "TENANT_ID")
        .field("status", "STATUS")
        .field("name", "NAME")
        .partition_key("tenant", "tenant_mod4")
}

pub(crate) fn audit_model() -> TableModel {
    TableModel::new("audit", "main")
        .physical_table("audit_log")
        .field("id", "ID")
}

pub(crate) fn orders_shard_map() -> BucketShardMap {
    (0..4u64).fold(BucketShardMap::new(), |map, i| {
        map.partition(
            "orders",
            format!("shard{i}"),
            format!("orders_{i}"),
            [(
                "tenant",
                Bucket::Modulo {
                    modulus: 4,
                    remainder: i,
                },
            )],
        )
    })
}

pub(crate) fn catalog() -> Catalog {
    let mut catalog = Catalog::new();
    catalog.register(orders_model());
    catalog.register(audit_model());
    catalog
}

pub(crate) fn router() -> Router {
    Router::new(Arc::new(catalog()), Arc::new(orders_shard_map()))
}

pub(crate) fn select_orders(predicate: Expr) -> Statement {
    Statement::select(PlainSelect::from_table(TableRef::new("orders")).filter(predicate))
}

pub(crate) fn tenant_is(value: i64) -> Expr {
    Expr::eq(Expr::col("tenant_id"), Expr::lit(value))
}

pub(crate) fn rows(columns: &[&str], data: Vec<Vec<Value>>) -> Vec<Row> {
    let columns: Arc<[String]> = columns.iter().map(|c| (*c).to_string()).collect();
    data.into_iter()
        .map(|values| Row::new(Arc::clone(&columns), values))
        .collect()
}

///
/// MemoryExecutor
///
/// Serves fixed rows per database, counts them, and records every call.
/// Databases marked failing return a partition failure.
///

#[derive(Default)]
pub(crate) struct MemoryExecutor {
    rows: BTreeMap<String, Vec<Row>>,
    failing: BTreeSet<String>,
    affected: u64,
    calls: Mutex<Vec<String>>,
    committed: Mutex<Vec<String>>,
}

impl MemoryExecutor {
    pub(crate) fn new() -> Self {
        Self {
            affected: 1,
            ..Self::default()
        }
    }

    pub(crate) fn with_rows(mut self, database: &str, rows: Vec<Row>) -> Self {
        self.rows.insert(database.to_string(), rows);
        self
    }

    pub(crate) fn failing_on(mut self, database: &str) -> Self {
        self.failing.insert(database.to_string());
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub(crate) fn committed(&self) -> Vec<String> {
        self.committed.lock().expect("committed lock").clone()
    }

    fn log(&self, op: &str, database: &str, statement: &Statement) -> Result<(), InternalError> {
        self.calls
            .lock()
            .expect("calls lock")
            .push(format!("{op} {database}: {statement}"));

        if self.failing.contains(database) {
            return Err(InternalError::partition_failure(database, "connection reset"));
        }

        Ok(())
    }
}

impl StatementExecutor for MemoryExecutor {
    fn query(
        &self,
        database: &str,
        statement: &Statement,
        _params: &[Value],
    ) -> Result<Vec<Row>, InternalError> {
        self.log("query", database, statement)?;

        Ok(self.rows.get(database).cloned().unwrap_or_default())
    }

    fn count(
        &self,
        database: &str,
        statement: &Statement,
        _params: &[Value],
    ) -> Result<u64, InternalError> {
        self.log("count", database, statement)?;

        Ok(self.rows.get(database).map_or(0, |r| r.len() as u64))
    }

    fn update(
        &self,
        database: &str,
        statement: &Statement,
        _params: &[Value],
    ) -> Result<u64, InternalError> {
        self.log("update", database, statement)?;
        self.committed
            .lock()
            .expect("committed lock")
            .push(database.to_string());

        Ok(self.affected)
    }
}
