//! Core runtime for shardline: partition routing over parsed statements,
//! execution plans, parallel fan-out and a session-scoped result cache.
#![warn(unreachable_pub)]

// public exports are one module level down
pub mod db;
pub mod error;
pub mod model;
pub mod obs;
pub mod sql;
pub mod value;

// test
#[cfg(test)]
pub(crate) mod test_support;

///
/// Prelude
///
/// Prelude contains only domain vocabulary: statements, values, models.
/// No executors, caches or errors are re-exported here.
///

pub mod prelude {
    pub use crate::{
        model::{Catalog, TableModel},
        sql::{Expr, PlainSelect, Statement, TableRef},
        value::Value,
    };
}
