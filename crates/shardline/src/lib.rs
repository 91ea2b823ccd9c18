//! ## Crate layout
//! - `config`: TOML configuration for executors, caches and sessions.
//! - `core`: routing, planning, fan-out execution and the session cache.
//!
//! [`Shardline`] holds everything sessions share (catalog, shard resolver,
//! worker pool, statement executor) and hands out one [`ShardSession`] per
//! caller.

pub use shardline_config as config;
pub use shardline_core as core;

use shardline_config::{ConfigError, ShardlineConfig};
use shardline_core::{
    db::{FanOutExecutor, Router, ShardResolver, ShardSession, StatementExecutor},
    error::InternalError,
    model::Catalog,
};
use std::{path::Path, sync::Arc};
use thiserror::Error as ThisError;
use tracing::info;

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

///
/// Error
///

#[derive(Debug, ThisError)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Internal(#[from] InternalError),
}

///
/// Shardline
///

#[derive(Clone)]
pub struct Shardline {
    config: ShardlineConfig,
    router: Router,
    fanout: FanOutExecutor,
    executor: Arc<dyn StatementExecutor>,
}

impl Shardline {
    /// Validate `config` and build the shared worker pool.
    pub fn new(
        config: ShardlineConfig,
        catalog: Catalog,
        resolver: Arc<dyn ShardResolver>,
        executor: Arc<dyn StatementExecutor>,
    ) -> Result<Self, Error> {
        config.validate()?;
        let fanout = FanOutExecutor::from_config(&config.executor)?;
        info!(
            tables = catalog.iter().count(),
            parallel_threshold = fanout.parallel_threshold(),
            "shardline ready"
        );

        Ok(Self {
            router: Router::new(Arc::new(catalog), resolver),
            fanout,
            executor,
            config,
        })
    }

    /// Like [`Shardline::new`], reading the configuration from a TOML file.
    pub fn from_config_file(
        path: impl AsRef<Path>,
        catalog: Catalog,
        resolver: Arc<dyn ShardResolver>,
        executor: Arc<dyn StatementExecutor>,
    ) -> Result<Self, Error> {
        let config = ShardlineConfig::load(path)?;

        Self::new(config, catalog, resolver, executor)
    }

    /// A new session with an empty cache.
    #[must_use]
    pub fn session(&self) -> ShardSession {
        ShardSession::new(
            self.router.clone(),
            self.fanout.clone(),
            Arc::clone(&self.executor),
            &self.config,
        )
    }

    #[must_use]
    pub const fn config(&self) -> &ShardlineConfig {
        &self.config
    }

    #[must_use]
    pub const fn router(&self) -> &Router {
        &self.router
    }
}

///
/// Prelude
///

pub mod prelude {
    pub use crate::{Error, Shardline};
    pub use shardline_config::ShardlineConfig;
    pub use shardline_core::{
        db::{Bucket, BucketShardMap, Row, ShardSession, StatementExecutor},
        prelude::*,
    };
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use shardline_core::{
        db::{Bucket, BucketShardMap, Row},
        model::TableModel,
        sql::{Expr, PlainSelect, Statement, TableRef},
        value::Value,
    };

    struct Fixed;

    impl StatementExecutor for Fixed {
        fn query(
            &self,
            database: &str,
            _statement: &Statement,
            _params: &[Value],
        ) -> Result<Vec<Row>, InternalError> {
            let columns: Arc<[String]> = Arc::from(vec!["db".to_string()]);
            Ok(vec![Row::new(columns, vec![Value::from(database)])])
        }

        fn count(
            &self,
            _database: &str,
            _statement: &Statement,
            _params: &[Value],
        ) -> Result<u64, InternalError> {
            Ok(2)
        }

        fn update(
            &self,
            _database: &str,
            _statement: &Statement,
            _params: &[Value],
        ) -> Result<u64, InternalError> {
            Ok(1)
        }
    }

    fn shardline(config: ShardlineConfig) -> Result<Shardline, Error> {
        let mut catalog = Catalog::new();
        catalog.register(
            TableModel::new("users", "db0")
                .field("region", "REGION")
                .partition_key("region", "region_mod2"),
        );
        let resolver = (0..2u64).fold(BucketShardMap::new(), |map, i| {
            map.partition(
                "users",
                format!("db{i}"),
                format!("users_{i}"),
                [(
                    "region",
                    Bucket::Modulo {
                        modulus: 2,
                        remainder: i,
                    },
                )],
            )
        });

        Shardline::new(config, catalog, Arc::new(resolver), Arc::new(Fixed))
    }

    #[test]
    fn sessions_share_routing_but_not_caches() {
        let shardline = shardline(ShardlineConfig::default()).expect("valid setup");
        let statement = Statement::select(
            PlainSelect::from_table(TableRef::new("users"))
                .filter(Expr::eq(Expr::col("region"), Expr::param())),
        );

        let mut first = shardline.session();
        let rows = first
            .select(statement.clone(), vec![Value::from(3)])
            .expect("select");
        assert_eq!(rows[0].get("db"), Some(&Value::from("db1")));
        first
            .select(statement.clone(), vec![Value::from(3)])
            .expect("select");
        assert_eq!(first.cache_stats().hits, 1);

        let mut second = shardline.session();
        second
            .select(statement, vec![Value::from(3)])
            .expect("select");
        assert_eq!(second.cache_stats().hits, 0);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = ShardlineConfig::default();
        config.executor.parallel_threshold = 0;

        assert!(matches!(shardline(config), Err(Error::Config(_))));
    }
}
