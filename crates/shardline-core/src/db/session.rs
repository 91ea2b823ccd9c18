//! One caller's view of the sharded database: routing, fan-out and a
//! private result cache.

use crate::{
    db::{
        cache::{CacheKey, CacheStatsSnapshot, KeyDimension, SessionCache, WriteEvent},
        executor::{FanOutExecutor, PlanOutput, Row, StatementExecutor},
        plan::{build_count_plan, build_plan},
        route::{Route, Router, StatementContext},
    },
    error::InternalError,
    sql::{SelectBody, Statement},
    value::Value,
};
use shardline_config::ShardlineConfig;
use std::sync::Arc;
use tracing::debug;

///
/// ShardSession
///
/// Owns its cache; the router, worker pool and statement executor are
/// shared with every other session.
///

pub struct ShardSession {
    router: Router,
    fanout: FanOutExecutor,
    executor: Arc<dyn StatementExecutor>,
    cache: SessionCache<Row>,
    default_database: String,
}

impl ShardSession {
    #[must_use]
    pub fn new(
        router: Router,
        fanout: FanOutExecutor,
        executor: Arc<dyn StatementExecutor>,
        config: &ShardlineConfig,
    ) -> Self {
        Self {
            router,
            fanout,
            executor,
            cache: SessionCache::new(&config.cache),
            default_database: config.session.default_database.clone(),
        }
    }

    /// Run a select, answering from the cache when the same predicate and
    /// values were loaded before.
    pub fn select(
        &mut self,
        statement: Statement,
        values: Vec<Value>,
    ) -> Result<Vec<Row>, InternalError> {
        let ctx = self.router.bind(statement, values)?;
        if ctx.statement.kind().is_write() {
            return Err(InternalError::plan_invariant(
                "select called with a write statement",
            ));
        }

        let key = self.cache_key(&ctx);
        if let Some(key) = &key
            && let Some(rows) = self.cache.load(key)
        {
            return Ok(rows.to_vec());
        }

        let route = self.route_or_direct(&ctx)?;
        let plan = build_plan(&ctx, &route)?;
        let rows = self
            .fanout
            .execute(&plan, self.executor.as_ref())?
            .into_rows()?;

        if let Some(key) = key {
            self.cache.on_load(key, &rows);
        }

        Ok(rows)
    }

    /// Count the rows a select would return. Counts are never cached.
    pub fn count(&self, statement: Statement, values: Vec<Value>) -> Result<u64, InternalError> {
        let ctx = self.router.bind(statement, values)?;
        let route = self.route_or_direct(&ctx)?;
        let plan = build_count_plan(&ctx, &route)?;

        self.fanout
            .execute(&plan, self.executor.as_ref())?
            .into_total()
    }

    /// Run a write and invalidate what it may have changed. Returns the
    /// affected row count summed over partitions.
    pub fn execute(
        &mut self,
        statement: Statement,
        values: Vec<Value>,
    ) -> Result<u64, InternalError> {
        let ctx = self.router.bind(statement, values)?;
        if !ctx.statement.kind().is_write() {
            return Err(InternalError::plan_invariant(
                "execute called with a select statement",
            ));
        }

        let route = self.route_or_direct(&ctx)?;
        let plan = build_plan(&ctx, &route)?;
        let outcome = self
            .fanout
            .execute(&plan, self.executor.as_ref())
            .and_then(PlanOutput::into_total);
        let affected = match outcome {
            Ok(affected) => affected,
            Err(err) => {
                // partitions that ran before the failure keep their writes
                let table = ctx.table_name();
                let cleared = self.cache.evict_table(&table);
                debug!(table = %table, buckets_cleared = cleared, "write failed, cache cleared");

                return Err(err);
            }
        };

        if let Some(event) = self.write_event(&ctx) {
            self.cache.on_write(event);
        }

        Ok(affected)
    }

    #[must_use]
    pub const fn cache(&self) -> &SessionCache<Row> {
        &self.cache
    }

    pub const fn cache_mut(&mut self) -> &mut SessionCache<Row> {
        &mut self.cache
    }

    #[must_use]
    pub fn cache_stats(&self) -> CacheStatsSnapshot {
        self.cache.stats()
    }

    #[must_use]
    pub const fn router(&self) -> &Router {
        &self.router
    }

    // Only single-table plain selects are cached.
    fn cache_key(&self, ctx: &StatementContext) -> Option<CacheKey> {
        let Statement::Select(SelectBody::Plain(select)) = &ctx.statement else {
            return None;
        };
        select.table()?;

        Some(CacheKey::new(
            ctx.table_name(),
            KeyDimension::for_select(select, self.cache.dialect()),
            ctx.params.values_for(&ctx.statement),
        ))
    }

    fn route_or_direct(&self, ctx: &StatementContext) -> Result<Route, InternalError> {
        if let Some(route) = self.router.route(ctx)? {
            return Ok(route);
        }

        let table = ctx.table_name();
        let (database, physical) = match &ctx.model {
            Some(model) => (model.database.as_str(), model.table.clone()),
            None => (self.default_database.as_str(), table.clone()),
        };
        debug!(table = %table, database, "direct route");
        Router::record_direct(&table);

        Ok(Route::direct(database, physical))
    }

    // Inserts carry no point identity here: the model has no primary key.
    fn write_event(&self, ctx: &StatementContext) -> Option<WriteEvent<Row>> {
        let table = ctx.table_name();

        let event = match &ctx.statement {
            Statement::Select(_) => return None,
            Statement::Truncate(_) => WriteEvent::Truncate { table },
            Statement::Insert(_) => WriteEvent::Insert {
                table,
                identity: None,
            },
            Statement::Update(_) | Statement::Delete(_) => {
                let predicate = ctx.statement.where_clause();
                let dimension = KeyDimension::for_predicate(predicate, self.cache.dialect());
                let params = predicate
                    .map(|expr| ctx.params.values_in(expr))
                    .unwrap_or_default();

                if matches!(ctx.statement, Statement::Delete(_)) {
                    WriteEvent::Delete {
                        table,
                        dimension,
                        params,
                    }
                } else {
                    WriteEvent::Update {
                        table,
                        dimension,
                        params,
                    }
                }
            }
        };

        Some(event)
    }
}

///
/// TESTS
///
