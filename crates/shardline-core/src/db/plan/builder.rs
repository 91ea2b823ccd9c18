use crate::{
    db::{
        plan::{AggregateMode, ExecutionPlan, OrderKey, PlanEntry, RowWindow, rewrite::substitute_table},
        route::{Route, StatementContext},
    },
    error::InternalError,
    sql::{Expr, FromItem, Limit, PlainSelect, SelectBody, SelectItem, Statement, StatementKind},
};

///
/// Plan building
///
/// Every entry runs the same statement shape with the target table
/// substituted per physical table. Selects spanning several tables push an
/// enlarged limit down and keep the caller's window for the client side.
///

pub fn build_plan(ctx: &StatementContext, route: &Route) -> Result<ExecutionPlan, InternalError> {
    ensure_targets(route)?;

    let kind = ctx.statement.kind();
    let spans_tables = table_count(route) > 1;

    let (statement, order, window) = match &ctx.statement {
        Statement::Select(SelectBody::Plain(select)) if spans_tables => {
            let (select, order, window) = distribute_select(select);
            (Statement::select(select), order, window)
        }
        other => (other.clone(), Vec::new(), None),
    };

    let mode = match kind {
        StatementKind::Select => AggregateMode::UnionRows,
        StatementKind::Insert
        | StatementKind::Update
        | StatementKind::Delete
        | StatementKind::Truncate => AggregateMode::SumAffectedRows,
    };

    Ok(ExecutionPlan {
        table: ctx.table_name(),
        kind,
        mode,
        entries: entries(ctx, route, &statement),
        params: ctx.params.values_for(&statement),
        order,
        window,
    })
}

/// Plan counting the rows a select would return.
///
/// `DISTINCT` and `GROUP BY` cannot be summed across tables and are only
/// counted when the route holds a single table.
pub fn build_count_plan(
    ctx: &StatementContext,
    route: &Route,
) -> Result<ExecutionPlan, InternalError> {
    ensure_targets(route)?;

    let Statement::Select(body) = &ctx.statement else {
        return Err(InternalError::plan_invariant(
            "count plans can only be built for selects",
        ));
    };
    let spans_tables = table_count(route) > 1;

    let count = match body {
        SelectBody::Plain(select) => {
            if spans_tables && select.distinct {
                return Err(InternalError::unsupported_aggregate(
                    "count over a distinct select spanning several partitions",
                ));
            }
            if spans_tables && !select.group_by.is_empty() {
                return Err(InternalError::unsupported_aggregate(
                    "count over a grouped select spanning several partitions",
                ));
            }
            count_select(select)
        }
        SelectBody::Union { .. } => wrap_count(body.clone()),
    };
    let statement = Statement::select(count);

    Ok(ExecutionPlan {
        table: ctx.table_name(),
        kind: StatementKind::Select,
        mode: AggregateMode::Sum,
        entries: entries(ctx, route, &statement),
        params: ctx.params.values_for(&statement),
        order: Vec::new(),
        window: None,
    })
}

fn ensure_targets(route: &Route) -> Result<(), InternalError> {
    if table_count(route) == 0 {
        return Err(InternalError::plan_invariant(
            "route resolved no physical tables",
        ));
    }

    Ok(())
}

fn table_count(route: &Route) -> usize {
    route.partitions.iter().map(|p| p.tables.len()).sum()
}

fn entries(ctx: &StatementContext, route: &Route, statement: &Statement) -> Vec<PlanEntry> {
    route
        .partitions
        .iter()
        .map(|target| PlanEntry {
            target: target.clone(),
            statements: target
                .tables
                .iter()
                .map(|table| {
                    // Unregistered tables run exactly as written.
                    let rewritten = if ctx.model.is_some() {
                        substitute_table(statement, table)
                    } else {
                        statement.clone()
                    };
                    (table.clone(), rewritten)
                })
                .collect(),
        })
        .collect()
}

fn distribute_select(select: &PlainSelect) -> (PlainSelect, Vec<OrderKey>, Option<RowWindow>) {
    let mut select = select.clone();

    let window = select
        .limit
        .filter(|l| l.limit.is_some() || l.offset > 0)
        .map(|l| RowWindow {
            offset: l.offset,
            limit: l.limit,
        });
    select.limit = window.and_then(|w| {
        w.limit.map(|n| Limit {
            limit: Some(w.offset.saturating_add(n)),
            offset: 0,
        })
    });

    let order = merge_order(&select);

    (select, order, window)
}

// Only plain column orderings can be merged client-side.
fn merge_order(select: &PlainSelect) -> Vec<OrderKey> {
    let keys: Option<Vec<OrderKey>> = select
        .order_by
        .iter()
        .map(|item| match &item.expr {
            Expr::Column(column) => Some(OrderKey {
                column: column.name.clone(),
                desc: item.desc,
            }),
            _ => None,
        })
        .collect();

    keys.unwrap_or_default()
}

fn count_select(select: &PlainSelect) -> PlainSelect {
    let mut stripped = select.clone();
    stripped.order_by.clear();
    stripped.limit = None;

    if !stripped.group_by.is_empty() || stripped.having.is_some() {
        return wrap_count(SelectBody::Plain(Box::new(stripped)));
    }

    if stripped.distinct {
        let exprs: Option<Vec<Expr>> = stripped
            .items
            .iter()
            .map(|item| match item {
                SelectItem::Expr { expr, .. } => Some(expr.clone()),
                _ => None,
            })
            .collect();

        return match exprs {
            Some(exprs) if !exprs.is_empty() => {
                stripped.distinct = false;
                stripped.items = vec![SelectItem::CountDistinct(exprs)];
                stripped
            }
            _ => wrap_count(SelectBody::Plain(Box::new(stripped))),
        };
    }

    stripped.items = vec![SelectItem::CountAll];
    stripped
}

// SELECT COUNT(*) FROM (<body>) counted
fn wrap_count(body: SelectBody) -> PlainSelect {
    PlainSelect {
        distinct: false,
        items: vec![SelectItem::CountAll],
        from: FromItem::SubSelect {
            body: Box::new(body),
            alias: Some("counted".to_string()),
        },
        where_clause: None,
        group_by: Vec::new(),
        having: None,
        order_by: Vec::new(),
        limit: None,
    }
}
