use super::*;
use crate::{
    db::route::{Route, StatementContext},
    error::RouteError,
    sql::{Delete, Expr, PlainSelect, SelectBody, SelectItem, TableRef},
    test_support::{router, select_orders, tenant_is},
};

fn bind_and_route(statement: Statement, values: Vec<Value>) -> (StatementContext, Route) {
    let router = router();
    let ctx = router.bind(statement, values).expect("bind");
    let route = router.route(&ctx).expect("route").expect("partitioned");
    (ctx, route)
}

fn rendered(plan: &ExecutionPlan) -> Vec<String> {
    plan.entries
        .iter()
        .flat_map(|e| e.statements.iter().map(|(_, s)| s.to_string()))
        .collect()
}

#[test]
fn select_plan_substitutes_physical_tables() {
    let (ctx, route) = bind_and_route(
        select_orders(Expr::eq(Expr::col("status"), Expr::param())),
        vec![Value::Text("open".to_string())],
    );

    let plan = build_plan(&ctx, &route).expect("plan");

    assert_eq!(plan.mode, AggregateMode::UnionRows);
    assert_eq!(plan.partition_count(), 4);
    assert_eq!(plan.statement_count(), 4);
    assert_eq!(plan.params, vec![Value::Text("open".to_string())]);
    assert_eq!(
        rendered(&plan),
        vec![
            "SELECT * FROM orders_0 WHERE status = ?",
            "SELECT * FROM orders_1 WHERE status = ?",
            "SELECT * FROM orders_2 WHERE status = ?",
            "SELECT * FROM orders_3 WHERE status = ?",
        ]
    );
}

#[test]
fn multi_partition_limit_is_pushed_down_with_client_window() {
    let select = PlainSelect::from_table(TableRef::new("orders"))
        .order_by("id", false)
        .limit(Some(10), 20);
    let (ctx, route) = bind_and_route(Statement::select(select), vec![]);

    let plan = build_plan(&ctx, &route).expect("plan");

    assert_eq!(
        plan.window,
        Some(RowWindow {
            offset: 20,
            limit: Some(10)
        })
    );
    assert_eq!(
        plan.order,
        vec![OrderKey {
            column: "id".to_string(),
            desc: false
        }]
    );
    assert_eq!(
        rendered(&plan)[0],
        "SELECT * FROM orders_0 ORDER BY id LIMIT 30"
    );
}

#[test]
fn single_partition_select_keeps_its_window() {
    let select = PlainSelect::from_table(TableRef::new("orders"))
        .filter(tenant_is(1))
        .limit(Some(5), 5);
    let (ctx, route) = bind_and_route(Statement::select(select), vec![]);

    let plan = build_plan(&ctx, &route).expect("plan");

    assert_eq!(plan.window, None);
    assert_eq!(
        rendered(&plan),
        vec!["SELECT * FROM orders_1 WHERE tenant_id = 1 LIMIT 5 OFFSET 5"]
    );
}

#[test]
fn count_plan_strips_order_and_limit() {
    let select = PlainSelect::from_table(TableRef::new("orders"))
        .filter(Expr::eq(Expr::col("status"), Expr::lit("open")))
        .order_by("id", true)
        .limit(Some(3), 0);
    let (ctx, route) = bind_and_route(Statement::select(select), vec![]);

    let plan = build_count_plan(&ctx, &route).expect("count plan");

    assert_eq!(plan.mode, AggregateMode::Sum);
    assert_eq!(
        rendered(&plan)[3],
        "SELECT COUNT(*) FROM orders_3 WHERE status = 'open'"
    );
}

#[test]
fn count_over_distinct_across_partitions_is_unsupported() {
    let mut select = PlainSelect::from_table(TableRef::new("orders"));
    select.distinct = true;
    select.items = vec![SelectItem::Expr {
        expr: Expr::col("status"),
        alias: None,
    }];
    let (ctx, route) = bind_and_route(Statement::select(select), vec![]);

    let err = build_count_plan(&ctx, &route).expect_err("distinct over 4 partitions");
    assert!(matches!(
        err.route_error(),
        Some(RouteError::UnsupportedAggregate { .. })
    ));
}

#[test]
fn count_over_group_on_one_partition_wraps_the_select() {
    let mut select = PlainSelect::from_table(TableRef::new("orders")).filter(tenant_is(2));
    select.group_by = vec![Expr::col("status")];
    let (ctx, route) = bind_and_route(Statement::select(select.clone()), vec![]);

    let plan = build_count_plan(&ctx, &route).expect("single partition");
    assert_eq!(
        rendered(&plan),
        vec![
            "SELECT COUNT(*) FROM (SELECT * FROM orders_2 WHERE tenant_id = 2 GROUP BY status) counted"
        ]
    );

    select.where_clause = None;
    let (ctx, route) = bind_and_route(Statement::select(select), vec![]);
    let err = build_count_plan(&ctx, &route).expect_err("group over 4 partitions");
    assert!(matches!(
        err.route_error(),
        Some(RouteError::UnsupportedAggregate { .. })
    ));
}

#[test]
fn count_distinct_on_one_partition_counts_the_projection() {
    let mut select = PlainSelect::from_table(TableRef::new("orders")).filter(tenant_is(3));
    select.distinct = true;
    select.items = vec![SelectItem::Expr {
        expr: Expr::col("status"),
        alias: None,
    }];
    let (ctx, route) = bind_and_route(Statement::select(select), vec![]);

    let plan = build_count_plan(&ctx, &route).expect("count plan");
    assert_eq!(
        rendered(&plan),
        vec!["SELECT COUNT(DISTINCT status) FROM orders_3 WHERE tenant_id = 3"]
    );
}

#[test]
fn count_plan_drops_values_of_stripped_clauses() {
    let mut select = PlainSelect::from_table(TableRef::new("orders"))
        .filter(Expr::eq(Expr::col("status"), Expr::param()));
    select.order_by.push(crate::sql::OrderItem {
        expr: Expr::Function {
            name: "coalesce".to_string(),
            args: vec![Expr::col("name"), Expr::param()],
        },
        desc: false,
    });
    let (ctx, route) = bind_and_route(
        Statement::select(select),
        vec![Value::Text("open".to_string()), Value::Text("zz".to_string())],
    );

    let plan = build_count_plan(&ctx, &route).expect("count plan");
    assert_eq!(plan.params, vec![Value::Text("open".to_string())]);
}

#[test]
fn delete_plan_sums_affected_rows() {
    let statement = Statement::Delete(Delete {
        table: TableRef::new("orders").with_alias("o"),
        where_clause: Some(tenant_is(5)),
    });
    let (ctx, route) = bind_and_route(statement, vec![]);

    let plan = build_plan(&ctx, &route).expect("plan");

    assert_eq!(plan.mode, AggregateMode::SumAffectedRows);
    assert_eq!(
        rendered(&plan),
        vec!["DELETE FROM orders_1 o WHERE tenant_id = 5"]
    );
}

#[test]
fn count_plan_requires_a_select() {
    let statement = Statement::Delete(Delete {
        table: TableRef::new("orders"),
        where_clause: None,
    });
    let (ctx, route) = bind_and_route(statement, vec![]);

    assert!(build_count_plan(&ctx, &route).is_err());
}

#[test]
fn direct_route_leaves_unregistered_tables_untouched() {
    let router = router();
    let mut table = TableRef::new("sessions");
    table.schema = Some("app".to_string());
    let ctx = router
        .bind(
            Statement::Select(SelectBody::Plain(Box::new(PlainSelect::from_table(table)))),
            vec![],
        )
        .expect("bind");
    let route = Route::direct("main", "sessions");

    let plan = build_plan(&ctx, &route).expect("plan");
    assert_eq!(rendered(&plan), vec!["SELECT * FROM app.sessions"]);
}
