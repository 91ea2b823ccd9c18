use super::*;
use crate::{
    db::dimension::{Dimension, DimensionMap},
    error::RouteError,
    sql::{
        Column, Expr, FromItem, Insert, InsertSource, PlainSelect, SelectBody, TableRef,
        Truncate, Update,
    },
    test_support::{orders_model, router, select_orders, tenant_is},
};

fn databases(route: &Route) -> Vec<&str> {
    route.partitions.iter().map(|p| p.database.as_str()).collect()
}

fn route_of(statement: Statement, values: Vec<Value>) -> Result<Option<Route>, InternalError> {
    let router = router();
    let ctx = router.bind(statement, values)?;
    router.route(&ctx)
}

fn routed(statement: Statement, values: Vec<Value>) -> Route {
    route_of(statement, values)
        .expect("statement should route")
        .expect("orders is partitioned")
}

#[test]
fn point_predicate_prunes_to_one_partition() {
    let route = routed(select_orders(tenant_is(6)), vec![]);

    assert_eq!(route.kind, RouteKind::Pruned);
    assert_eq!(databases(&route), vec!["shard2"]);
    assert_eq!(route.partitions[0].tables, vec!["orders_2".to_string()]);
}

#[test]
fn bound_parameters_route_like_literals() {
    let statement = select_orders(Expr::eq(Expr::col("TENANT_ID"), Expr::param()));
    let route = routed(statement, vec![Value::Int(3)]);

    assert_eq!(databases(&route), vec!["shard3"]);
}

#[test]
fn missing_partition_key_broadcasts_to_all_four() {
    let statement = select_orders(Expr::eq(Expr::col("status"), Expr::lit("open")));
    let route = routed(statement, vec![]);

    assert_eq!(route.kind, RouteKind::Broadcast);
    assert_eq!(databases(&route), vec!["shard0", "shard1", "shard2", "shard3"]);
}

#[test]
fn in_list_with_collection_param_is_flattened() {
    let statement = select_orders(Expr::in_list(
        Expr::col("tenant_id"),
        vec![Expr::named_param("tenants", 2)],
    ));
    let route = routed(statement, vec![Value::Int(1), Value::Int(5)]);

    assert_eq!(databases(&route), vec!["shard1"]);
    assert_eq!(
        route.dimensions["tenant"],
        Dimension::discrete([Value::Int(1), Value::Int(5)])
    );
}

#[test]
fn small_integer_range_is_enumerated_against_buckets() {
    let statement = select_orders(Expr::between(
        Expr::col("tenant_id"),
        Expr::lit(4),
        Expr::lit(6),
    ));
    let route = routed(statement, vec![]);

    assert_eq!(databases(&route), vec!["shard0", "shard1", "shard2"]);
}

#[test]
fn or_of_points_routes_to_both() {
    let statement = select_orders(tenant_is(1) | tenant_is(2));
    let route = routed(statement, vec![]);

    assert_eq!(databases(&route), vec!["shard1", "shard2"]);
}

#[test]
fn negated_predicate_keeps_every_partition() {
    let statement = select_orders(Expr::not(tenant_is(1)));
    let route = routed(statement, vec![]);

    assert_eq!(route.kind, RouteKind::Pruned);
    assert_eq!(route.partitions.len(), 4);
}

#[test]
fn contradiction_widens_to_broadcast() {
    let statement = select_orders(tenant_is(1) & tenant_is(2));
    let route = routed(statement, vec![]);

    assert_eq!(route.kind, RouteKind::Broadcast);
    assert_eq!(route.partitions.len(), 4);
}

#[test]
fn from_sub_select_constraints_are_and_merged() {
    let inner = PlainSelect::from_table(TableRef::new("orders")).filter(tenant_is(7));
    let mut outer = PlainSelect::from_table(TableRef::new("orders"));
    outer.from = FromItem::SubSelect {
        body: Box::new(SelectBody::Plain(Box::new(inner))),
        alias: Some("o".to_string()),
    };
    outer.where_clause = Some(Expr::eq(Expr::col("status"), Expr::lit("open")));

    let route = routed(Statement::select(outer), vec![]);

    assert_eq!(databases(&route), vec!["shard3"]);
}

#[test]
fn union_over_partitioned_table_is_unroutable() {
    let select = PlainSelect::from_table(TableRef::new("orders"));
    let statement = Statement::Select(SelectBody::Union {
        selects: vec![select.clone(), select],
        all: true,
    });

    let err = route_of(statement, vec![]).expect_err("union must be rejected");
    assert!(err.is_unroutable());
}

#[test]
fn insert_routes_by_column_value() {
    let statement = Statement::Insert(Insert {
        table: TableRef::new("orders"),
        columns: vec![Column::new("id"), Column::new("tenant_id")],
        source: InsertSource::Values(vec![Expr::param(), Expr::param()]),
    });
    let route = routed(statement, vec![Value::Int(100), Value::Int(9)]);

    assert_eq!(databases(&route), vec!["shard1"]);
}

#[test]
fn insert_without_columns_is_unroutable() {
    let statement = Statement::Insert(Insert {
        table: TableRef::new("orders"),
        columns: vec![],
        source: InsertSource::Values(vec![Expr::lit(1)]),
    });

    let err = route_of(statement, vec![]).expect_err("columns are required");
    assert!(err.is_unroutable());
}

#[test]
fn insert_from_sub_select_is_unroutable() {
    let statement = Statement::Insert(Insert {
        table: TableRef::new("orders"),
        columns: vec![Column::new("tenant_id")],
        source: InsertSource::SubSelect(Box::new(SelectBody::Plain(Box::new(
            PlainSelect::from_table(TableRef::new("staging")),
        )))),
    });

    let err = route_of(statement, vec![]).expect_err("sub-select source");
    assert!(err.is_unroutable());
}

#[test]
fn update_where_takes_precedence_over_set() {
    let statement = Statement::Update(Update {
        table: TableRef::new("orders"),
        sets: vec![(Column::new("tenant_id"), Expr::param())],
        where_clause: Some(Expr::eq(Expr::col("tenant_id"), Expr::param())),
    });
    // SET tenant_id = 2 WHERE tenant_id = 1
    let route = routed(statement, vec![Value::Int(2), Value::Int(1)]);

    assert_eq!(databases(&route), vec!["shard1"]);
}

#[test]
fn update_set_fills_undetermined_key() {
    let statement = Statement::Update(Update {
        table: TableRef::new("orders"),
        sets: vec![
            (Column::new("status"), Expr::lit("closed")),
            (Column::new("tenant_id"), Expr::param()),
        ],
        where_clause: Some(Expr::eq(Expr::col("id"), Expr::param())),
    });
    let route = routed(statement, vec![Value::Int(2), Value::Int(10)]);

    assert_eq!(databases(&route), vec!["shard2"]);
}

#[test]
fn truncate_always_broadcasts() {
    let statement = Statement::Truncate(Truncate {
        table: TableRef::new("orders"),
    });
    let route = routed(statement, vec![]);

    assert_eq!(route.kind, RouteKind::Broadcast);
    assert_eq!(route.partitions.len(), 4);
}

#[test]
fn unpartitioned_and_unknown_tables_are_not_routed() {
    let audit = Statement::select(PlainSelect::from_table(TableRef::new("audit")));
    assert_eq!(route_of(audit, vec![]).expect("audit binds"), None);

    let unknown = Statement::select(PlainSelect::from_table(TableRef::new("sessions")));
    assert_eq!(route_of(unknown, vec![]).expect("unknown binds"), None);
}

#[test]
fn inconsistent_partition_metadata_is_fatal() {
    let mut catalog = crate::model::Catalog::new();
    catalog.register(orders_model().partition_key("region", "by_region"));
    let router = Router::new(
        Arc::new(catalog),
        Arc::new(crate::test_support::orders_shard_map()),
    );

    let err = router
        .bind(select_orders(tenant_is(1)), vec![])
        .and_then(|ctx| router.route(&ctx))
        .expect_err("region has no column");
    assert_eq!(
        err.route_error(),
        Some(&RouteError::MetadataInconsistency {
            table: "orders".to_string(),
            field: "region".to_string(),
        })
    );
}

#[test]
fn like_prefix_is_collected_as_prefix() {
    let model = orders_model().partition_key("name", "by_name");
    let ctx = StatementContext {
        statement: select_orders(Expr::like(Expr::col("name"), Expr::lit("ab%"))),
        model: Some(Arc::new(model)),
        params: BoundParams::default(),
        modification_points: vec![],
    };

    let map = collect(&ctx).expect("collect");
    assert_eq!(map, DimensionMap::single("name", Dimension::prefix("ab")));
}

#[test]
fn range_buckets_intersect_exactly() {
    let bucket = Bucket::Range {
        low: Some(Value::Int(10)),
        high: Some(Value::Int(20)),
    };

    assert!(bucket.may_intersect(&Dimension::above(Value::Int(19), true)));
    assert!(!bucket.may_intersect(&Dimension::above(Value::Int(20), true)));
    assert!(!bucket.may_intersect(&Dimension::below(Value::Int(10), false)));
    assert!(bucket.may_intersect(&Dimension::below(Value::Int(10), true)));
    assert!(bucket.may_intersect(&Dimension::prefix("x")));
}

#[test]
fn hash_buckets_partition_every_value_once() {
    let buckets: Vec<Bucket> = (0..3)
        .map(|bucket| Bucket::Hash { buckets: 3, bucket })
        .collect();

    for v in 0..50i64 {
        let owners = buckets
            .iter()
            .filter(|b| b.contains(&Value::Int(v)))
            .count();
        assert_eq!(owners, 1);
        // numerically equal values land in the same bucket
        assert!(
            buckets
                .iter()
                .filter(|b| b.contains(&Value::Int(v)))
                .all(|b| b.contains(&Value::Uint(v.unsigned_abs())))
        );
    }
}

#[test]
fn hash_buckets_keep_every_bucket_for_a_numeric_range() {
    let range = Dimension::range(Some(Value::Int(2)), Some(Value::Int(3)), true, true);
    let owner = crate::value::hash_value(&Value::Float64(2.5)) % 4;

    for bucket in 0..4 {
        assert!(Bucket::Hash { buckets: 4, bucket }.may_intersect(&range));
    }
    assert!(Bucket::Hash { buckets: 4, bucket: owner }.contains(&Value::Float64(2.5)));
}

#[test]
fn hash_buckets_prune_points_and_sets() {
    let point = Dimension::point(Value::Int(7));
    let owner = crate::value::hash_value(&Value::Int(7)) % 4;

    let matching: Vec<u64> = (0..4)
        .filter(|&bucket| Bucket::Hash { buckets: 4, bucket }.may_intersect(&point))
        .collect();
    assert_eq!(matching, vec![owner]);

    let set = Dimension::discrete([Value::Int(7)]);
    assert!(Bucket::Hash { buckets: 4, bucket: owner }.may_intersect(&set));
}
