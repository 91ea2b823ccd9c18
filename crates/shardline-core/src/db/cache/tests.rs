use super::{key::normalize_text, *};
use crate::{
    obs::{metrics_report, metrics_reset_all},
    sql::{Expr, PlainSelect, TableRef},
    test_support::rows,
};
use shardline_config::{CacheConfig, DEFAULT_MAX_CACHED_ROWS};

fn cache() -> SessionCache<Row> {
    SessionCache::new(&CacheConfig::default())
}

fn id_predicate() -> Expr {
    Expr::eq(Expr::col("id"), Expr::param())
}

fn id_dimension() -> KeyDimension {
    KeyDimension::for_predicate(Some(&id_predicate()), "generic")
}

fn status_dimension() -> KeyDimension {
    KeyDimension::for_predicate(
        Some(&Expr::eq(Expr::col("status"), Expr::param())),
        "generic",
    )
}

fn order_row(id: i64) -> Vec<Row> {
    rows(&["id", "status"], vec![vec![id.into(), "open".into()]])
}

fn key(dimension: KeyDimension, id: i64) -> CacheKey {
    CacheKey::new("orders", dimension, vec![Value::from(id)])
}

#[test]
fn lookup_miss_store_hit_then_update_evicts_tuple() {
    let mut cache = cache();
    let key = key(id_dimension(), 5);

    assert!(cache.load(&key).is_none());
    assert!(cache.on_load(key.clone(), &order_row(5)));
    assert_eq!(cache.load(&key).map(<[Row]>::len), Some(1));

    cache.on_write(WriteEvent::Update {
        table: "orders".to_string(),
        dimension: id_dimension(),
        params: vec![Value::from(5)],
    });
    assert!(cache.load(&key).is_none());

    let stats = cache.stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 2);
    assert_eq!(stats.stores, 1);
    assert_eq!(stats.invalidations, 1);
}

#[test]
fn delete_keeps_other_tuples_of_same_bucket_and_clears_other_buckets() {
    let mut cache = cache();
    cache.on_load(key(id_dimension(), 5), &order_row(5));
    cache.on_load(key(id_dimension(), 7), &order_row(7));
    cache.on_load(
        CacheKey::new("orders", status_dimension(), vec!["open".into()]),
        &order_row(5),
    );

    cache.on_write(WriteEvent::Delete {
        table: "ORDERS".to_string(),
        dimension: id_dimension(),
        params: vec![Value::from(5)],
    });

    assert!(!cache.contains(&key(id_dimension(), 5)));
    assert!(cache.contains(&key(id_dimension(), 7)));
    assert!(cache.bucket("orders", &status_dimension()).is_none());
    assert_eq!(cache.len(), 1);
}

#[test]
fn oversized_row_sets_are_never_cached() {
    let mut cache = cache();
    let key = key(id_dimension(), 1);
    let data = (0..=DEFAULT_MAX_CACHED_ROWS as i64)
        .map(|i| vec![Value::from(i)])
        .collect();
    let big = rows(&["id"], data);
    assert_eq!(big.len(), DEFAULT_MAX_CACHED_ROWS + 1);

    assert!(!cache.on_load(key.clone(), &big));
    assert!(cache.load(&key).is_none());
    assert_eq!(cache.stats().rejected, 1);
    assert_eq!(cache.stats().stores, 0);

    // exactly at the ceiling is fine
    assert!(cache.on_load(key.clone(), &big[..DEFAULT_MAX_CACHED_ROWS]));
    assert!(cache.contains(&key));
}

#[test]
fn truncate_drops_the_table_only() {
    let mut cache = cache();
    cache.on_load(key(id_dimension(), 1), &order_row(1));
    cache.on_load(
        CacheKey::new("audit", id_dimension(), vec![Value::from(1)]),
        &order_row(1),
    );

    cache.on_write(WriteEvent::Truncate {
        table: "orders".to_string(),
    });

    assert!(!cache.contains(&key(id_dimension(), 1)));
    assert!(cache.contains(&CacheKey::new("audit", id_dimension(), vec![Value::from(1)])));
}

#[test]
fn insert_without_identity_clears_table() {
    let mut cache = cache();
    cache.on_load(key(id_dimension(), 1), &order_row(1));
    cache.on_load(key(id_dimension(), 2), &order_row(2));

    cache.on_write(WriteEvent::Insert {
        table: "orders".to_string(),
        identity: None,
    });

    assert!(cache.is_empty());
}

#[test]
fn insert_with_identity_refreshes_single_entry() {
    let mut cache = cache();
    cache.on_load(key(id_dimension(), 1), &order_row(1));
    cache.on_load(
        CacheKey::new("orders", status_dimension(), vec!["open".into()]),
        &order_row(1),
    );

    let inserted = order_row(9).remove(0);
    cache.on_write(WriteEvent::Insert {
        table: "orders".to_string(),
        identity: Some(PointIdentity {
            dimension: id_dimension(),
            key: vec![Value::from(9)],
            row: inserted.clone(),
        }),
    });

    assert!(cache.contains(&key(id_dimension(), 1)));
    assert_eq!(cache.load(&key(id_dimension(), 9)), Some(&[inserted][..]));
    assert!(cache.bucket("orders", &status_dimension()).is_none());
}

#[test]
fn disabled_cache_stores_nothing_and_counts_nothing() {
    let mut cache = SessionCache::<Row>::new(&CacheConfig {
        enabled: false,
        ..CacheConfig::default()
    });
    let key = key(id_dimension(), 1);

    assert!(!cache.on_load(key.clone(), &order_row(1)));
    assert!(cache.load(&key).is_none());
    assert_eq!(cache.stats(), CacheStatsSnapshot::default());

    cache.set_enabled(true);
    assert!(cache.on_load(key.clone(), &order_row(1)));
    cache.set_enabled(false);
    cache.set_enabled(true);
    assert!(!cache.contains(&key));
}

#[test]
fn evict_helpers() {
    let mut cache = cache();
    cache.on_load(key(id_dimension(), 1), &order_row(1));
    cache.on_load(key(id_dimension(), 2), &order_row(2));
    cache.on_load(
        CacheKey::new("orders", status_dimension(), vec!["open".into()]),
        &order_row(1),
    );

    assert!(cache.evict(&key(id_dimension(), 1)));
    assert!(!cache.evict(&key(id_dimension(), 1)));
    assert_eq!(cache.evict_table("Orders"), 2);
    assert!(cache.is_empty());

    cache.on_load(key(id_dimension(), 3), &order_row(3));
    cache.evict_all();
    assert!(cache.is_empty());
}

#[test]
fn write_to_uncached_table_is_a_no_op() {
    metrics_reset_all();
    let mut cache = cache();

    cache.on_write(WriteEvent::Truncate {
        table: "orders".to_string(),
    });

    assert_eq!(cache.stats().invalidations, 0);
    assert!(metrics_report(None).counters.is_none_or(|c| c.ops.cache_invalidations == 0));
}

#[test]
fn invalidation_emits_metrics() {
    metrics_reset_all();
    let mut cache = cache();
    cache.on_load(key(id_dimension(), 1), &order_row(1));
    cache.on_load(
        CacheKey::new("orders", status_dimension(), vec!["open".into()]),
        &order_row(1),
    );

    cache.on_write(WriteEvent::Update {
        table: "orders".to_string(),
        dimension: id_dimension(),
        params: vec![Value::from(1)],
    });

    let counters = metrics_report(None).counters.expect("counters recorded");
    assert_eq!(counters.ops.cache_invalidations, 1);
    assert_eq!(counters.ops.cache_buckets_cleared, 1);
}

#[test]
fn normalize_text_collapses_whitespace_outside_literals() {
    assert_eq!(
        normalize_text("  name  =   'Mixed  Case'\n and id > ?"),
        "NAME = 'Mixed  Case' AND ID > ?"
    );
}

#[test]
fn plain_select_shares_where_signature() {
    let select = PlainSelect::from_table(TableRef::new("orders")).filter(id_predicate());
    assert_eq!(KeyDimension::for_select(&select, "generic"), id_dimension());

    let ordered = select.order_by("id", false);
    assert_ne!(KeyDimension::for_select(&ordered, "generic"), id_dimension());
}

#[test]
fn dialect_separates_signatures() {
    let generic = KeyDimension::for_predicate(Some(&id_predicate()), "generic");
    let mysql = KeyDimension::for_predicate(Some(&id_predicate()), "MySQL");

    assert_ne!(generic, mysql);
    assert_eq!(mysql, KeyDimension::for_predicate(Some(&id_predicate()), "mysql"));
    assert_eq!(generic.to_string().len(), 16);
}

#[test]
fn hit_ratio_reflects_lookups() {
    let mut cache = cache();
    let key = key(id_dimension(), 1);

    let _ = cache.load(&key);
    cache.on_load(key.clone(), &order_row(1));
    let _ = cache.load(&key);
    let _ = cache.load(&key);
    let _ = cache.load(&key);

    assert!((cache.stats().hit_ratio() - 0.75).abs() < f64::EPSILON);
    cache.reset_stats();
    assert_eq!(cache.stats(), CacheStatsSnapshot::default());
}

#[test]
fn stats_snapshot_serializes() {
    let mut cache = cache();
    cache.on_load(key(id_dimension(), 1), &order_row(1));

    let json = serde_json::to_string(&cache.stats()).expect("snapshot should serialize");
    assert!(json.contains("\"stores\":1"));
    let back: CacheStatsSnapshot = serde_json::from_str(&json).expect("snapshot should parse");
    assert_eq!(back, cache.stats());
}
