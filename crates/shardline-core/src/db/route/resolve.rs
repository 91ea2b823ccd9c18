use crate::{
    db::dimension::DimensionMap,
    error::InternalError,
    model::TableModel,
    obs::RouteKind,
};
use tracing::{debug, warn};

///
/// PartitionResult
///
/// One database plus the physical tables of a logical table inside it.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PartitionResult {
    pub database: String,
    pub tables: Vec<String>,
}

impl PartitionResult {
    #[must_use]
    pub fn new(database: impl Into<String>, tables: Vec<String>) -> Self {
        Self {
            database: database.into(),
            tables,
        }
    }

    #[must_use]
    pub fn single(database: impl Into<String>, table: impl Into<String>) -> Self {
        Self::new(database, vec![table.into()])
    }
}

///
/// ShardResolver
///
/// Partition-function collaborator. Interprets the table's partition keys
/// against a fully determined dimension map, or lists every partition.
///

pub trait ShardResolver: Send + Sync {
    /// Partitions that may hold rows matching `dimensions`. Every partition
    /// key of `model` has an entry in `dimensions` when this is called.
    fn resolve(
        &self,
        model: &TableModel,
        dimensions: &DimensionMap,
    ) -> Result<Vec<PartitionResult>, InternalError>;

    /// Every partition of the table.
    fn all_partitions(&self, model: &TableModel) -> Result<Vec<PartitionResult>, InternalError>;
}

///
/// Route
///
/// Routing outcome for one statement.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Route {
    pub kind: RouteKind,
    pub dimensions: DimensionMap,
    pub partitions: Vec<PartitionResult>,
}

impl Route {
    /// Unpartitioned statement against one database.
    #[must_use]
    pub fn direct(database: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            kind: RouteKind::Direct,
            dimensions: DimensionMap::new(),
            partitions: vec![PartitionResult::single(database, table)],
        }
    }

    #[must_use]
    pub const fn partition_count(&self) -> usize {
        self.partitions.len()
    }
}

/// Map a dimension map onto partitions.
///
/// Any partition key without a dimension broadcasts. A narrowed result that
/// comes back empty is widened to a broadcast as well.
pub fn resolve_partitions(
    resolver: &dyn ShardResolver,
    model: &TableModel,
    dimensions: DimensionMap,
) -> Result<Route, InternalError> {
    let missing = model
        .partition_keys
        .iter()
        .find(|key| !dimensions.contains_key(&key.field));

    if let Some(key) = missing {
        debug!(
            table = %model.name,
            field = %key.field,
            "partition key undetermined, broadcasting"
        );

        return broadcast(resolver, model, dimensions);
    }

    let partitions = resolver.resolve(model, &dimensions)?;
    if partitions.is_empty() {
        warn!(table = %model.name, "no partition matched, broadcasting");

        return broadcast(resolver, model, dimensions);
    }

    Ok(Route {
        kind: RouteKind::Pruned,
        dimensions,
        partitions,
    })
}

fn broadcast(
    resolver: &dyn ShardResolver,
    model: &TableModel,
    dimensions: DimensionMap,
) -> Result<Route, InternalError> {
    Ok(Route {
        kind: RouteKind::Broadcast,
        dimensions,
        partitions: resolver.all_partitions(model)?,
    })
}
