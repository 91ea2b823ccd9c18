use crate::{
    db::{
        dimension::{Dimension, DimensionMap},
        route::{PartitionResult, ShardResolver},
    },
    error::{ErrorClass, ErrorOrigin, InternalError},
    model::TableModel,
    value::{Value, hash_value},
};
use std::collections::BTreeMap;

/// Integer ranges up to this many values are enumerated against modulo
/// buckets; wider ranges are assumed to intersect.
const MAX_ENUMERATED_RANGE: i128 = 1024;

///
/// Bucket
///
/// Slice of one partition key's value space held by a partition.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Bucket {
    /// Integers with `value mod modulus == remainder` (Euclidean).
    Modulo { modulus: u64, remainder: u64 },
    /// Values whose xxh3 hash lands in `bucket` of `buckets`.
    Hash { buckets: u64, bucket: u64 },
    /// Half-open `[low, high)`; an absent bound is open ended.
    Range {
        low: Option<Value>,
        high: Option<Value>,
    },
}

impl Bucket {
    #[must_use]
    pub fn contains(&self, value: &Value) -> bool {
        if value.is_null() {
            return false;
        }

        match self {
            Self::Modulo { modulus, remainder } => {
                *modulus > 0
                    && value.as_i128().is_some_and(|v| {
                        v.rem_euclid(i128::from(*modulus)) == i128::from(*remainder)
                    })
            }
            Self::Hash { buckets, bucket } => {
                *buckets > 0 && hash_value(value) % buckets == *bucket
            }
            Self::Range { low, high } => {
                low.as_ref().is_none_or(|low| value >= low)
                    && high.as_ref().is_none_or(|high| value < high)
            }
        }
    }

    /// Whether rows constrained by `dimension` may live in this bucket.
    /// Exact for sets, points, and ranges against range buckets;
    /// conservative (`true`) where it cannot decide.
    #[must_use]
    pub fn may_intersect(&self, dimension: &Dimension) -> bool {
        if dimension.is_empty() {
            return false;
        }

        match dimension {
            Dimension::Discrete(values) => values.iter().any(|v| self.contains(v)),
            Dimension::Range {
                min,
                max,
                min_inclusive,
                max_inclusive,
            } => match self {
                Self::Range { low, high } => {
                    let below_low = match (max, low) {
                        (Some(max), Some(low)) => max < low || (max == low && !max_inclusive),
                        _ => false,
                    };
                    let above_high = match (min, high) {
                        (Some(min), Some(high)) => min >= high,
                        _ => false,
                    };

                    !below_low && !above_high
                }
                // modulo buckets hold integers only, so integer points suffice
                Self::Modulo { .. } => {
                    match enumerate_integers(min.as_ref(), max.as_ref(), *min_inclusive, *max_inclusive)
                    {
                        Some(mut values) => values.any(|v| self.contains(&v)),
                        None => true,
                    }
                }
                // any non-integer inside the range may hash anywhere
                Self::Hash { .. } => dimension
                    .as_point()
                    .is_none_or(|point| self.contains(point)),
            },
            Dimension::Prefix(_) | Dimension::Negated(_) => true,
        }
    }
}

// Integer values of a closed-or-open integral range, when it is small.
fn enumerate_integers(
    min: Option<&Value>,
    max: Option<&Value>,
    min_inclusive: bool,
    max_inclusive: bool,
) -> Option<impl Iterator<Item = Value>> {
    let low = min?.as_i128()? + i128::from(!min_inclusive);
    let high = max?.as_i128()? - i128::from(!max_inclusive);
    if high.checked_sub(low).is_none_or(|span| span >= MAX_ENUMERATED_RANGE) {
        return None;
    }

    Some((low..=high).map(|v| {
        i64::try_from(v).map_or_else(
            |_| u64::try_from(v).map_or(Value::Null, Value::Uint),
            Value::Int,
        )
    }))
}

///
/// BucketPartition
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BucketPartition {
    pub database: String,
    pub table: String,
    pub buckets: BTreeMap<String, Bucket>,
}

impl BucketPartition {
    fn may_hold(&self, model: &TableModel, dimensions: &DimensionMap) -> bool {
        model.partition_keys.iter().all(|key| {
            match (self.buckets.get(&key.field), dimensions.get(&key.field)) {
                (Some(bucket), Some(dimension)) => bucket.may_intersect(dimension),
                _ => true,
            }
        })
    }
}

///
/// BucketShardMap
///
/// In-process [`ShardResolver`]: each logical table lists its partitions in
/// declaration order, each holding one bucket per partition key.
///

#[derive(Clone, Debug, Default)]
pub struct BucketShardMap {
    tables: BTreeMap<String, Vec<BucketPartition>>,
}

impl BucketShardMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare one partition of `table`.
    #[must_use]
    pub fn partition<K: Into<String>>(
        mut self,
        table: &str,
        database: impl Into<String>,
        physical: impl Into<String>,
        buckets: impl IntoIterator<Item = (K, Bucket)>,
    ) -> Self {
        self.tables
            .entry(table.to_ascii_uppercase())
            .or_default()
            .push(BucketPartition {
                database: database.into(),
                table: physical.into(),
                buckets: buckets.into_iter().map(|(k, b)| (k.into(), b)).collect(),
            });
        self
    }

    fn partitions_of(&self, model: &TableModel) -> Result<&[BucketPartition], InternalError> {
        self.tables
            .get(&model.name.to_ascii_uppercase())
            .map(Vec::as_slice)
            .ok_or_else(|| {
                InternalError::new(
                    ErrorClass::InvariantViolation,
                    ErrorOrigin::Route,
                    format!("no shard layout registered for table '{}'", model.name),
                )
            })
    }
}

impl ShardResolver for BucketShardMap {
    fn resolve(
        &self,
        model: &TableModel,
        dimensions: &DimensionMap,
    ) -> Result<Vec<PartitionResult>, InternalError> {
        let partitions = self.partitions_of(model)?;

        Ok(group_by_database(
            partitions.iter().filter(|p| p.may_hold(model, dimensions)),
        ))
    }

    fn all_partitions(&self, model: &TableModel) -> Result<Vec<PartitionResult>, InternalError> {
        Ok(group_by_database(self.partitions_of(model)?.iter()))
    }
}

// One result per database, in first-seen order.
fn group_by_database<'a>(
    partitions: impl Iterator<Item = &'a BucketPartition>,
) -> Vec<PartitionResult> {
    let mut out: Vec<PartitionResult> = Vec::new();
    for partition in partitions {
        match out.iter_mut().find(|r| r.database == partition.database) {
            Some(result) => result.tables.push(partition.table.clone()),
            None => out.push(PartitionResult::single(
                partition.database.clone(),
                partition.table.clone(),
            )),
        }
    }

    out
}
