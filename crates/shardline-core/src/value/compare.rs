use crate::value::Value;
use std::cmp::Ordering;

/// Total canonical comparator used by dimension, cache and merge surfaces.
///
/// Ordering rules:
/// 1. Canonical variant rank (`Null < Bool < numeric < Text < Blob < List`)
/// 2. Numeric values compare by value across `Int`, `Uint` and `Float64`
/// 3. Variant-specific comparison for everything else
///
/// Integer/float comparisons are exact; no value is widened through a lossy
/// cast, so the order stays transitive.
#[must_use]
pub fn canonical_cmp(left: &Value, right: &Value) -> Ordering {
    let rank = canonical_rank(left).cmp(&canonical_rank(right));
    if rank != Ordering::Equal {
        return rank;
    }

    match (left, right) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Text(a), Value::Text(b)) => a.cmp(b),
        (Value::Blob(a), Value::Blob(b)) => a.cmp(b),
        (Value::List(a), Value::List(b)) => cmp_list(a, b),
        _ => cmp_numeric(left, right),
    }
}

const fn canonical_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Int(_) | Value::Uint(_) | Value::Float64(_) => 2,
        Value::Text(_) => 3,
        Value::Blob(_) => 4,
        Value::List(_) => 5,
    }
}

fn cmp_list(left: &[Value], right: &[Value]) -> Ordering {
    for (left, right) in left.iter().zip(right.iter()) {
        let cmp = canonical_cmp(left, right);
        if cmp != Ordering::Equal {
            return cmp;
        }
    }

    left.len().cmp(&right.len())
}

fn cmp_numeric(left: &Value, right: &Value) -> Ordering {
    match (left, right) {
        (Value::Float64(a), Value::Float64(b)) => cmp_f64(*a, *b),
        (Value::Float64(a), other) => integer(other).map_or(Ordering::Equal, |b| {
            cmp_i128_f64(b, *a).reverse()
        }),
        (other, Value::Float64(b)) => {
            integer(other).map_or(Ordering::Equal, |a| cmp_i128_f64(a, *b))
        }
        _ => match (integer(left), integer(right)) {
            (Some(a), Some(b)) => a.cmp(&b),
            _ => Ordering::Equal,
        },
    }
}

fn integer(value: &Value) -> Option<i128> {
    match value {
        Value::Int(v) => Some(i128::from(*v)),
        Value::Uint(v) => Some(i128::from(*v)),
        _ => None,
    }
}

// Signed zeros are equal; NaN sorts after every other float.
fn cmp_f64(left: f64, right: f64) -> Ordering {
    if left == right {
        Ordering::Equal
    } else {
        left.total_cmp(&right)
    }
}

// i128 values from i64/u64 are far inside ±1e38, so the clamps below only
// need to handle floats outside that range.
#[allow(clippy::cast_possible_truncation)]
fn cmp_i128_f64(int: i128, float: f64) -> Ordering {
    if float.is_nan() {
        return Ordering::Less;
    }
    if float >= 1.0e38 {
        return Ordering::Less;
    }
    if float <= -1.0e38 {
        return Ordering::Greater;
    }

    let floor = float.floor();
    let floor_int = floor as i128;
    match int.cmp(&floor_int) {
        Ordering::Equal if float > floor => Ordering::Less,
        other => other,
    }
}
