use crate::{db::dimension::Dimension, value::Value};
use std::{cmp::Ordering, collections::BTreeSet};

///
/// AND
///
/// `None` means the pair has no defined conjunction; the caller drops the
/// field, which routes conservatively.
///

#[must_use]
pub fn merge_and(left: &Dimension, right: &Dimension) -> Option<Dimension> {
    use Dimension::{Discrete, Negated, Prefix, Range};

    match (left, right) {
        (Range { .. }, Range { .. }) => Some(intersect_ranges(left, right)),

        (Discrete(values), other) | (other, Discrete(values)) => {
            Some(filter_set(values, other))
        }

        (Prefix(a), Prefix(b)) => {
            if a.starts_with(b.as_str()) {
                Some(Prefix(a.clone()))
            } else if b.starts_with(a.as_str()) {
                Some(Prefix(b.clone()))
            } else {
                Some(Discrete(BTreeSet::new()))
            }
        }

        // not(a) and not(b) == not(a or b), only when the union is exact
        (Negated(a), Negated(b)) => union_exact(a, b).map(Dimension::negated),

        (Range { .. } | Prefix(_) | Negated(_), _) => None,
    }
}

///
/// OR
///

#[must_use]
pub fn merge_or(left: &Dimension, right: &Dimension) -> Option<Dimension> {
    use Dimension::{Discrete, Negated, Prefix, Range};

    match (left, right) {
        (Range { .. }, Range { .. }) => match (left.as_point(), right.as_point()) {
            (Some(a), Some(b)) => Some(Dimension::discrete([a.clone(), b.clone()])),
            _ => Some(cover_ranges(left, right)),
        },

        (Discrete(a), Discrete(b)) => Some(Discrete(a.union(b).cloned().collect())),

        (range @ Range { .. }, Discrete(values)) | (Discrete(values), range @ Range { .. }) => {
            match range.as_point() {
                Some(point) => {
                    let mut values = values.clone();
                    values.insert(point.clone());
                    Some(Discrete(values))
                }
                None => Some(cover_values(range, values)),
            }
        }

        (Prefix(a), Prefix(b)) => {
            let common = common_prefix(a, b);
            (!common.is_empty()).then(|| Prefix(common.to_string()))
        }

        (Prefix(base), Discrete(values)) | (Discrete(values), Prefix(base)) => values
            .iter()
            .all(|v| v.as_text().is_some_and(|s| s.starts_with(base.as_str())))
            .then(|| Prefix(base.clone())),

        // not(a) or not(b) == not(a and b)
        (Negated(a), Negated(b)) => merge_and(a, b).map(Dimension::negated),

        _ => None,
    }
}

///
/// NOT
///
/// Wraps without renormalizing; double negation is kept structurally.
///

#[must_use]
pub fn merge_not(dimension: Dimension) -> Dimension {
    Dimension::negated(dimension)
}

///
/// Helpers
///

// Disjunction that never widens. `None` when the union has no exact shape,
// since negating a widened cover would exclude matching values.
fn union_exact(left: &Dimension, right: &Dimension) -> Option<Dimension> {
    use Dimension::{Discrete, Negated, Prefix, Range};

    if left.is_empty() {
        return Some(right.clone());
    }
    if right.is_empty() {
        return Some(left.clone());
    }

    match (left, right) {
        (Range { .. }, Range { .. }) => {
            if left.as_point().is_some() && right.as_point().is_some() {
                merge_or(left, right)
            } else {
                ranges_connect(left, right).then(|| cover_ranges(left, right))
            }
        }

        (range @ Range { .. }, Discrete(values)) | (Discrete(values), range @ Range { .. }) => {
            if range.as_point().is_some() {
                merge_or(left, right)
            } else {
                values
                    .iter()
                    .all(|v| range.member(v))
                    .then(|| range.clone())
            }
        }

        (Prefix(a), Prefix(b)) => {
            if a.starts_with(b.as_str()) {
                Some(Prefix(b.clone()))
            } else if b.starts_with(a.as_str()) {
                Some(Prefix(a.clone()))
            } else {
                None
            }
        }

        (Discrete(_), Discrete(_) | Prefix(_))
        | (Prefix(_), Discrete(_))
        | (Negated(_), Negated(_)) => merge_or(left, right),

        _ => None,
    }
}

// Two non-empty ranges overlap or touch, so their cover adds nothing.
fn ranges_connect(left: &Dimension, right: &Dimension) -> bool {
    let (l_min, l_max) = bounds(left);
    let (r_min, r_max) = bounds(right);

    !has_gap(l_max, r_min) && !has_gap(r_max, l_min)
}

// Whether values lie strictly between an upper bound and a lower bound.
fn has_gap(upper: (Option<&Value>, bool), lower: (Option<&Value>, bool)) -> bool {
    match (upper, lower) {
        ((Some(max), max_inclusive), (Some(min), min_inclusive)) => match max.cmp(min) {
            Ordering::Less => true,
            Ordering::Equal => !max_inclusive && !min_inclusive,
            Ordering::Greater => false,
        },
        _ => false,
    }
}

fn filter_set(values: &BTreeSet<Value>, by: &Dimension) -> Dimension {
    Dimension::Discrete(values.iter().filter(|v| by.member(v)).cloned().collect())
}

// Lower bounds: the larger one is tighter. On a tie, exclusive wins.
fn tighter_min(
    a: (Option<&Value>, bool),
    b: (Option<&Value>, bool),
) -> (Option<Value>, bool) {
    match (a, b) {
        ((None, _), (bound, inclusive)) | ((bound, inclusive), (None, _)) => {
            (bound.cloned(), inclusive)
        }
        ((Some(x), xi), (Some(y), yi)) => match x.cmp(y) {
            Ordering::Greater => (Some(x.clone()), xi),
            Ordering::Less => (Some(y.clone()), yi),
            Ordering::Equal => (Some(x.clone()), xi && yi),
        },
    }
}

fn tighter_max(
    a: (Option<&Value>, bool),
    b: (Option<&Value>, bool),
) -> (Option<Value>, bool) {
    match (a, b) {
        ((None, _), (bound, inclusive)) | ((bound, inclusive), (None, _)) => {
            (bound.cloned(), inclusive)
        }
        ((Some(x), xi), (Some(y), yi)) => match x.cmp(y) {
            Ordering::Less => (Some(x.clone()), xi),
            Ordering::Greater => (Some(y.clone()), yi),
            Ordering::Equal => (Some(x.clone()), xi && yi),
        },
    }
}

// Covering bounds: an open side stays open. On a tie, inclusive wins.
fn looser_min(
    a: (Option<&Value>, bool),
    b: (Option<&Value>, bool),
) -> (Option<Value>, bool) {
    match (a, b) {
        ((None, _), _) | (_, (None, _)) => (None, false),
        ((Some(x), xi), (Some(y), yi)) => match x.cmp(y) {
            Ordering::Less => (Some(x.clone()), xi),
            Ordering::Greater => (Some(y.clone()), yi),
            Ordering::Equal => (Some(x.clone()), xi || yi),
        },
    }
}

fn looser_max(
    a: (Option<&Value>, bool),
    b: (Option<&Value>, bool),
) -> (Option<Value>, bool) {
    match (a, b) {
        ((None, _), _) | (_, (None, _)) => (None, false),
        ((Some(x), xi), (Some(y), yi)) => match x.cmp(y) {
            Ordering::Greater => (Some(x.clone()), xi),
            Ordering::Less => (Some(y.clone()), yi),
            Ordering::Equal => (Some(x.clone()), xi || yi),
        },
    }
}

type Bounds<'a> = ((Option<&'a Value>, bool), (Option<&'a Value>, bool));

fn bounds(range: &Dimension) -> Bounds<'_> {
    match range {
        Dimension::Range {
            min,
            max,
            min_inclusive,
            max_inclusive,
        } => ((min.as_ref(), *min_inclusive), (max.as_ref(), *max_inclusive)),
        _ => ((None, false), (None, false)),
    }
}

fn intersect_ranges(left: &Dimension, right: &Dimension) -> Dimension {
    let (l_min, l_max) = bounds(left);
    let (r_min, r_max) = bounds(right);
    let (min, min_inclusive) = tighter_min(l_min, r_min);
    let (max, max_inclusive) = tighter_max(l_max, r_max);

    Dimension::range(min, max, min_inclusive, max_inclusive)
}

fn cover_ranges(left: &Dimension, right: &Dimension) -> Dimension {
    let (l_min, l_max) = bounds(left);
    let (r_min, r_max) = bounds(right);
    let (min, min_inclusive) = looser_min(l_min, r_min);
    let (max, max_inclusive) = looser_max(l_max, r_max);

    Dimension::range(min, max, min_inclusive, max_inclusive)
}

// Smallest range covering `range` and every member of `values`.
fn cover_values(range: &Dimension, values: &BTreeSet<Value>) -> Dimension {
    let (Some(first), Some(last)) = (values.first(), values.last()) else {
        return range.clone();
    };
    let members = Dimension::range(Some(first.clone()), Some(last.clone()), true, true);

    cover_ranges(range, &members)
}

fn common_prefix<'a>(a: &'a str, b: &str) -> &'a str {
    let len = a
        .char_indices()
        .zip(b.chars())
        .take_while(|((_, x), y)| x == y)
        .last()
        .map_or(0, |((i, c), _)| i + c.len_utf8());

    &a[..len]
}
