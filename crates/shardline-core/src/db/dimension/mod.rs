//! Constraint shapes over a single field and their boolean merge algebra.
//!
//! A [`DimensionMap`] is the static knowledge routing has about a statement:
//! each present field carries the set of values it may take. A field absent
//! from the map is "not statically determinable" and always forces a
//! broadcast; it is never an error.

mod merge;


use crate::value::Value;
use derive_more::{Deref, IntoIterator};
use std::collections::{BTreeMap, BTreeSet};

// re-exports
pub use merge::{merge_and, merge_not, merge_or};

///
/// Dimension
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Dimension {
    /// Interval; an absent bound is open ended.
    Range {
        min: Option<Value>,
        max: Option<Value>,
        min_inclusive: bool,
        max_inclusive: bool,
    },
    /// Explicit value set, produced by `IN`.
    Discrete(BTreeSet<Value>),
    /// Text prefix, produced by `LIKE 'x%'`.
    Prefix(String),
    /// Structural complement. Never normalized away.
    Negated(Box<Self>),
}

impl Dimension {
    /// Closed point range `[value, value]`.
    #[must_use]
    pub fn point(value: Value) -> Self {
        Self::Range {
            min: Some(value.clone()),
            max: Some(value),
            min_inclusive: true,
            max_inclusive: true,
        }
    }

    #[must_use]
    pub const fn range(
        min: Option<Value>,
        max: Option<Value>,
        min_inclusive: bool,
        max_inclusive: bool,
    ) -> Self {
        Self::Range {
            min,
            max,
            min_inclusive,
            max_inclusive,
        }
    }

    /// Lower bound only (`> v` or `>= v`).
    #[must_use]
    pub const fn above(value: Value, inclusive: bool) -> Self {
        Self::range(Some(value), None, inclusive, false)
    }

    /// Upper bound only (`< v` or `<= v`).
    #[must_use]
    pub const fn below(value: Value, inclusive: bool) -> Self {
        Self::range(None, Some(value), false, inclusive)
    }

    #[must_use]
    pub fn discrete(values: impl IntoIterator<Item = Value>) -> Self {
        Self::Discrete(values.into_iter().collect())
    }

    #[must_use]
    pub fn prefix(base: impl Into<String>) -> Self {
        Self::Prefix(base.into())
    }

    #[must_use]
    pub fn negated(inner: Self) -> Self {
        Self::Negated(Box::new(inner))
    }

    /// Whether `value` satisfies this constraint. `NULL` satisfies nothing,
    /// including a negation.
    #[must_use]
    pub fn member(&self, value: &Value) -> bool {
        if value.is_null() {
            return false;
        }

        match self {
            Self::Range {
                min,
                max,
                min_inclusive,
                max_inclusive,
            } => {
                let above_min = min.as_ref().is_none_or(|min| {
                    if *min_inclusive {
                        value >= min
                    } else {
                        value > min
                    }
                });
                let below_max = max.as_ref().is_none_or(|max| {
                    if *max_inclusive {
                        value <= max
                    } else {
                        value < max
                    }
                });

                above_min && below_max
            }
            Self::Discrete(values) => values.contains(value),
            Self::Prefix(base) => value.as_text().is_some_and(|s| s.starts_with(base.as_str())),
            Self::Negated(inner) => !inner.member(value),
        }
    }

    /// The single value of a closed point range.
    #[must_use]
    pub fn as_point(&self) -> Option<&Value> {
        match self {
            Self::Range {
                min: Some(min),
                max: Some(max),
                min_inclusive: true,
                max_inclusive: true,
            } if min == max => Some(min),
            _ => None,
        }
    }

    /// Provably matches no value.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Range {
                min: Some(min),
                max: Some(max),
                min_inclusive,
                max_inclusive,
            } => min > max || (min == max && !(*min_inclusive && *max_inclusive)),
            Self::Discrete(values) => values.is_empty(),
            Self::Range { .. } | Self::Prefix(_) | Self::Negated(_) => false,
        }
    }
}

///
/// DimensionMap
///
/// Ordered field name → dimension map.
///

#[derive(Clone, Debug, Default, Deref, Eq, IntoIterator, PartialEq)]
#[into_iterator(owned, ref)]
pub struct DimensionMap(BTreeMap<String, Dimension>);

impl DimensionMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn single(field: impl Into<String>, dimension: Dimension) -> Self {
        let mut map = Self::new();
        map.insert(field, dimension);
        map
    }

    pub fn insert(&mut self, field: impl Into<String>, dimension: Dimension) {
        self.0.insert(field.into(), dimension);
    }

    /// Field-wise conjunction. A field on one side only stands unchanged;
    /// a pair without a defined merge drops the field.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        self.combine(other, merge_and)
    }

    /// Field-wise disjunction.
    ///
    /// A field present on only one side keeps that side's constraint, even
    /// though the other branch leaves the field unconstrained. Routing
    /// relies on this narrower result as-is.
    #[must_use]
    pub fn or(self, other: Self) -> Self {
        self.combine(other, merge_or)
    }

    /// Wrap every field in [`Dimension::Negated`].
    #[must_use]
    pub fn negate(self) -> Self {
        Self(
            self.0
                .into_iter()
                .map(|(field, dim)| (field, merge_not(dim)))
                .collect(),
        )
    }

    fn combine(
        mut self,
        other: Self,
        merge: impl Fn(&Dimension, &Dimension) -> Option<Dimension>,
    ) -> Self {
        for (field, right) in other.0 {
            match self.0.remove(&field) {
                Some(left) => {
                    if let Some(merged) = merge(&left, &right) {
                        self.0.insert(field, merged);
                    }
                }
                None => {
                    self.0.insert(field, right);
                }
            }
        }

        self
    }
}

impl FromIterator<(String, Dimension)> for DimensionMap {
    fn from_iter<I: IntoIterator<Item = (String, Dimension)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
