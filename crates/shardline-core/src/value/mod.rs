mod compare;
mod hash;


use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, fmt};

// re-exports
pub use compare::canonical_cmp;
pub use hash::hash_value;

///
/// Value
///
/// Scalar bound to statement parameters and literals.
///
/// Null  → SQL NULL; never routes and never matches a dimension.
/// List  → multi-valued parameter (e.g. a named parameter bound to a
///         collection and expanded inside `IN (...)`).
///
/// Equality and ordering follow [`canonical_cmp`]: numeric variants compare
/// by numeric value across `Int`, `Uint` and `Float64`.
///

#[derive(Clone, Debug, Deserialize, Serialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float64(f64),
    Text(String),
    Blob(Vec<u8>),
    List(Vec<Self>),
}

impl Value {
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Integral numeric value, if this value is an integer (or an integral
    /// float inside the i128 range).
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn as_i128(&self) -> Option<i128> {
        match self {
            Self::Int(v) => Some(i128::from(*v)),
            Self::Uint(v) => Some(i128::from(*v)),
            Self::Float64(v) if v.is_finite() && v.fract() == 0.0 && v.abs() < 1.0e38 => {
                Some(*v as i128)
            }
            _ => None,
        }
    }

    /// Stable human-readable value kind label for diagnostics.
    #[must_use]
    pub const fn kind_label(&self) -> &'static str {
        match self {
            Self::Null => "Null",
            Self::Bool(_) => "Bool",
            Self::Int(_) => "Int",
            Self::Uint(_) => "Uint",
            Self::Float64(_) => "Float64",
            Self::Text(_) => "Text",
            Self::Blob(_) => "Blob",
            Self::List(_) => "List",
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        canonical_cmp(self, other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        canonical_cmp(self, other)
    }
}

// SQL-literal rendering; used by canonical statement text.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Bool(v) => f.write_str(if *v { "TRUE" } else { "FALSE" }),
            Self::Int(v) => write!(f, "{v}"),
            Self::Uint(v) => write!(f, "{v}"),
            Self::Float64(v) => write!(f, "{v:?}"),
            Self::Text(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Self::Blob(bytes) => {
                f.write_str("X'")?;
                for b in bytes {
                    write!(f, "{b:02X}")?;
                }
                f.write_str("'")
            }
            Self::List(items) => {
                f.write_str("(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str(")")
            }
        }
    }
}

///
/// CONVERSIONS
///

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Self::Uint(u64::from(v))
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Self::Uint(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float64(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}
