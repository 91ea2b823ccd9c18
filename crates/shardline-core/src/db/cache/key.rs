use crate::{
    sql::{Expr, PlainSelect},
    value::Value,
};
use sha2::{Digest, Sha256};
use std::fmt::{self, Write as _};

///
/// KeyDimension
///
/// Signature of a predicate's shape: normalized predicate text plus the
/// dialect, hashed. Structurally identical predicates collapse to the same
/// signature whatever their routing meaning.
///

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct KeyDimension([u8; 32]);

impl KeyDimension {
    /// Signature of raw predicate text and an optional select shape
    /// (projection, grouping, ordering, window).
    #[must_use]
    pub fn new(predicate: Option<&str>, shape: Option<&str>, dialect: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"keydim:v1");

        write_tag(&mut hasher, 0x01);
        write_opt_text(&mut hasher, predicate);

        write_tag(&mut hasher, 0x02);
        write_opt_text(&mut hasher, shape);

        write_tag(&mut hasher, 0x03);
        write_str(&mut hasher, &dialect.to_ascii_lowercase());

        let digest = hasher.finalize();
        let mut out = [0u8; 32];
        out.copy_from_slice(&digest);

        Self(out)
    }

    /// Signature of a write's (or a plain row select's) `WHERE` clause.
    #[must_use]
    pub fn for_predicate(predicate: Option<&Expr>, dialect: &str) -> Self {
        let text = predicate.map(ToString::to_string);

        Self::new(text.as_deref(), None, dialect)
    }

    /// Signature of a select. A `SELECT *` without grouping, ordering or
    /// window shares the signature of its bare `WHERE` clause, so writes
    /// with the same predicate address the same bucket.
    #[must_use]
    pub fn for_select(select: &PlainSelect, dialect: &str) -> Self {
        let predicate = select.where_clause.as_ref().map(ToString::to_string);
        let shape = select.shape_text();

        Self::new(predicate.as_deref(), shape.as_deref(), dialect)
    }

    #[must_use]
    pub fn as_hex(&self) -> String {
        let mut out = String::with_capacity(64);
        for byte in self.0 {
            let _ = write!(out, "{byte:02x}");
        }
        out
    }
}

impl fmt::Display for KeyDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // short form is enough to tell buckets apart in logs
        f.write_str(&self.as_hex()[..16])
    }
}

///
/// CacheKey
///

#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct CacheKey {
    pub table: String,
    pub dimension: KeyDimension,
    pub params: Vec<Value>,
}

impl CacheKey {
    #[must_use]
    pub fn new(table: impl Into<String>, dimension: KeyDimension, params: Vec<Value>) -> Self {
        Self {
            table: normalize_table(&table.into()),
            dimension,
            params,
        }
    }
}

/// Table names are matched case-insensitively.
pub(crate) fn normalize_table(table: &str) -> String {
    table.to_ascii_lowercase()
}

/// Collapse whitespace runs and upper-case everything outside single-quoted
/// literals.
pub(crate) fn normalize_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_literal = false;
    let mut pending_space = false;

    for ch in text.chars() {
        if in_literal {
            out.push(ch);
            if ch == '\'' {
                in_literal = false;
            }
            continue;
        }
        if ch.is_whitespace() {
            pending_space = !out.is_empty();
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        if ch == '\'' {
            in_literal = true;
        }
        out.push(ch.to_ascii_uppercase());
    }

    out
}

///
/// Hash helpers
///

fn write_tag(hasher: &mut Sha256, tag: u8) {
    hasher.update([tag]);
}

fn write_len_u32(hasher: &mut Sha256, len: usize) {
    let len = u32::try_from(len).unwrap_or(u32::MAX);
    hasher.update(len.to_be_bytes());
}

fn write_str(hasher: &mut Sha256, value: &str) {
    write_len_u32(hasher, value.len());
    hasher.update(value.as_bytes());
}

fn write_opt_text(hasher: &mut Sha256, text: Option<&str>) {
    match text {
        Some(text) => {
            write_tag(hasher, 0x01);
            write_str(hasher, &normalize_text(text));
        }
        None => write_tag(hasher, 0x00),
    }
}
