//! Statement boundary consumed from the external SQL parser.
//!
//! This layer is a typed tree only. It carries no routing semantics; the
//! router interprets it. Parameter nodes receive a stable [`ParamSlot`] from
//! one upfront traversal (see [`Statement::walk_params_mut`]), which is the
//! only link between a node and its bound value.

mod display;
mod walk;


use crate::value::Value;
use std::ops::{BitAnd, BitOr};

///
/// Column
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Column {
    pub table: Option<String>,
    pub name: String,
}

impl Column {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            table: None,
            name: name.into(),
        }
    }

    #[must_use]
    pub fn qualified(table: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            table: Some(table.into()),
            name: name.into(),
        }
    }
}

///
/// TableRef
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TableRef {
    pub schema: Option<String>,
    pub name: String,
    pub alias: Option<String>,
}

impl TableRef {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            schema: None,
            name: name.into(),
            alias: None,
        }
    }

    #[must_use]
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Copy of this reference pointing at another physical table.
    /// Alias is kept so column qualifiers stay valid.
    #[must_use]
    pub fn renamed(&self, physical: &str) -> Self {
        Self {
            schema: None,
            name: physical.to_string(),
            alias: self.alias.clone(),
        }
    }
}

///
/// ParamSlot
///
/// Stable index of a parameter node in traversal order.
///

#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct ParamSlot(pub u32);

impl ParamSlot {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

///
/// Param
///
/// Positional (`?`) or named (`:name`) placeholder.
/// A named parameter with `arity > 1` is bound to that many consecutive
/// values (a collection expanded inside `IN`).
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Param {
    pub name: Option<String>,
    pub arity: usize,
    pub slot: Option<ParamSlot>,
}

impl Param {
    #[must_use]
    pub const fn positional() -> Self {
        Self {
            name: None,
            arity: 1,
            slot: None,
        }
    }

    #[must_use]
    pub fn named(name: impl Into<String>, arity: usize) -> Self {
        Self {
            name: Some(name.into()),
            arity,
            slot: None,
        }
    }
}

///
/// CompareOp
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl CompareOp {
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Lt => "<",
            Self::Le => "<=",
        }
    }

    /// Operator with its operands swapped (`5 < x` is `x > 5`).
    #[must_use]
    pub const fn flipped(self) -> Self {
        match self {
            Self::Eq => Self::Eq,
            Self::Ne => Self::Ne,
            Self::Gt => Self::Lt,
            Self::Ge => Self::Le,
            Self::Lt => Self::Gt,
            Self::Le => Self::Ge,
        }
    }
}

///
/// Expr
///

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    And(Box<Self>, Box<Self>),
    Or(Box<Self>, Box<Self>),
    Paren {
        inner: Box<Self>,
        not: bool,
    },
    Between {
        expr: Box<Self>,
        low: Box<Self>,
        high: Box<Self>,
        not: bool,
    },
    Compare {
        left: Box<Self>,
        op: CompareOp,
        right: Box<Self>,
    },
    InList {
        expr: Box<Self>,
        list: Vec<Self>,
        not: bool,
    },
    Like {
        expr: Box<Self>,
        pattern: Box<Self>,
        not: bool,
    },
    IsNull {
        expr: Box<Self>,
        not: bool,
    },
    Column(Column),
    Literal(Value),
    Param(Param),
    /// Function call or arithmetic; never analyzed.
    Function {
        name: String,
        args: Vec<Self>,
    },
    SubSelect(Box<SelectBody>),
}

impl Expr {
    #[must_use]
    pub fn col(name: impl Into<String>) -> Self {
        Self::Column(Column::new(name))
    }

    #[must_use]
    pub fn lit(value: impl Into<Value>) -> Self {
        Self::Literal(value.into())
    }

    #[must_use]
    pub const fn param() -> Self {
        Self::Param(Param::positional())
    }

    #[must_use]
    pub fn named_param(name: impl Into<String>, arity: usize) -> Self {
        Self::Param(Param::named(name, arity))
    }

    #[must_use]
    pub fn compare(left: Self, op: CompareOp, right: Self) -> Self {
        Self::Compare {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    #[must_use]
    pub fn eq(left: Self, right: Self) -> Self {
        Self::compare(left, CompareOp::Eq, right)
    }

    #[must_use]
    pub fn ne(left: Self, right: Self) -> Self {
        Self::compare(left, CompareOp::Ne, right)
    }

    #[must_use]
    pub fn gt(left: Self, right: Self) -> Self {
        Self::compare(left, CompareOp::Gt, right)
    }

    #[must_use]
    pub fn ge(left: Self, right: Self) -> Self {
        Self::compare(left, CompareOp::Ge, right)
    }

    #[must_use]
    pub fn lt(left: Self, right: Self) -> Self {
        Self::compare(left, CompareOp::Lt, right)
    }

    #[must_use]
    pub fn le(left: Self, right: Self) -> Self {
        Self::compare(left, CompareOp::Le, right)
    }

    #[must_use]
    pub fn between(expr: Self, low: Self, high: Self) -> Self {
        Self::Between {
            expr: Box::new(expr),
            low: Box::new(low),
            high: Box::new(high),
            not: false,
        }
    }

    #[must_use]
    pub fn in_list(expr: Self, list: Vec<Self>) -> Self {
        Self::InList {
            expr: Box::new(expr),
            list,
            not: false,
        }
    }

    #[must_use]
    pub fn like(expr: Self, pattern: Self) -> Self {
        Self::Like {
            expr: Box::new(expr),
            pattern: Box::new(pattern),
            not: false,
        }
    }

    #[must_use]
    pub fn paren(inner: Self) -> Self {
        Self::Paren {
            inner: Box::new(inner),
            not: false,
        }
    }

    /// `NOT (inner)`.
    #[must_use]
    pub fn not(inner: Self) -> Self {
        Self::Paren {
            inner: Box::new(inner),
            not: true,
        }
    }

    /// Flip the `NOT` flag of a between / in / like / is-null leaf.
    /// Other expressions are wrapped in a negated parenthesis.
    #[must_use]
    pub fn negated(self) -> Self {
        match self {
            Self::Between {
                expr,
                low,
                high,
                not,
            } => Self::Between {
                expr,
                low,
                high,
                not: !not,
            },
            Self::InList { expr, list, not } => Self::InList {
                expr,
                list,
                not: !not,
            },
            Self::Like { expr, pattern, not } => Self::Like {
                expr,
                pattern,
                not: !not,
            },
            Self::IsNull { expr, not } => Self::IsNull { expr, not: !not },
            other => Self::not(other),
        }
    }
}

impl BitAnd for Expr {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        Self::And(Box::new(self), Box::new(rhs))
    }
}

impl BitOr for Expr {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self::Or(Box::new(self), Box::new(rhs))
    }
}

///
/// SelectItem
///

#[derive(Clone, Debug, PartialEq)]
pub enum SelectItem {
    Wildcard,
    Expr { expr: Expr, alias: Option<String> },
    CountAll,
    CountDistinct(Vec<Expr>),
}

///
/// FromItem
///

#[derive(Clone, Debug, PartialEq)]
pub enum FromItem {
    Table(TableRef),
    SubSelect {
        body: Box<SelectBody>,
        alias: Option<String>,
    },
}

///
/// OrderItem
///

#[derive(Clone, Debug, PartialEq)]
pub struct OrderItem {
    pub expr: Expr,
    pub desc: bool,
}

///
/// Limit
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Limit {
    pub limit: Option<u64>,
    pub offset: u64,
}

///
/// PlainSelect
///

#[derive(Clone, Debug, PartialEq)]
pub struct PlainSelect {
    pub distinct: bool,
    pub items: Vec<SelectItem>,
    pub from: FromItem,
    pub where_clause: Option<Expr>,
    pub group_by: Vec<Expr>,
    pub having: Option<Expr>,
    pub order_by: Vec<OrderItem>,
    pub limit: Option<Limit>,
}

impl PlainSelect {
    /// `SELECT * FROM table`.
    #[must_use]
    pub fn from_table(table: TableRef) -> Self {
        Self {
            distinct: false,
            items: vec![SelectItem::Wildcard],
            from: FromItem::Table(table),
            where_clause: None,
            group_by: Vec::new(),
            having: None,
            order_by: Vec::new(),
            limit: None,
        }
    }

    #[must_use]
    pub fn filter(mut self, predicate: Expr) -> Self {
        self.where_clause = Some(predicate);
        self
    }

    #[must_use]
    pub fn order_by(mut self, column: &str, desc: bool) -> Self {
        self.order_by.push(OrderItem {
            expr: Expr::col(column),
            desc,
        });
        self
    }

    #[must_use]
    pub const fn limit(mut self, limit: Option<u64>, offset: u64) -> Self {
        self.limit = Some(Limit { limit, offset });
        self
    }

    /// Physical table this select reads, when it reads exactly one.
    #[must_use]
    pub const fn table(&self) -> Option<&TableRef> {
        match &self.from {
            FromItem::Table(table) => Some(table),
            FromItem::SubSelect { .. } => None,
        }
    }
}

///
/// SelectBody
///

#[derive(Clone, Debug, PartialEq)]
pub enum SelectBody {
    Plain(Box<PlainSelect>),
    Union { selects: Vec<PlainSelect>, all: bool },
}

///
/// InsertSource
///

#[derive(Clone, Debug, PartialEq)]
pub enum InsertSource {
    Values(Vec<Expr>),
    SubSelect(Box<SelectBody>),
}

///
/// Insert
///

#[derive(Clone, Debug, PartialEq)]
pub struct Insert {
    pub table: TableRef,
    pub columns: Vec<Column>,
    pub source: InsertSource,
}

///
/// Update
///

#[derive(Clone, Debug, PartialEq)]
pub struct Update {
    pub table: TableRef,
    pub sets: Vec<(Column, Expr)>,
    pub where_clause: Option<Expr>,
}

///
/// Delete
///

#[derive(Clone, Debug, PartialEq)]
pub struct Delete {
    pub table: TableRef,
    pub where_clause: Option<Expr>,
}

///
/// Truncate
///

#[derive(Clone, Debug, PartialEq)]
pub struct Truncate {
    pub table: TableRef,
}

///
/// StatementKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
    Truncate,
}

impl StatementKind {
    #[must_use]
    pub const fn is_write(self) -> bool {
        !matches!(self, Self::Select)
    }
}

///
/// Statement
///

#[derive(Clone, Debug, PartialEq)]
pub enum Statement {
    Select(SelectBody),
    Insert(Insert),
    Update(Update),
    Delete(Delete),
    Truncate(Truncate),
}

impl Statement {
    #[must_use]
    pub fn select(select: PlainSelect) -> Self {
        Self::Select(SelectBody::Plain(Box::new(select)))
    }

    #[must_use]
    pub const fn kind(&self) -> StatementKind {
        match self {
            Self::Select(_) => StatementKind::Select,
            Self::Insert(_) => StatementKind::Insert,
            Self::Update(_) => StatementKind::Update,
            Self::Delete(_) => StatementKind::Delete,
            Self::Truncate(_) => StatementKind::Truncate,
        }
    }

    /// The single table this statement targets, if it has one.
    #[must_use]
    pub fn target_table(&self) -> Option<&TableRef> {
        match self {
            Self::Select(SelectBody::Plain(select)) => plain_target_table(select),
            Self::Select(SelectBody::Union { .. }) => None,
            Self::Insert(insert) => Some(&insert.table),
            Self::Update(update) => Some(&update.table),
            Self::Delete(delete) => Some(&delete.table),
            Self::Truncate(truncate) => Some(&truncate.table),
        }
    }

    /// The statement's `WHERE` clause, if it has one.
    #[must_use]
    pub fn where_clause(&self) -> Option<&Expr> {
        match self {
            Self::Select(SelectBody::Plain(select)) => select.where_clause.as_ref(),
            Self::Update(update) => update.where_clause.as_ref(),
            Self::Delete(delete) => delete.where_clause.as_ref(),
            Self::Select(SelectBody::Union { .. }) | Self::Insert(_) | Self::Truncate(_) => None,
        }
    }
}

// Nested from-clause sub-selects read the innermost table.
fn plain_target_table(select: &PlainSelect) -> Option<&TableRef> {
    match &select.from {
        FromItem::Table(table) => Some(table),
        FromItem::SubSelect { body, .. } => match body.as_ref() {
            SelectBody::Plain(inner) => plain_target_table(inner),
            SelectBody::Union { .. } => None,
        },
    }
}
