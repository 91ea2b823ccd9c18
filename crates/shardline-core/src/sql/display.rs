use crate::sql::{
    Column, Expr, FromItem, InsertSource, Limit, Param, PlainSelect, SelectBody, SelectItem,
    Statement, TableRef,
};
use std::fmt::{self, Display, Write};

///
/// Canonical text rendering
///
/// Deterministic for a given tree. The cache derives predicate signatures
/// from it, so structurally equal trees must render identically.
///

impl Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.table {
            Some(table) => write!(f, "{table}.{}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

impl Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(schema) = &self.schema {
            write!(f, "{schema}.")?;
        }
        f.write_str(&self.name)?;
        if let Some(alias) = &self.alias {
            write!(f, " {alias}")?;
        }

        Ok(())
    }
}

impl Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, ":{name}"),
            None => f.write_char('?'),
        }
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::And(left, right) => {
                write_junction_side(f, left, false)?;
                f.write_str(" AND ")?;
                write_junction_side(f, right, false)
            }
            Self::Or(left, right) => {
                write_junction_side(f, left, true)?;
                f.write_str(" OR ")?;
                write_junction_side(f, right, true)
            }
            Self::Paren { inner, not } => {
                if *not {
                    f.write_str("NOT ")?;
                }
                write!(f, "({inner})")
            }
            Self::Between {
                expr,
                low,
                high,
                not,
            } => write!(f, "{expr} {}BETWEEN {low} AND {high}", not_kw(*not)),
            Self::Compare { left, op, right } => write!(f, "{left} {} {right}", op.symbol()),
            Self::InList { expr, list, not } => {
                write!(f, "{expr} {}IN (", not_kw(*not))?;
                write_list(f, list)?;
                f.write_char(')')
            }
            Self::Like { expr, pattern, not } => {
                write!(f, "{expr} {}LIKE {pattern}", not_kw(*not))
            }
            Self::IsNull { expr, not } => write!(f, "{expr} IS {}NULL", not_kw(*not)),
            Self::Column(column) => column.fmt(f),
            Self::Literal(value) => value.fmt(f),
            Self::Param(param) => param.fmt(f),
            Self::Function { name, args } => {
                write!(f, "{}(", name.to_ascii_uppercase())?;
                write_list(f, args)?;
                f.write_char(')')
            }
            Self::SubSelect(body) => write!(f, "({body})"),
        }
    }
}

// A junction nested inside the other junction kind is parenthesized so the
// rendering stays unambiguous.
fn write_junction_side(f: &mut fmt::Formatter<'_>, side: &Expr, in_or: bool) -> fmt::Result {
    let needs_parens = match side {
        Expr::And(..) => in_or,
        Expr::Or(..) => !in_or,
        _ => false,
    };

    if needs_parens {
        write!(f, "({side})")
    } else {
        side.fmt(f)
    }
}

const fn not_kw(not: bool) -> &'static str {
    if not { "NOT " } else { "" }
}

fn write_list<T: Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        item.fmt(f)?;
    }

    Ok(())
}

impl Display for SelectItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Wildcard => f.write_char('*'),
            Self::Expr { expr, alias } => {
                expr.fmt(f)?;
                if let Some(alias) = alias {
                    write!(f, " AS {alias}")?;
                }
                Ok(())
            }
            Self::CountAll => f.write_str("COUNT(*)"),
            Self::CountDistinct(exprs) => {
                f.write_str("COUNT(DISTINCT ")?;
                write_list(f, exprs)?;
                f.write_char(')')
            }
        }
    }
}

impl Display for FromItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Table(table) => table.fmt(f),
            Self::SubSelect { body, alias } => {
                write!(f, "({body})")?;
                if let Some(alias) = alias {
                    write!(f, " {alias}")?;
                }
                Ok(())
            }
        }
    }
}

impl Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(limit) = self.limit {
            write!(f, "LIMIT {limit}")?;
            if self.offset > 0 {
                f.write_char(' ')?;
            }
        }
        if self.offset > 0 {
            write!(f, "OFFSET {}", self.offset)?;
        }

        Ok(())
    }
}

impl PlainSelect {
    /// Everything after the `WHERE` clause plus the projection, rendered
    /// canonically. `None` for `SELECT *` with no grouping, ordering or
    /// window, i.e. when the where clause alone determines the rows.
    #[must_use]
    pub fn shape_text(&self) -> Option<String> {
        let plain_rows = !self.distinct
            && matches!(self.items.as_slice(), [SelectItem::Wildcard])
            && self.group_by.is_empty()
            && self.having.is_none()
            && self.order_by.is_empty()
            && self.limit.is_none();
        if plain_rows {
            return None;
        }

        Some(SelectShape(self).to_string().trim().to_string())
    }
}

// Projection and tail of a select, without its from and where clauses.
struct SelectShape<'a>(&'a PlainSelect);

impl fmt::Display for SelectShape<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_projection(f, self.0)?;
        write_tail(f, self.0)
    }
}

fn write_projection(out: &mut impl Write, select: &PlainSelect) -> fmt::Result {
    if select.distinct {
        out.write_str("DISTINCT ")?;
    }
    for (i, item) in select.items.iter().enumerate() {
        if i > 0 {
            out.write_str(", ")?;
        }
        write!(out, "{item}")?;
    }

    Ok(())
}

fn write_tail(out: &mut impl Write, select: &PlainSelect) -> fmt::Result {
    if !select.group_by.is_empty() {
        out.write_str(" GROUP BY ")?;
        for (i, expr) in select.group_by.iter().enumerate() {
            if i > 0 {
                out.write_str(", ")?;
            }
            write!(out, "{expr}")?;
        }
    }
    if let Some(having) = &select.having {
        write!(out, " HAVING {having}")?;
    }
    if !select.order_by.is_empty() {
        out.write_str(" ORDER BY ")?;
        for (i, item) in select.order_by.iter().enumerate() {
            if i > 0 {
                out.write_str(", ")?;
            }
            write!(out, "{}", item.expr)?;
            if item.desc {
                out.write_str(" DESC")?;
            }
        }
    }
    if let Some(limit) = &select.limit
        && (limit.limit.is_some() || limit.offset > 0)
    {
        write!(out, " {limit}")?;
    }

    Ok(())
}

impl Display for PlainSelect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SELECT ")?;
        write_projection(f, self)?;
        write!(f, " FROM {}", self.from)?;
        if let Some(predicate) = &self.where_clause {
            write!(f, " WHERE {predicate}")?;
        }

        write_tail(f, self)
    }
}

impl Display for SelectBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain(select) => select.fmt(f),
            Self::Union { selects, all } => {
                let joint = if *all { " UNION ALL " } else { " UNION " };
                for (i, select) in selects.iter().enumerate() {
                    if i > 0 {
                        f.write_str(joint)?;
                    }
                    select.fmt(f)?;
                }
                Ok(())
            }
        }
    }
}

impl Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Select(body) => body.fmt(f),
            Self::Insert(insert) => {
                write!(f, "INSERT INTO {} (", insert.table)?;
                write_list(f, &insert.columns)?;
                f.write_str(") ")?;
                match &insert.source {
                    InsertSource::Values(values) => {
                        f.write_str("VALUES (")?;
                        write_list(f, values)?;
                        f.write_char(')')
                    }
                    InsertSource::SubSelect(body) => body.fmt(f),
                }
            }
            Self::Update(update) => {
                write!(f, "UPDATE {} SET ", update.table)?;
                for (i, (column, value)) in update.sets.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{column} = {value}")?;
                }
                if let Some(predicate) = &update.where_clause {
                    write!(f, " WHERE {predicate}")?;
                }
                Ok(())
            }
            Self::Delete(delete) => {
                write!(f, "DELETE FROM {}", delete.table)?;
                if let Some(predicate) = &delete.where_clause {
                    write!(f, " WHERE {predicate}")?;
                }
                Ok(())
            }
            Self::Truncate(truncate) => write!(f, "TRUNCATE TABLE {}", truncate.table),
        }
    }
}
