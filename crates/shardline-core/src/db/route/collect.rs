use crate::{
    db::{
        dimension::{Dimension, DimensionMap},
        route::{BoundParams, StatementContext},
    },
    error::InternalError,
    model::PartitionColumns,
    sql::{CompareOp, Expr, FromItem, InsertSource, PlainSelect, SelectBody, Statement},
    value::Value,
};

///
/// Collection
///
/// Build the dimension map of a bound statement. Only partition-key columns
/// contribute; everything the collector cannot determine statically is left
/// out of the map, which the resolver answers with a broadcast.
///

pub fn collect(ctx: &StatementContext) -> Result<DimensionMap, InternalError> {
    let Some(model) = &ctx.model else {
        return Ok(DimensionMap::new());
    };
    let columns = model.partition_columns()?;
    let collector = DimensionCollector {
        columns: &columns,
        params: &ctx.params,
    };

    match &ctx.statement {
        Statement::Select(body) => collector.select_body(body),

        Statement::Insert(insert) => {
            if insert.columns.is_empty() {
                return Err(InternalError::unroutable(
                    "insert into a partitioned table must name its columns",
                ));
            }
            let InsertSource::Values(values) = &insert.source else {
                return Err(InternalError::unroutable(
                    "insert into a partitioned table cannot read from a sub-select",
                ));
            };

            let mut map = DimensionMap::new();
            for point in &ctx.modification_points {
                if let Some(value) = values.get(point.position).and_then(|e| collector.operand(e)) {
                    map.insert(point.field.clone(), Dimension::point(value));
                }
            }

            Ok(map)
        }

        Statement::Update(update) => {
            let mut map = collector.optional(update.where_clause.as_ref());

            // SET values only fill fields the WHERE clause left undetermined.
            for point in &ctx.modification_points {
                if map.contains_key(&point.field) {
                    continue;
                }
                if let Some(value) = update
                    .sets
                    .get(point.position)
                    .and_then(|(_, e)| collector.operand(e))
                {
                    map.insert(point.field.clone(), Dimension::point(value));
                }
            }

            Ok(map)
        }

        Statement::Delete(delete) => Ok(collector.optional(delete.where_clause.as_ref())),

        Statement::Truncate(_) => Ok(DimensionMap::new()),
    }
}

///
/// DimensionCollector
///

struct DimensionCollector<'a> {
    columns: &'a PartitionColumns,
    params: &'a BoundParams,
}

impl DimensionCollector<'_> {
    fn select_body(&self, body: &SelectBody) -> Result<DimensionMap, InternalError> {
        match body {
            SelectBody::Plain(select) => self.plain_select(select),
            SelectBody::Union { .. } => Err(InternalError::unroutable(
                "union selects over partitioned tables are not supported",
            )),
        }
    }

    fn plain_select(&self, select: &PlainSelect) -> Result<DimensionMap, InternalError> {
        let map = self.optional(select.where_clause.as_ref());

        match &select.from {
            FromItem::Table(_) => Ok(map),
            FromItem::SubSelect { body, .. } => Ok(map.and(self.select_body(body)?)),
        }
    }

    fn optional(&self, predicate: Option<&Expr>) -> DimensionMap {
        predicate.map_or_else(DimensionMap::new, |p| self.expr(p))
    }

    fn expr(&self, expr: &Expr) -> DimensionMap {
        match expr {
            Expr::And(left, right) => self.expr(left).and(self.expr(right)),
            Expr::Or(left, right) => self.expr(left).or(self.expr(right)),
            Expr::Paren { inner, not } => {
                let map = self.expr(inner);
                if *not { map.negate() } else { map }
            }
            Expr::Between {
                expr,
                low,
                high,
                not,
            } => self.field(expr).map_or_else(DimensionMap::new, |field| {
                let low = self.operand(low);
                let high = self.operand(high);
                if low.is_none() && high.is_none() {
                    return DimensionMap::new();
                }
                let (low_inclusive, high_inclusive) = (low.is_some(), high.is_some());
                let dimension = Dimension::range(low, high, low_inclusive, high_inclusive);

                DimensionMap::single(field, negate_if(dimension, *not))
            }),
            Expr::Compare { left, op, right } => self.compare(left, *op, right),
            Expr::InList { expr, list, not } => self.field(expr).map_or_else(DimensionMap::new, |field| {
                self.in_list(list).map_or_else(DimensionMap::new, |dimension| {
                    DimensionMap::single(field, negate_if(dimension, *not))
                })
            }),
            Expr::Like { expr, pattern, not } => self.field(expr).map_or_else(DimensionMap::new, |field| {
                self.operand(pattern)
                    .as_ref()
                    .and_then(Value::as_text)
                    .and_then(like_prefix)
                    .map_or_else(DimensionMap::new, |base| {
                        DimensionMap::single(field, negate_if(Dimension::prefix(base), *not))
                    })
            }),
            Expr::IsNull { .. }
            | Expr::Column(_)
            | Expr::Literal(_)
            | Expr::Param(_)
            | Expr::Function { .. }
            | Expr::SubSelect(_) => DimensionMap::new(),
        }
    }

    fn compare(&self, left: &Expr, op: CompareOp, right: &Expr) -> DimensionMap {
        let (field, op, value) = if let Some(field) = self.field(left) {
            (field, op, self.operand(right))
        } else if let Some(field) = self.field(right) {
            (field, op.flipped(), self.operand(left))
        } else {
            return DimensionMap::new();
        };
        let Some(value) = value else {
            return DimensionMap::new();
        };

        let dimension = match op {
            CompareOp::Eq => Dimension::point(value),
            CompareOp::Ne => Dimension::negated(Dimension::point(value)),
            CompareOp::Gt => Dimension::above(value, false),
            CompareOp::Ge => Dimension::above(value, true),
            CompareOp::Lt => Dimension::below(value, false),
            CompareOp::Le => Dimension::below(value, true),
        };

        DimensionMap::single(field, dimension)
    }

    // Every member must resolve; list-valued parameters are flattened.
    fn in_list(&self, list: &[Expr]) -> Option<Dimension> {
        let mut values = Vec::new();
        for item in list {
            match self.params.resolve(item)? {
                Value::List(items) => {
                    if items.iter().any(Value::is_null) {
                        return None;
                    }
                    values.extend(items);
                }
                value => values.push(value),
            }
        }

        Some(Dimension::discrete(values))
    }

    /// Logical partition field behind a column operand.
    fn field(&self, expr: &Expr) -> Option<String> {
        match expr {
            Expr::Column(column) => self.columns.field_for(&column.name).map(str::to_string),
            _ => None,
        }
    }

    /// Scalar value of a literal or bound parameter operand.
    fn operand(&self, expr: &Expr) -> Option<Value> {
        self.params
            .resolve(expr)
            .filter(|value| !matches!(value, Value::List(_)))
    }
}

fn negate_if(dimension: Dimension, not: bool) -> Dimension {
    if not {
        Dimension::negated(dimension)
    } else {
        dimension
    }
}

/// Base of a `'x%'` pattern: exactly one trailing `%`, no other wildcard,
/// non-empty base.
fn like_prefix(pattern: &str) -> Option<String> {
    let base = pattern.strip_suffix('%')?;
    if base.is_empty() || base.contains(['%', '_']) {
        return None;
    }

    Some(base.to_string())
}
