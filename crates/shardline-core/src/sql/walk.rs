use crate::sql::{
    Expr, FromItem, InsertSource, Param, ParamSlot, PlainSelect, SelectBody, SelectItem, Statement,
};

///
/// Parameter traversal
///
/// Order is fixed and shared by slot assignment and every later lookup:
/// select list, from sub-select, where, group by, having, order by for
/// selects; column values for inserts; set expressions then where for
/// updates; where for deletes.
///

impl Statement {
    /// Visit every parameter node in traversal order.
    pub fn walk_params(&self, f: &mut impl FnMut(&Param)) {
        match self {
            Self::Select(body) => body.walk_params(f),
            Self::Insert(insert) => match &insert.source {
                InsertSource::Values(values) => values.iter().for_each(|v| v.walk_params(f)),
                InsertSource::SubSelect(body) => body.walk_params(f),
            },
            Self::Update(update) => {
                for (_, value) in &update.sets {
                    value.walk_params(f);
                }
                if let Some(predicate) = &update.where_clause {
                    predicate.walk_params(f);
                }
            }
            Self::Delete(delete) => {
                if let Some(predicate) = &delete.where_clause {
                    predicate.walk_params(f);
                }
            }
            Self::Truncate(_) => {}
        }
    }

    /// Visit every parameter node mutably in traversal order.
    pub fn walk_params_mut(&mut self, f: &mut impl FnMut(&mut Param)) {
        match self {
            Self::Select(body) => body.walk_params_mut(f),
            Self::Insert(insert) => match &mut insert.source {
                InsertSource::Values(values) => {
                    values.iter_mut().for_each(|v| v.walk_params_mut(f));
                }
                InsertSource::SubSelect(body) => body.walk_params_mut(f),
            },
            Self::Update(update) => {
                for (_, value) in &mut update.sets {
                    value.walk_params_mut(f);
                }
                if let Some(predicate) = &mut update.where_clause {
                    predicate.walk_params_mut(f);
                }
            }
            Self::Delete(delete) => {
                if let Some(predicate) = &mut delete.where_clause {
                    predicate.walk_params_mut(f);
                }
            }
            Self::Truncate(_) => {}
        }
    }

    /// Stamp a slot on every parameter node and return the number of bound
    /// values the statement consumes (named parameters count their arity).
    pub fn assign_param_slots(&mut self) -> usize {
        let mut next = 0u32;
        let mut values = 0usize;
        self.walk_params_mut(&mut |param| {
            param.slot = Some(ParamSlot(next));
            next += 1;
            values += param.arity.max(1);
        });

        values
    }
}

impl SelectBody {
    pub fn walk_params(&self, f: &mut impl FnMut(&Param)) {
        match self {
            Self::Plain(select) => select.walk_params(f),
            Self::Union { selects, .. } => selects.iter().for_each(|s| s.walk_params(f)),
        }
    }

    pub fn walk_params_mut(&mut self, f: &mut impl FnMut(&mut Param)) {
        match self {
            Self::Plain(select) => select.walk_params_mut(f),
            Self::Union { selects, .. } => {
                selects.iter_mut().for_each(|s| s.walk_params_mut(f));
            }
        }
    }
}

impl PlainSelect {
    pub fn walk_params(&self, f: &mut impl FnMut(&Param)) {
        for item in &self.items {
            match item {
                SelectItem::Expr { expr, .. } => expr.walk_params(f),
                SelectItem::CountDistinct(exprs) => exprs.iter().for_each(|e| e.walk_params(f)),
                SelectItem::Wildcard | SelectItem::CountAll => {}
            }
        }
        if let FromItem::SubSelect { body, .. } = &self.from {
            body.walk_params(f);
        }
        if let Some(predicate) = &self.where_clause {
            predicate.walk_params(f);
        }
        self.group_by.iter().for_each(|e| e.walk_params(f));
        if let Some(having) = &self.having {
            having.walk_params(f);
        }
        self.order_by.iter().for_each(|o| o.expr.walk_params(f));
    }

    pub fn walk_params_mut(&mut self, f: &mut impl FnMut(&mut Param)) {
        for item in &mut self.items {
            match item {
                SelectItem::Expr { expr, .. } => expr.walk_params_mut(f),
                SelectItem::CountDistinct(exprs) => {
                    exprs.iter_mut().for_each(|e| e.walk_params_mut(f));
                }
                SelectItem::Wildcard | SelectItem::CountAll => {}
            }
        }
        if let FromItem::SubSelect { body, .. } = &mut self.from {
            body.walk_params_mut(f);
        }
        if let Some(predicate) = &mut self.where_clause {
            predicate.walk_params_mut(f);
        }
        self.group_by.iter_mut().for_each(|e| e.walk_params_mut(f));
        if let Some(having) = &mut self.having {
            having.walk_params_mut(f);
        }
        self.order_by
            .iter_mut()
            .for_each(|o| o.expr.walk_params_mut(f));
    }
}

impl Expr {
    pub fn walk_params(&self, f: &mut impl FnMut(&Param)) {
        match self {
            Self::And(left, right) | Self::Or(left, right) => {
                left.walk_params(f);
                right.walk_params(f);
            }
            Self::Paren { inner, .. } => inner.walk_params(f),
            Self::Between {
                expr, low, high, ..
            } => {
                expr.walk_params(f);
                low.walk_params(f);
                high.walk_params(f);
            }
            Self::Compare { left, right, .. } => {
                left.walk_params(f);
                right.walk_params(f);
            }
            Self::InList { expr, list, .. } => {
                expr.walk_params(f);
                list.iter().for_each(|e| e.walk_params(f));
            }
            Self::Like { expr, pattern, .. } => {
                expr.walk_params(f);
                pattern.walk_params(f);
            }
            Self::IsNull { expr, .. } => expr.walk_params(f),
            Self::Function { args, .. } => args.iter().for_each(|e| e.walk_params(f)),
            Self::SubSelect(body) => body.walk_params(f),
            Self::Param(param) => f(param),
            Self::Column(_) | Self::Literal(_) => {}
        }
    }

    pub fn walk_params_mut(&mut self, f: &mut impl FnMut(&mut Param)) {
        match self {
            Self::And(left, right) | Self::Or(left, right) => {
                left.walk_params_mut(f);
                right.walk_params_mut(f);
            }
            Self::Paren { inner, .. } => inner.walk_params_mut(f),
            Self::Between {
                expr, low, high, ..
            } => {
                expr.walk_params_mut(f);
                low.walk_params_mut(f);
                high.walk_params_mut(f);
            }
            Self::Compare { left, right, .. } => {
                left.walk_params_mut(f);
                right.walk_params_mut(f);
            }
            Self::InList { expr, list, .. } => {
                expr.walk_params_mut(f);
                list.iter_mut().for_each(|e| e.walk_params_mut(f));
            }
            Self::Like { expr, pattern, .. } => {
                expr.walk_params_mut(f);
                pattern.walk_params_mut(f);
            }
            Self::IsNull { expr, .. } => expr.walk_params_mut(f),
            Self::Function { args, .. } => args.iter_mut().for_each(|e| e.walk_params_mut(f)),
            Self::SubSelect(body) => body.walk_params_mut(f),
            Self::Param(param) => f(param),
            Self::Column(_) | Self::Literal(_) => {}
        }
    }
}
