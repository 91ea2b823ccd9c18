use crate::{
    error::{InternalError, RouteError},
    sql::{Expr, Param, ParamSlot, Statement},
    value::Value,
};

///
/// BoundParams
///
/// Bound values reconciled against the statement's parameter slots.
/// Slot `i` holds the value of the `i`-th parameter node in traversal order;
/// a named parameter with arity `n > 1` holds a `Value::List` of its `n`
/// consecutive values.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct BoundParams {
    slots: Vec<Value>,
    values: Vec<Value>,
}

impl BoundParams {
    /// Stamp every parameter node of `statement` with its slot and pair the
    /// slots with `values`. The count must match exactly.
    pub fn bind(statement: &mut Statement, values: Vec<Value>) -> Result<Self, InternalError> {
        let expected = statement.assign_param_slots();
        if expected != values.len() {
            return Err(InternalError::route(RouteError::ParameterMismatch {
                expected,
                found: values.len(),
            }));
        }

        let mut slots = Vec::new();
        let mut cursor = 0usize;
        statement.walk_params(&mut |param| {
            let arity = param.arity.max(1);
            let taken = values.get(cursor..cursor + arity).unwrap_or_default();
            let slot = if param.arity > 1 {
                Value::List(taken.to_vec())
            } else {
                taken.first().cloned().unwrap_or(Value::Null)
            };
            slots.push(slot);
            cursor += arity;
        });

        Ok(Self { slots, values })
    }

    #[must_use]
    pub fn get(&self, slot: ParamSlot) -> Option<&Value> {
        self.slots.get(slot.index())
    }

    /// Supplied values, flat and in order.
    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    #[must_use]
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    /// Static value of an operand: a literal or a bound parameter.
    /// `NULL`, expressions, sub-queries and unbound placeholders resolve to
    /// nothing.
    #[must_use]
    pub fn resolve(&self, expr: &Expr) -> Option<Value> {
        let value = match expr {
            Expr::Literal(value) => value.clone(),
            Expr::Param(param) => self.get(param.slot?)?.clone(),
            _ => return None,
        };

        (!value.is_null()).then_some(value)
    }

    /// Flat values consumed by the parameter nodes inside `expr`, in order.
    #[must_use]
    pub fn values_in(&self, expr: &Expr) -> Vec<Value> {
        let mut out = Vec::new();
        expr.walk_params(&mut |param| self.push_flat(param, &mut out));

        out
    }

    /// Flat values for a rewritten copy of the bound statement. Parameter
    /// nodes keep their slots through rewrites, so dropped clauses drop
    /// their values too.
    #[must_use]
    pub fn values_for(&self, statement: &Statement) -> Vec<Value> {
        let mut out = Vec::new();
        statement.walk_params(&mut |param| self.push_flat(param, &mut out));

        out
    }

    fn push_flat(&self, param: &Param, out: &mut Vec<Value>) {
        match param.slot.and_then(|slot| self.get(slot)) {
            Some(Value::List(items)) if param.arity > 1 => out.extend(items.iter().cloned()),
            Some(value) => out.push(value.clone()),
            None => {}
        }
    }
}

///
/// TESTS
///
