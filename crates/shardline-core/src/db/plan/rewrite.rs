use crate::sql::{FromItem, PlainSelect, SelectBody, Statement};

/// Copy of `statement` with its target table replaced by `physical`.
/// Union bodies and insert sources read other tables and are left alone.
pub(super) fn substitute_table(statement: &Statement, physical: &str) -> Statement {
    let mut statement = statement.clone();
    match &mut statement {
        Statement::Select(SelectBody::Plain(select)) => substitute_in_select(select, physical),
        Statement::Select(SelectBody::Union { .. }) => {}
        Statement::Insert(insert) => insert.table = insert.table.renamed(physical),
        Statement::Update(update) => update.table = update.table.renamed(physical),
        Statement::Delete(delete) => delete.table = delete.table.renamed(physical),
        Statement::Truncate(truncate) => truncate.table = truncate.table.renamed(physical),
    }

    statement
}

// The innermost from-table is the target.
fn substitute_in_select(select: &mut PlainSelect, physical: &str) {
    match &mut select.from {
        FromItem::Table(table) => *table = table.renamed(physical),
        FromItem::SubSelect { body, .. } => {
            if let SelectBody::Plain(inner) = body.as_mut() {
                substitute_in_select(inner, physical);
            }
        }
    }
}
