use crate::db::{
    executor::Row,
    plan::{OrderKey, RowWindow},
};
use std::{cmp::Ordering, iter::Peekable, vec::IntoIter};

/// K-way merge of per-table row streams, each already sorted by `order`.
/// Ties keep stream order, so the merge is stable.
pub(super) fn merge_sorted(streams: Vec<Vec<Row>>, order: &[OrderKey]) -> Vec<Row> {
    let total = streams.iter().map(Vec::len).sum();
    let mut heads: Vec<Peekable<IntoIter<Row>>> = streams
        .into_iter()
        .map(|s| s.into_iter().peekable())
        .collect();
    let mut out = Vec::with_capacity(total);

    loop {
        let mut best: Option<(usize, &Row)> = None;
        for (i, head) in heads.iter_mut().enumerate() {
            let Some(row) = head.peek() else { continue };
            let better = best.is_none_or(|(_, current)| compare_rows(row, current, order).is_lt());
            if better {
                best = Some((i, row));
            }
        }

        let Some((index, _)) = best else { break };
        if let Some(row) = heads[index].next() {
            out.push(row);
        }
    }

    out
}

/// Compare two rows by the order keys; `NULL` and missing columns sort
/// first in ascending order.
pub(super) fn compare_rows(left: &Row, right: &Row, order: &[OrderKey]) -> Ordering {
    for key in order {
        let ordering = left.get(&key.column).cmp(&right.get(&key.column));
        let ordering = if key.desc { ordering.reverse() } else { ordering };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }

    Ordering::Equal
}

pub(super) fn apply_window(rows: Vec<Row>, window: RowWindow) -> Vec<Row> {
    let offset = usize::try_from(window.offset).unwrap_or(usize::MAX);
    let limit = window
        .limit
        .map_or(usize::MAX, |n| usize::try_from(n).unwrap_or(usize::MAX));

    rows.into_iter().skip(offset).take(limit).collect()
}
