//! In-process evaluation of the read pipeline.
//!
//! The memory engine runs every stage here. The PostgreSQL engine falls
//! back to [`order_rows`] and [`apply_window`] when the ordering key points
//! into an included relation that only exists after includes are attached.

use std::cmp::Ordering;

use serde_json::Value;

use shipping_core::specification::{Include, IncludeKind, Window};
use shipping_core::traits::StoredRow;
use shipping_core::traits::storage::key_text;
use shipping_core::types::filter::lookup_path;
use shipping_core::types::{SortDirection, SortField};

/// Sort rows by `order`, then by primary key ascending.
///
/// Missing and null values sort after every present value when ascending
/// and before them when descending.
pub(crate) fn order_rows(rows: &mut [StoredRow], order: Option<&SortField>) {
    rows.sort_by(|a, b| {
        let explicit = order.map_or(Ordering::Equal, |order| {
            let ordering = compare_values(
                present(lookup_path(&a.body, &order.field)),
                present(lookup_path(&b.body, &order.field)),
            );
            match order.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        });
        explicit.then_with(|| a.key.cmp(&b.key))
    });
}

/// Keep only the rows inside `window`.
pub(crate) fn apply_window(rows: Vec<StoredRow>, window: Option<Window>) -> Vec<StoredRow> {
    match window {
        Some(window) => {
            let range = window.bounds(rows.len());
            rows.into_iter()
                .skip(range.start)
                .take(range.end - range.start)
                .collect()
        }
        None => rows,
    }
}

/// Pick the target rows an include needs for `values`.
pub(crate) fn select_related<'a>(
    include: &Include,
    candidates: impl Iterator<Item = &'a StoredRow>,
    values: &[String],
) -> Vec<StoredRow> {
    candidates
        .filter(|row| {
            let related_key = match include.kind {
                IncludeKind::Reference { .. } => Some(row.key.clone()),
                IncludeKind::Collection { foreign_key } => {
                    lookup_path(&row.body, foreign_key).and_then(key_text)
                }
            };
            related_key.is_some_and(|key| values.binary_search(&key).is_ok())
        })
        .cloned()
        .collect()
}

fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => compare_json(a, b),
    }
}

/// Total order over JSON values: strings, then numbers, then booleans,
/// then arrays, then objects.
fn compare_json(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (Value::Number(a), Value::Number(b)) => {
            let a = a.as_f64().unwrap_or(f64::NAN);
            let b = b.as_f64().unwrap_or(f64::NAN);
            a.total_cmp(&b)
        }
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Array(a), Value::Array(b)) => a
            .iter()
            .zip(b.iter())
            .map(|(a, b)| compare_json(a, b))
            .find(|ordering| ordering.is_ne())
            .unwrap_or_else(|| a.len().cmp(&b.len())),
        _ => rank(a).cmp(&rank(b)),
    }
}

fn rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::String(_) => 1,
        Value::Number(_) => 2,
        Value::Bool(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(key: &str, body: Value) -> StoredRow {
        StoredRow {
            key: key.to_string(),
            version: 1,
            body,
        }
    }

    fn keys(rows: &[StoredRow]) -> Vec<&str> {
        rows.iter().map(|r| r.key.as_str()).collect()
    }

    #[test]
    fn test_order_falls_back_to_key() {
        let mut rows = vec![
            row("c", json!({ "name": "Alex" })),
            row("a", json!({ "name": "Cairo" })),
            row("b", json!({ "name": "Alex" })),
        ];
        order_rows(&mut rows, Some(&SortField::asc("name")));
        assert_eq!(keys(&rows), ["b", "c", "a"]);

        order_rows(&mut rows, None);
        assert_eq!(keys(&rows), ["a", "b", "c"]);
    }

    #[test]
    fn test_nulls_sort_last_ascending_first_descending() {
        let mut rows = vec![
            row("a", json!({ "price": null })),
            row("b", json!({ "price": 20 })),
            row("c", json!({})),
            row("d", json!({ "price": 5.5 })),
        ];
        order_rows(&mut rows, Some(&SortField::asc("price")));
        assert_eq!(keys(&rows), ["d", "b", "a", "c"]);

        order_rows(&mut rows, Some(&SortField::desc("price")));
        assert_eq!(keys(&rows), ["a", "c", "b", "d"]);
    }

    #[test]
    fn test_order_by_nested_path() {
        let mut rows = vec![
            row("1", json!({ "city": { "name": "Tanta" } })),
            row("2", json!({ "city": { "name": "Aswan" } })),
        ];
        order_rows(&mut rows, Some(&SortField::asc("city.name")));
        assert_eq!(keys(&rows), ["2", "1"]);
    }

    #[test]
    fn test_window_past_end_is_empty() {
        let rows: Vec<StoredRow> = (0..5).map(|i| row(&i.to_string(), json!({}))).collect();
        assert_eq!(apply_window(rows.clone(), Some(Window::new(3, 10))).len(), 2);
        assert!(apply_window(rows.clone(), Some(Window::new(10, 10))).is_empty());
        assert_eq!(apply_window(rows, None).len(), 5);
    }
}
