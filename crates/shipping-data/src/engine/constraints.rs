//! Table constraint checks shared by the storage engines.

use serde_json::Value;

use shipping_core::traits::TableDef;
use shipping_core::traits::storage::key_text;
use shipping_core::types::filter::lookup_path;
use shipping_core::{AppError, AppResult};

/// Fail when a required field is missing or null.
pub(crate) fn check_required(table: &TableDef, body: &Value) -> AppResult<()> {
    for field in table.required {
        if lookup_path(body, field).is_none_or(Value::is_null) {
            return Err(AppError::constraint_violation(format!(
                "null value in required field '{field}' of '{}'",
                table.name
            )));
        }
    }
    Ok(())
}

/// The values of one unique set, or `None` when any of them is null.
///
/// Nulls never collide, as with SQL unique indexes.
pub(crate) fn unique_tuple<'a>(set: &[&str], body: &'a Value) -> Option<Vec<&'a Value>> {
    set.iter()
        .map(|field| lookup_path(body, field).filter(|v| !v.is_null()))
        .collect()
}

/// Fail when another row in `rows` shares a unique set with `body`.
pub(crate) fn check_unique<'a, I>(table: &TableDef, key: &str, body: &Value, rows: I) -> AppResult<()>
where
    I: IntoIterator<Item = (&'a String, &'a Value)> + Clone,
{
    for set in table.unique {
        let Some(tuple) = unique_tuple(set, body) else {
            continue;
        };
        let clash = rows
            .clone()
            .into_iter()
            .filter(|(other_key, _)| other_key.as_str() != key)
            .any(|(_, other)| unique_tuple(set, other).is_some_and(|other| other == tuple));
        if clash {
            return Err(AppError::constraint_violation(format!(
                "duplicate value for unique ({}) on '{}'",
                set.join(", "),
                table.name
            )));
        }
    }
    Ok(())
}

/// Fail when a foreign key points at a row `exists` does not know.
///
/// Absent and null foreign keys are optional and pass.
pub(crate) fn check_references<F>(table: &TableDef, body: &Value, exists: F) -> AppResult<()>
where
    F: Fn(&str, &str) -> bool,
{
    for reference in table.references {
        let Some(target) = lookup_path(body, reference.field).and_then(key_text) else {
            continue;
        };
        if !exists(reference.table, &target) {
            return Err(AppError::constraint_violation(format!(
                "'{}.{}' references missing '{}' row '{target}'",
                table.name, reference.field, reference.table
            )));
        }
    }
    Ok(())
}
