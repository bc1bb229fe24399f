//! Eager loading of related rows.

use std::collections::HashMap;

use serde_json::Value;

use crate::traits::entity::{Entity, TableDef};
use crate::traits::storage::{StoredRow, key_text};
use crate::types::filter::lookup_path;

/// How an include finds its related rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncludeKind {
    /// This row's `foreign_key` field holds the related row's key.
    Reference {
        /// Field on this row.
        foreign_key: &'static str,
    },
    /// Related rows whose `foreign_key` field holds this row's key.
    Collection {
        /// Field on the related rows.
        foreign_key: &'static str,
    },
}

/// A related-entity accessor attached to each result row.
///
/// The related document (or array of documents) is stored under `name`
/// so the entity's navigation field of the same name deserializes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Include {
    /// Navigation field name on the including entity.
    pub name: &'static str,
    /// Table of the related entity.
    pub target: &'static TableDef,
    /// Join shape.
    pub kind: IncludeKind,
}

impl Include {
    /// Attach the single `R` row referenced by `foreign_key`.
    pub fn reference<R: Entity>(name: &'static str, foreign_key: &'static str) -> Self {
        Self {
            name,
            target: R::table(),
            kind: IncludeKind::Reference { foreign_key },
        }
    }

    /// Attach every `R` row whose `foreign_key` points back at this row.
    pub fn collection<R: Entity>(name: &'static str, foreign_key: &'static str) -> Self {
        Self {
            name,
            target: R::table(),
            kind: IncludeKind::Collection { foreign_key },
        }
    }

    /// Values to look up in the target table for `rows`.
    ///
    /// For a reference these are target keys, for a collection they are
    /// values of the target's foreign-key field.
    pub fn lookup_values(&self, rows: &[StoredRow]) -> Vec<String> {
        let mut values: Vec<String> = match self.kind {
            IncludeKind::Reference { foreign_key } => rows
                .iter()
                .filter_map(|row| lookup_path(&row.body, foreign_key).and_then(key_text))
                .collect(),
            IncludeKind::Collection { .. } => rows.iter().map(|row| row.key.clone()).collect(),
        };
        values.sort();
        values.dedup();
        values
    }

    /// Attach `related` target rows onto `rows`.
    ///
    /// `related` may contain more rows than needed. A missing reference is
    /// attached as `null`, a collection with no members as `[]`. Collection
    /// members are ordered by key.
    pub fn attach(&self, rows: &mut [StoredRow], related: &[StoredRow]) {
        match self.kind {
            IncludeKind::Reference { foreign_key } => {
                let by_key: HashMap<&str, &Value> = related
                    .iter()
                    .map(|row| (row.key.as_str(), &row.body))
                    .collect();
                for row in rows.iter_mut() {
                    let target = lookup_path(&row.body, foreign_key)
                        .and_then(key_text)
                        .and_then(|key| by_key.get(key.as_str()).map(|body| (*body).clone()))
                        .unwrap_or(Value::Null);
                    set_field(&mut row.body, self.name, target);
                }
            }
            IncludeKind::Collection { foreign_key } => {
                let mut sorted: Vec<&StoredRow> = related.iter().collect();
                sorted.sort_by(|a, b| a.key.cmp(&b.key));

                let mut by_owner: HashMap<String, Vec<Value>> = HashMap::new();
                for member in sorted {
                    if let Some(owner) = lookup_path(&member.body, foreign_key).and_then(key_text) {
                        by_owner.entry(owner).or_default().push(member.body.clone());
                    }
                }
                for row in rows.iter_mut() {
                    let members = by_owner.get(&row.key).cloned().unwrap_or_default();
                    set_field(&mut row.body, self.name, Value::Array(members));
                }
            }
        }
    }
}

fn set_field(body: &mut Value, name: &str, value: Value) {
    if let Some(object) = body.as_object_mut() {
        object.insert(name.to_string(), value);
    }
}
