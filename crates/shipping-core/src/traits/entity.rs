//! The entity contract every repository is parameterized over.

use std::fmt;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// A persistent entity type.
///
/// Entities are stored as JSON documents keyed by the string form of
/// [`Entity::key`]. Navigation fields (related rows attached by an
/// [`Include`](crate::specification::Include)) are listed in the table
/// definition and stripped before a write is staged.
pub trait Entity: Clone + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// The primary key type.
    type Key: Clone + fmt::Display + fmt::Debug + Send + Sync + 'static;

    /// Static schema of the backing table.
    fn table() -> &'static TableDef;

    /// The primary key of this row.
    fn key(&self) -> Self::Key;
}

/// A foreign key from one field of a table to the key of another table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reference {
    /// Field holding the referenced key.
    pub field: &'static str,
    /// Name of the referenced table.
    pub table: &'static str,
}

impl Reference {
    /// Declare that `field` references rows of `table`.
    pub const fn to(field: &'static str, table: &'static str) -> Self {
        Self { field, table }
    }
}

/// Static table schema enforced by every storage engine.
#[derive(Debug, PartialEq, Eq)]
pub struct TableDef {
    /// Table name.
    pub name: &'static str,
    /// Fields that must be present and non-null.
    pub required: &'static [&'static str],
    /// Field sets whose combined values must be unique across rows.
    pub unique: &'static [&'static [&'static str]],
    /// Foreign keys checked on insert/update and restricting deletes.
    pub references: &'static [Reference],
    /// Fields populated only by includes; never persisted.
    pub navigations: &'static [&'static str],
}

impl TableDef {
    /// Start an unconstrained table definition.
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            required: &[],
            unique: &[],
            references: &[],
            navigations: &[],
        }
    }

    /// Set the required fields.
    pub const fn required(mut self, fields: &'static [&'static str]) -> Self {
        self.required = fields;
        self
    }

    /// Set the unique field sets.
    pub const fn unique(mut self, sets: &'static [&'static [&'static str]]) -> Self {
        self.unique = sets;
        self
    }

    /// Set the foreign keys.
    pub const fn references(mut self, references: &'static [Reference]) -> Self {
        self.references = references;
        self
    }

    /// Set the navigation fields.
    pub const fn navigations(mut self, fields: &'static [&'static str]) -> Self {
        self.navigations = fields;
        self
    }

    /// Remove navigation fields from a document about to be written.
    pub fn strip_navigations(&self, body: &mut Value) {
        if let Some(object) = body.as_object_mut() {
            for field in self.navigations {
                object.remove(*field);
            }
        }
    }

    /// Foreign keys in other tables that point at this one.
    pub fn is_referenced_by<'a>(&self, other: &'a TableDef) -> impl Iterator<Item = &'a Reference> {
        let name = self.name;
        other.references.iter().filter(move |r| r.table == name)
    }
}
