//! Storage engine traits for pluggable persistence backends.
//!
//! The data-access layer never talks to a database directly. It hands a
//! [`Query`] or a batch of [`StagedOp`]s to a [`StorageConnection`] opened
//! from a [`StorageEngine`]. Implementations exist for process-local
//! tables and PostgreSQL in `shipping-data`.

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;

use crate::result::AppResult;
use crate::specification::Query;
use crate::traits::entity::TableDef;
use crate::types::filter::Criteria;

/// A stored document together with its optimistic-concurrency version.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRow {
    /// String form of the primary key.
    pub key: String,
    /// Incremented on every successful update. Starts at 1.
    pub version: u64,
    /// The serialized entity.
    pub body: Value,
}

/// A write staged by a repository and flushed by `save`.
#[derive(Debug, Clone, PartialEq)]
pub enum StagedOp {
    /// Insert a new row.
    Insert {
        /// Target table.
        table: &'static TableDef,
        /// Primary key.
        key: String,
        /// Document to store.
        body: Value,
    },
    /// Replace an existing row whose version must still be `expected_version`.
    Update {
        /// Target table.
        table: &'static TableDef,
        /// Primary key.
        key: String,
        /// Version observed when the row was loaded.
        expected_version: u64,
        /// Replacement document.
        body: Value,
    },
    /// Remove an existing row whose version must still be `expected_version`.
    Delete {
        /// Target table.
        table: &'static TableDef,
        /// Primary key.
        key: String,
        /// Version observed when the row was loaded.
        expected_version: u64,
    },
}

impl StagedOp {
    /// The table this operation writes to.
    pub fn table(&self) -> &'static TableDef {
        match self {
            Self::Insert { table, .. } | Self::Update { table, .. } | Self::Delete { table, .. } => {
                table
            }
        }
    }

    /// The primary key this operation writes to.
    pub fn key(&self) -> &str {
        match self {
            Self::Insert { key, .. } | Self::Update { key, .. } | Self::Delete { key, .. } => key,
        }
    }

    /// Short label for logs and error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Insert { .. } => "insert",
            Self::Update { .. } => "update",
            Self::Delete { .. } => "delete",
        }
    }
}

/// Factory for storage connections.
#[async_trait]
pub trait StorageEngine: Send + Sync + fmt::Debug + 'static {
    /// Engine name for logs (e.g. `"memory"`, `"postgres"`).
    fn name(&self) -> &str;

    /// Open a connection owned exclusively by one unit of work.
    async fn connect(&self) -> AppResult<Box<dyn StorageConnection>>;

    /// Check whether the backing store is reachable.
    async fn health_check(&self) -> AppResult<bool>;
}

/// One exclusive, non-thread-shared session against a storage engine.
///
/// Reads observe committed data plus this connection's own open
/// transaction. Every method that crosses the storage boundary is async.
/// Only `Send` is required: a connection is owned by one unit of work and
/// reached through its lock.
#[async_trait]
pub trait StorageConnection: Send + fmt::Debug {
    /// Evaluate criteria, includes, ordering, then the paging window.
    async fn fetch(&mut self, table: &'static TableDef, query: &Query) -> AppResult<Vec<StoredRow>>;

    /// Load one row by primary key.
    async fn fetch_by_key(
        &mut self,
        table: &'static TableDef,
        key: &str,
    ) -> AppResult<Option<StoredRow>>;

    /// Count rows matching `criteria` (all rows when `None`).
    async fn count(&mut self, table: &'static TableDef, criteria: Option<&Criteria>)
    -> AppResult<u64>;

    /// Apply a batch of writes atomically, in order. Returns affected rows.
    ///
    /// Either every operation lands or none does. Stale versions fail with
    /// `ConcurrencyConflict`, schema violations with `ConstraintViolation`.
    async fn apply(&mut self, ops: &[StagedOp]) -> AppResult<u64>;

    /// Open a transaction spanning later `apply` calls.
    async fn begin(&mut self) -> AppResult<()>;

    /// Make everything applied since `begin` durable.
    async fn commit(&mut self) -> AppResult<()>;

    /// Undo everything applied since `begin`.
    async fn rollback(&mut self) -> AppResult<()>;

    /// Whether a transaction is open on this connection.
    fn in_transaction(&self) -> bool;

    /// Synchronously discard an open transaction.
    ///
    /// Called from `Drop` paths where awaiting is impossible. Nothing
    /// applied since `begin` may become durable afterwards.
    fn abandon(&mut self);
}

/// The string form of a JSON value used as a key or foreign key.
pub fn key_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    static ORDERS: TableDef = TableDef::new("orders");

    #[test]
    fn test_staged_op_accessors() {
        let op = StagedOp::Update {
            table: &ORDERS,
            key: "o-1".to_string(),
            expected_version: 3,
            body: json!({ "id": "o-1" }),
        };
        assert_eq!(op.table().name, "orders");
        assert_eq!(op.key(), "o-1");
        assert_eq!(op.kind(), "update");
    }

    #[test]
    fn test_key_text() {
        assert_eq!(key_text(&json!("abc")), Some("abc".to_string()));
        assert_eq!(key_text(&json!(42)), Some("42".to_string()));
        assert_eq!(key_text(&json!(null)), None);
        assert_eq!(key_text(&json!({ "id": 1 })), None);
    }
}
