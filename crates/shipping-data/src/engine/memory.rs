//! Process-local storage engine.
//!
//! Tables live behind one shared `RwLock`. A write batch is applied to a
//! copy of the tables and swapped in only when every operation succeeded,
//! which makes `apply` atomic. A transaction works on its own snapshot and
//! replays its journal against the shared tables on commit, so concurrent
//! writers are detected by the same version checks.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info};

use shipping_core::specification::Query;
use shipping_core::traits::storage::key_text;
use shipping_core::traits::{StagedOp, StorageConnection, StorageEngine, StoredRow, TableDef};
use shipping_core::types::Criteria;
use shipping_core::types::filter::lookup_path;
use shipping_core::{AppError, AppResult};

use super::constraints::{check_references, check_required, check_unique};
use super::evaluate::{apply_window, order_rows, select_related};

#[derive(Debug, Clone)]
struct Table {
    def: &'static TableDef,
    rows: BTreeMap<String, StoredRow>,
}

impl Table {
    fn new(def: &'static TableDef) -> Self {
        Self {
            def,
            rows: BTreeMap::new(),
        }
    }
}

type Tables = HashMap<&'static str, Table>;

/// In-memory storage engine for tests and demo mode.
///
/// Clones share the same tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryEngine {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryEngine {
    /// Create an empty engine.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StorageEngine for MemoryEngine {
    fn name(&self) -> &str {
        "memory"
    }

    async fn connect(&self) -> AppResult<Box<dyn StorageConnection>> {
        Ok(Box::new(MemoryConnection {
            shared: Arc::clone(&self.tables),
            transaction: None,
        }))
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }
}

#[derive(Debug)]
struct MemoryTransaction {
    snapshot: Tables,
    journal: Vec<StagedOp>,
}

/// A session against a [`MemoryEngine`].
#[derive(Debug)]
pub struct MemoryConnection {
    shared: Arc<RwLock<Tables>>,
    transaction: Option<MemoryTransaction>,
}

#[async_trait]
impl StorageConnection for MemoryConnection {
    async fn fetch(&mut self, table: &'static TableDef, query: &Query) -> AppResult<Vec<StoredRow>> {
        let rows = match &self.transaction {
            Some(tx) => run_query(&tx.snapshot, table, query),
            None => run_query(&*self.shared.read().await, table, query),
        };
        debug!(table = table.name, rows = rows.len(), "Evaluated query");
        Ok(rows)
    }

    async fn fetch_by_key(
        &mut self,
        table: &'static TableDef,
        key: &str,
    ) -> AppResult<Option<StoredRow>> {
        let lookup = |tables: &Tables| {
            tables
                .get(table.name)
                .and_then(|t| t.rows.get(key))
                .cloned()
        };
        Ok(match &self.transaction {
            Some(tx) => lookup(&tx.snapshot),
            None => lookup(&*self.shared.read().await),
        })
    }

    async fn count(
        &mut self,
        table: &'static TableDef,
        criteria: Option<&Criteria>,
    ) -> AppResult<u64> {
        let count = |tables: &Tables| count_rows(tables, table, criteria);
        Ok(match &self.transaction {
            Some(tx) => count(&tx.snapshot),
            None => count(&*self.shared.read().await),
        })
    }

    async fn apply(&mut self, ops: &[StagedOp]) -> AppResult<u64> {
        match &mut self.transaction {
            Some(tx) => {
                let (next, affected) = apply_ops(&tx.snapshot, ops)?;
                tx.snapshot = next;
                tx.journal.extend_from_slice(ops);
                Ok(affected)
            }
            None => {
                let mut shared = self.shared.write().await;
                let (next, affected) = apply_ops(&shared, ops)?;
                *shared = next;
                Ok(affected)
            }
        }
    }

    async fn begin(&mut self) -> AppResult<()> {
        if self.transaction.is_some() {
            return Err(AppError::transaction_state(
                "A transaction is already open on this connection",
            ));
        }
        let snapshot = self.shared.read().await.clone();
        self.transaction = Some(MemoryTransaction {
            snapshot,
            journal: Vec::new(),
        });
        Ok(())
    }

    async fn commit(&mut self) -> AppResult<()> {
        let tx = self
            .transaction
            .take()
            .ok_or_else(|| AppError::transaction_state("No open transaction to commit"))?;

        let mut shared = self.shared.write().await;
        let (next, affected) = apply_ops(&shared, &tx.journal)?;
        *shared = next;
        info!(ops = tx.journal.len(), affected, "Committed memory transaction");
        Ok(())
    }

    async fn rollback(&mut self) -> AppResult<()> {
        self.transaction
            .take()
            .map(|_| ())
            .ok_or_else(|| AppError::transaction_state("No open transaction to roll back"))
    }

    fn in_transaction(&self) -> bool {
        self.transaction.is_some()
    }

    fn abandon(&mut self) {
        self.transaction = None;
    }
}

fn matching<'a>(
    tables: &'a Tables,
    table: &TableDef,
    criteria: Option<&'a Criteria>,
) -> impl Iterator<Item = &'a StoredRow> {
    tables
        .get(table.name)
        .into_iter()
        .flat_map(|t| t.rows.values())
        .filter(move |row| criteria.is_none_or(|c| c.matches(&row.body)))
}

fn count_rows(tables: &Tables, table: &TableDef, criteria: Option<&Criteria>) -> u64 {
    matching(tables, table, criteria).count() as u64
}

fn run_query(tables: &Tables, table: &TableDef, query: &Query) -> Vec<StoredRow> {
    let mut rows: Vec<StoredRow> = matching(tables, table, query.criteria.as_ref())
        .cloned()
        .collect();

    for include in &query.includes {
        let values = include.lookup_values(&rows);
        let candidates = tables
            .get(include.target.name)
            .into_iter()
            .flat_map(|t| t.rows.values());
        let related = select_related(include, candidates, &values);
        include.attach(&mut rows, &related);
    }

    order_rows(&mut rows, query.order.as_ref());
    apply_window(rows, query.window)
}

fn apply_ops(tables: &Tables, ops: &[StagedOp]) -> AppResult<(Tables, u64)> {
    let mut working = tables.clone();
    for op in ops {
        apply_one(&mut working, op)?;
    }
    Ok((working, ops.len() as u64))
}

fn apply_one(tables: &mut Tables, op: &StagedOp) -> AppResult<()> {
    let def = op.table();
    tables.entry(def.name).or_insert_with(|| Table::new(def));

    match op {
        StagedOp::Insert { key, body, .. } => {
            check_required(def, body)?;
            check_row_constraints(tables, def, key, body)?;
            let rows = rows_mut(tables, def)?;
            if rows.contains_key(key) {
                return Err(AppError::constraint_violation(format!(
                    "duplicate key '{key}' in '{}'",
                    def.name
                )));
            }
            rows.insert(
                key.clone(),
                StoredRow {
                    key: key.clone(),
                    version: 1,
                    body: body.clone(),
                },
            );
        }
        StagedOp::Update {
            key,
            expected_version,
            body,
            ..
        } => {
            check_version(tables, def, key, *expected_version)?;
            check_required(def, body)?;
            check_row_constraints(tables, def, key, body)?;
            if let Some(row) = rows_mut(tables, def)?.get_mut(key) {
                row.version += 1;
                row.body = body.clone();
            }
        }
        StagedOp::Delete {
            key,
            expected_version,
            ..
        } => {
            check_version(tables, def, key, *expected_version)?;
            rows_mut(tables, def)?.remove(key);
            check_not_referenced(tables, def, key)?;
        }
    }
    Ok(())
}

fn rows_mut<'a>(
    tables: &'a mut Tables,
    def: &TableDef,
) -> AppResult<&'a mut BTreeMap<String, StoredRow>> {
    tables
        .get_mut(def.name)
        .map(|t| &mut t.rows)
        .ok_or_else(|| AppError::internal(format!("Table '{}' is not registered", def.name)))
}

fn check_version(tables: &Tables, def: &TableDef, key: &str, expected: u64) -> AppResult<()> {
    let current = tables
        .get(def.name)
        .and_then(|t| t.rows.get(key))
        .map(|row| row.version);
    match current {
        Some(version) if version == expected => Ok(()),
        Some(version) => Err(AppError::concurrency_conflict(format!(
            "'{}' row '{key}' is at version {version}, expected {expected}",
            def.name
        ))),
        None => Err(AppError::concurrency_conflict(format!(
            "'{}' row '{key}' no longer exists",
            def.name
        ))),
    }
}

fn check_row_constraints(
    tables: &Tables,
    def: &TableDef,
    key: &str,
    body: &serde_json::Value,
) -> AppResult<()> {
    if let Some(table) = tables.get(def.name) {
        check_unique(
            def,
            key,
            body,
            table.rows.iter().map(|(k, row)| (k, &row.body)),
        )?;
    }
    check_references(def, body, |target, target_key| {
        tables
            .get(target)
            .is_some_and(|t| t.rows.contains_key(target_key))
    })
}

fn check_not_referenced(tables: &Tables, def: &TableDef, key: &str) -> AppResult<()> {
    for other in tables.values() {
        for reference in def.is_referenced_by(other.def) {
            let referenced = other.rows.values().any(|row| {
                lookup_path(&row.body, reference.field)
                    .and_then(key_text)
                    .is_some_and(|target| target == key)
            });
            if referenced {
                return Err(AppError::constraint_violation(format!(
                    "'{}' row '{key}' is still referenced by '{}.{}'",
                    def.name, other.def.name, reference.field
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shipping_core::error::ErrorKind;
    use shipping_core::specification::{Include, Window};
    use shipping_core::traits::Reference;
    use shipping_core::types::{FilterField, SortField};

    static GOVERNORATES: TableDef = TableDef::new("governorates")
        .required(&["name"])
        .unique(&[&["name"]]);
    static CITIES: TableDef = TableDef::new("cities")
        .required(&["name", "governorate_id"])
        .references(&[Reference::to("governorate_id", "governorates")])
        .navigations(&["governorate"]);

    fn insert(table: &'static TableDef, key: &str, body: serde_json::Value) -> StagedOp {
        StagedOp::Insert {
            table,
            key: key.to_string(),
            body,
        }
    }

    async fn seeded() -> (MemoryEngine, Box<dyn StorageConnection>) {
        let engine = MemoryEngine::new();
        let mut conn = engine.connect().await.expect("connect");
        conn.apply(&[
            insert(&GOVERNORATES, "g1", json!({ "id": "g1", "name": "Cairo" })),
            insert(&GOVERNORATES, "g2", json!({ "id": "g2", "name": "Giza" })),
            insert(&CITIES, "c1", json!({ "id": "c1", "name": "Nasr City", "governorate_id": "g1" })),
            insert(&CITIES, "c2", json!({ "id": "c2", "name": "Dokki", "governorate_id": "g2" })),
            insert(&CITIES, "c3", json!({ "id": "c3", "name": "Maadi", "governorate_id": "g1" })),
        ])
        .await
        .expect("seed");
        (engine, conn)
    }

    #[tokio::test]
    async fn test_failed_batch_applies_nothing() {
        let (_engine, mut conn) = seeded().await;
        let err = conn
            .apply(&[
                insert(&GOVERNORATES, "g3", json!({ "id": "g3", "name": "Luxor" })),
                insert(&GOVERNORATES, "g4", json!({ "id": "g4", "name": "Cairo" })),
            ])
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::ConstraintViolation);
        assert_eq!(conn.count(&GOVERNORATES, None).await.expect("count"), 2);
    }

    #[tokio::test]
    async fn test_foreign_keys_checked_both_ways() {
        let (_engine, mut conn) = seeded().await;
        let err = conn
            .apply(&[insert(&CITIES, "c9", json!({ "name": "Nowhere", "governorate_id": "g9" }))])
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::ConstraintViolation);

        let err = conn
            .apply(&[StagedOp::Delete {
                table: &GOVERNORATES,
                key: "g1".to_string(),
                expected_version: 1,
            }])
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::ConstraintViolation);
    }

    #[tokio::test]
    async fn test_stale_version_conflicts() {
        let (_engine, mut conn) = seeded().await;
        let update = |version| StagedOp::Update {
            table: &GOVERNORATES,
            key: "g2".to_string(),
            expected_version: version,
            body: json!({ "id": "g2", "name": "Giza Governorate" }),
        };
        assert_eq!(conn.apply(&[update(1)]).await.expect("update"), 1);
        let err = conn.apply(&[update(1)]).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::ConcurrencyConflict);

        let row = conn.fetch_by_key(&GOVERNORATES, "g2").await.expect("fetch");
        assert_eq!(row.map(|r| r.version), Some(2));
    }

    #[tokio::test]
    async fn test_query_pipeline_with_include() {
        let (_engine, mut conn) = seeded().await;
        let query = Query {
            criteria: Some(FilterField::eq("governorate_id", "g1").into()),
            includes: vec![Include {
                name: "governorate",
                target: &GOVERNORATES,
                kind: shipping_core::specification::IncludeKind::Reference {
                    foreign_key: "governorate_id",
                },
            }],
            order: Some(SortField::asc("name")),
            window: Some(Window::new(0, 10)),
        };
        let rows = conn.fetch(&CITIES, &query).await.expect("fetch");
        let names: Vec<&str> = rows.iter().filter_map(|r| r.body["name"].as_str()).collect();
        assert_eq!(names, ["Maadi", "Nasr City"]);
        assert_eq!(rows[0].body["governorate"]["name"], "Cairo");
    }

    #[tokio::test]
    async fn test_transaction_isolated_until_commit() {
        let (engine, mut writer) = seeded().await;
        let mut reader = engine.connect().await.expect("connect");

        writer.begin().await.expect("begin");
        writer
            .apply(&[insert(&GOVERNORATES, "g3", json!({ "id": "g3", "name": "Luxor" }))])
            .await
            .expect("apply");
        assert_eq!(writer.count(&GOVERNORATES, None).await.expect("count"), 3);
        assert_eq!(reader.count(&GOVERNORATES, None).await.expect("count"), 2);

        writer.commit().await.expect("commit");
        assert_eq!(reader.count(&GOVERNORATES, None).await.expect("count"), 3);
    }

    #[tokio::test]
    async fn test_abandon_discards_transaction() {
        let (_engine, mut conn) = seeded().await;
        conn.begin().await.expect("begin");
        conn.apply(&[insert(&GOVERNORATES, "g3", json!({ "id": "g3", "name": "Luxor" }))])
            .await
            .expect("apply");
        conn.abandon();

        assert!(!conn.in_transaction());
        assert_eq!(conn.count(&GOVERNORATES, None).await.expect("count"), 2);
        let err = conn.rollback().await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::TransactionState);
    }

    #[tokio::test]
    async fn test_concurrent_commit_conflicts() {
        let (engine, mut first) = seeded().await;
        let mut second = engine.connect().await.expect("connect");
        let rename = |name: &str| StagedOp::Update {
            table: &GOVERNORATES,
            key: "g1".to_string(),
            expected_version: 1,
            body: json!({ "id": "g1", "name": name }),
        };

        first.begin().await.expect("begin");
        first.apply(&[rename("Cairo A")]).await.expect("apply");
        second.apply(&[rename("Cairo B")]).await.expect("apply");

        let err = first.commit().await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::ConcurrencyConflict);
        let row = second.fetch_by_key(&GOVERNORATES, "g1").await.expect("fetch");
        assert_eq!(row.map(|r| r.body["name"].clone()), Some(json!("Cairo B")));
    }
}
