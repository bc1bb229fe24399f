//! PostgreSQL storage engine.
//!
//! Each entity is stored in its own document table. Tables, their unique
//! indexes, and their foreign keys are created the first time an entity is
//! touched. Criteria, ordering, and paging are evaluated in SQL unless the
//! ordering key points into an included relation; then rows are ordered and
//! paged in process after includes are attached.

mod sql;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashSet;
use serde_json::Value;
use sqlx::postgres::PgConnection;
use sqlx::types::Json;
use sqlx::{Acquire, PgPool, Postgres, QueryBuilder};
use tracing::{debug, info};

use shipping_core::error::{AppError, ErrorKind};
use shipping_core::specification::{IncludeKind, Query};
use shipping_core::traits::{StagedOp, StorageConnection, StorageEngine, StoredRow, TableDef};
use shipping_core::types::Criteria;
use shipping_core::AppResult;

use super::constraints::check_required;
use super::evaluate::{apply_window, order_rows};
use crate::connection::DatabasePool;

use self::sql::{create_table_statements, ident, push_criteria, push_order};

type RowTuple = (String, i64, Json<Value>);

/// PostgreSQL-backed storage engine.
#[derive(Debug, Clone)]
pub struct PostgresEngine {
    pool: DatabasePool,
    ready: Arc<DashSet<&'static str>>,
}

impl PostgresEngine {
    /// Create an engine over an existing pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self {
            pool,
            ready: Arc::new(DashSet::new()),
        }
    }
}

#[async_trait]
impl StorageEngine for PostgresEngine {
    fn name(&self) -> &str {
        "postgres"
    }

    async fn connect(&self) -> AppResult<Box<dyn StorageConnection>> {
        self.pool.ensure_open()?;
        Ok(Box::new(PostgresConnection {
            pool: self.pool.pool().clone(),
            ready: Arc::clone(&self.ready),
            transaction: None,
        }))
    }

    async fn health_check(&self) -> AppResult<bool> {
        self.pool.health_check().await
    }
}

/// A session against a [`PostgresEngine`].
///
/// Outside a transaction every call borrows a pooled connection. Inside
/// one, every call runs on the transaction's connection.
pub struct PostgresConnection {
    pool: PgPool,
    ready: Arc<DashSet<&'static str>>,
    transaction: Option<sqlx::Transaction<'static, Postgres>>,
}

impl fmt::Debug for PostgresConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresConnection")
            .field("pool", &self.pool)
            .field("in_transaction", &self.transaction.is_some())
            .finish()
    }
}

impl PostgresConnection {
    /// Create `table` and the tables it references if they do not exist.
    ///
    /// Runs on the pool, never inside the caller's transaction, so a
    /// rolled-back transaction cannot undo the bootstrap.
    async fn ensure_table(&mut self, table: &'static TableDef) -> AppResult<()> {
        if self.ready.contains(table.name) {
            return Ok(());
        }
        for statement in create_table_statements(table) {
            sqlx::query(&statement)
                .execute(&self.pool)
                .await
                .map_err(|e| map_sqlx(e, &format!("Failed to prepare table '{}'", table.name)))?;
        }
        self.ready.insert(table.name);
        info!(table = table.name, "Prepared document table");
        Ok(())
    }

    async fn ensure_query_tables(&mut self, table: &'static TableDef, query: &Query) -> AppResult<()> {
        self.ensure_table(table).await?;
        for include in &query.includes {
            self.ensure_table(include.target).await?;
        }
        Ok(())
    }

    async fn fetch_all(&mut self, mut qb: QueryBuilder<'_, Postgres>) -> AppResult<Vec<StoredRow>> {
        let query = qb.build_query_as::<RowTuple>();
        let rows = match self.transaction.as_mut() {
            Some(tx) => query.fetch_all(&mut **tx).await,
            None => query.fetch_all(&self.pool).await,
        }
        .map_err(|e| map_sqlx(e, "Failed to fetch rows"))?;
        Ok(rows.into_iter().map(into_row).collect())
    }

    async fn attach_includes(&mut self, rows: &mut [StoredRow], query: &Query) -> AppResult<()> {
        for include in &query.includes {
            let values = include.lookup_values(rows);
            let mut qb = select_from(include.target);
            match include.kind {
                IncludeKind::Reference { .. } => {
                    qb.push(" WHERE key = ANY(");
                    qb.push_bind(values);
                    qb.push(")");
                }
                IncludeKind::Collection { foreign_key } => {
                    qb.push(" WHERE body #>> ");
                    qb.push_bind(foreign_key.split('.').map(str::to_string).collect::<Vec<_>>());
                    qb.push(" = ANY(");
                    qb.push_bind(values);
                    qb.push(")");
                }
            }
            let related = self.fetch_all(qb).await?;
            include.attach(rows, &related);
        }
        Ok(())
    }
}

#[async_trait]
impl StorageConnection for PostgresConnection {
    async fn fetch(&mut self, table: &'static TableDef, query: &Query) -> AppResult<Vec<StoredRow>> {
        self.ensure_query_tables(table, query).await?;

        let in_memory_order = query.orders_by_include();
        let mut qb = select_from(table);
        push_where(&mut qb, query.criteria.as_ref());
        if !in_memory_order {
            push_order(&mut qb, query.order.as_ref());
            if let Some(window) = query.window {
                qb.push(" LIMIT ");
                qb.push_bind(clamp_i64(window.take));
                qb.push(" OFFSET ");
                qb.push_bind(clamp_i64(window.skip));
            }
        }

        let mut rows = self.fetch_all(qb).await?;
        self.attach_includes(&mut rows, query).await?;

        if in_memory_order {
            order_rows(&mut rows, query.order.as_ref());
            rows = apply_window(rows, query.window);
        }
        debug!(table = table.name, rows = rows.len(), "Evaluated query");
        Ok(rows)
    }

    async fn fetch_by_key(
        &mut self,
        table: &'static TableDef,
        key: &str,
    ) -> AppResult<Option<StoredRow>> {
        self.ensure_table(table).await?;
        let mut qb = select_from(table);
        qb.push(" WHERE key = ");
        qb.push_bind(key.to_string());
        Ok(self.fetch_all(qb).await?.into_iter().next())
    }

    async fn count(
        &mut self,
        table: &'static TableDef,
        criteria: Option<&Criteria>,
    ) -> AppResult<u64> {
        self.ensure_table(table).await?;
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT COUNT(*) FROM {}", ident(table.name)));
        push_where(&mut qb, criteria);

        let query = qb.build_query_scalar::<i64>();
        let count = match self.transaction.as_mut() {
            Some(tx) => query.fetch_one(&mut **tx).await,
            None => query.fetch_one(&self.pool).await,
        }
        .map_err(|e| map_sqlx(e, "Failed to count rows"))?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    async fn apply(&mut self, ops: &[StagedOp]) -> AppResult<u64> {
        for op in ops {
            self.ensure_table(op.table()).await?;
        }

        // Nested in the open transaction this is a savepoint, so a failed
        // batch leaves the outer transaction usable.
        let mut batch = match self.transaction.as_mut() {
            Some(tx) => tx.begin().await,
            None => self.pool.begin().await,
        }
        .map_err(|e| map_sqlx(e, "Failed to start write batch"))?;

        let mut affected = 0;
        for op in ops {
            affected += apply_one(&mut batch, op).await?;
        }

        batch
            .commit()
            .await
            .map_err(|e| map_sqlx(e, "Failed to commit write batch"))?;
        Ok(affected)
    }

    async fn begin(&mut self) -> AppResult<()> {
        if self.transaction.is_some() {
            return Err(AppError::transaction_state(
                "A transaction is already open on this connection",
            ));
        }
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx(e, "Failed to begin transaction"))?;
        self.transaction = Some(tx);
        Ok(())
    }

    async fn commit(&mut self) -> AppResult<()> {
        let tx = self
            .transaction
            .take()
            .ok_or_else(|| AppError::transaction_state("No open transaction to commit"))?;
        tx.commit()
            .await
            .map_err(|e| map_sqlx(e, "Failed to commit transaction"))
    }

    async fn rollback(&mut self) -> AppResult<()> {
        let tx = self
            .transaction
            .take()
            .ok_or_else(|| AppError::transaction_state("No open transaction to roll back"))?;
        tx.rollback()
            .await
            .map_err(|e| map_sqlx(e, "Failed to roll back transaction"))
    }

    fn in_transaction(&self) -> bool {
        self.transaction.is_some()
    }

    fn abandon(&mut self) {
        // sqlx queues a ROLLBACK when an unfinished transaction is dropped;
        // it runs before the connection is handed out again.
        self.transaction = None;
    }
}

async fn apply_one(conn: &mut PgConnection, op: &StagedOp) -> AppResult<u64> {
    let table = op.table();
    let done = match op {
        StagedOp::Insert { key, body, .. } => {
            check_required(table, body)?;
            sqlx::query(&format!(
                "INSERT INTO {} (key, version, body) VALUES ($1, 1, $2)",
                ident(table.name)
            ))
            .bind(key)
            .bind(Json(body))
            .execute(&mut *conn)
            .await
        }
        StagedOp::Update {
            key,
            expected_version,
            body,
            ..
        } => {
            check_required(table, body)?;
            sqlx::query(&format!(
                "UPDATE {} SET body = $1, version = version + 1 WHERE key = $2 AND version = $3",
                ident(table.name)
            ))
            .bind(Json(body))
            .bind(key)
            .bind(clamp_i64(*expected_version))
            .execute(&mut *conn)
            .await
        }
        StagedOp::Delete {
            key,
            expected_version,
            ..
        } => {
            sqlx::query(&format!(
                "DELETE FROM {} WHERE key = $1 AND version = $2",
                ident(table.name)
            ))
            .bind(key)
            .bind(clamp_i64(*expected_version))
            .execute(&mut *conn)
            .await
        }
    }
    .map_err(|e| map_sqlx(e, &format!("Failed to {} '{}' row '{}'", op.kind(), table.name, op.key())))?;

    if done.rows_affected() == 0 {
        return Err(AppError::concurrency_conflict(format!(
            "'{}' row '{}' was modified or removed since it was loaded",
            table.name,
            op.key()
        )));
    }
    Ok(done.rows_affected())
}

fn select_from(table: &TableDef) -> QueryBuilder<'static, Postgres> {
    QueryBuilder::new(format!("SELECT key, version, body FROM {}", ident(table.name)))
}

fn push_where(qb: &mut QueryBuilder<'_, Postgres>, criteria: Option<&Criteria>) {
    if let Some(criteria) = criteria {
        qb.push(" WHERE ");
        push_criteria(qb, criteria);
    }
}

fn into_row((key, version, Json(body)): RowTuple) -> StoredRow {
    StoredRow {
        key,
        version: u64::try_from(version).unwrap_or_default(),
        body,
    }
}

fn clamp_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Map a sqlx error, keeping constraint violations distinct.
fn map_sqlx(err: sqlx::Error, context: &str) -> AppError {
    use sqlx::error::ErrorKind as DbErrorKind;

    let kind = match &err {
        sqlx::Error::Database(db) => match db.kind() {
            DbErrorKind::UniqueViolation
            | DbErrorKind::ForeignKeyViolation
            | DbErrorKind::NotNullViolation
            | DbErrorKind::CheckViolation => ErrorKind::ConstraintViolation,
            _ => ErrorKind::Database,
        },
        _ => ErrorKind::Database,
    };
    let message = match &err {
        sqlx::Error::Database(db) => format!("{context}: {}", db.message()),
        other => format!("{context}: {other}"),
    };
    AppError::with_source(kind, message, err)
}
