//! Per-unit-of-work state shared by its repositories.
//!
//! The context owns the storage connection, the staged write list, and the
//! version tracker. Repositories are thin typed views over one context.
//! Bookkeeping lives behind a `std` mutex that is never held across an
//! await; the connection lives behind a `tokio` mutex.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tokio::sync::{MappedMutexGuard, Mutex as AsyncMutex, MutexGuard as AsyncMutexGuard};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shipping_core::traits::{StagedOp, StorageConnection, StoredRow, TableDef};
use shipping_core::{AppError, AppResult};

use crate::unit_of_work::TransactionState;

type TrackKey = (&'static str, String);

#[derive(Debug, Default)]
struct ContextState {
    staged: Vec<StagedOp>,
    tracked: HashMap<TrackKey, u64>,
    tracked_at_begin: Option<HashMap<TrackKey, u64>>,
    transaction: TransactionState,
    closed: bool,
}

impl ContextState {
    /// Close the open transaction as rolled back and undo its bookkeeping.
    fn roll_back_state(&mut self, id: Uuid) {
        self.transaction = TransactionState::RolledBack(id);
        if let Some(tracked) = self.tracked_at_begin.take() {
            self.tracked = tracked;
        }
        self.staged.clear();
    }

    fn open_transaction(&self) -> Option<Uuid> {
        match self.transaction {
            TransactionState::Open(id) => Some(id),
            _ => None,
        }
    }
}

pub(crate) struct DbContext {
    id: Uuid,
    engine: String,
    connection: AsyncMutex<Option<Box<dyn StorageConnection>>>,
    state: Mutex<ContextState>,
    rollback_pending: AtomicBool,
}

impl fmt::Debug for DbContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbContext")
            .field("id", &self.id)
            .field("engine", &self.engine)
            .field("rollback_pending", &self.rollback_pending.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl DbContext {
    pub(crate) fn new(engine: &str, connection: Box<dyn StorageConnection>) -> Self {
        Self {
            id: Uuid::now_v7(),
            engine: engine.to_string(),
            connection: AsyncMutex::new(Some(connection)),
            state: Mutex::new(ContextState::default()),
            rollback_pending: AtomicBool::new(false),
        }
    }

    pub(crate) fn id(&self) -> Uuid {
        self.id
    }

    fn state(&self) -> MutexGuard<'_, ContextState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn open_state(&self) -> AppResult<MutexGuard<'_, ContextState>> {
        let state = self.state();
        if state.closed {
            return Err(self.closed_error());
        }
        Ok(state)
    }

    fn closed_error(&self) -> AppError {
        AppError::transaction_state(format!("Unit of work {} is closed", self.id))
    }

    /// Lock the connection, first running a rollback deferred by a drop.
    pub(crate) async fn connection(
        &self,
    ) -> AppResult<MappedMutexGuard<'_, Box<dyn StorageConnection>>> {
        let mut guard = self.connection.lock().await;
        let Some(conn) = guard.as_mut() else {
            return Err(self.closed_error());
        };
        if self.rollback_pending.swap(false, Ordering::SeqCst) && conn.in_transaction() {
            warn!(uow = %self.id, "Running deferred rollback");
            conn.rollback().await?;
        }
        AsyncMutexGuard::try_map(guard, Option::as_mut).map_err(|_| self.closed_error())
    }

    /// Record the versions of rows read through this context.
    pub(crate) fn track(&self, table: &'static TableDef, rows: &[StoredRow]) {
        let mut state = self.state();
        for row in rows {
            state.tracked.insert((table.name, row.key.clone()), row.version);
        }
    }

    pub(crate) fn stage_insert(
        &self,
        table: &'static TableDef,
        key: String,
        body: Value,
    ) -> AppResult<()> {
        let mut state = self.open_state()?;
        debug!(uow = %self.id, table = table.name, key = %key, "Staged insert");
        state.staged.push(StagedOp::Insert { table, key, body });
        Ok(())
    }

    /// Stage an update.
    ///
    /// When the most recent staged operation is an insert or update of the
    /// same row, it takes the new body instead. Otherwise a new operation is
    /// appended, so writes keep the order they were issued in.
    pub(crate) fn stage_update(
        &self,
        table: &'static TableDef,
        key: String,
        body: Value,
    ) -> AppResult<()> {
        let mut state = self.open_state()?;

        if let Some(last) = state.staged.last_mut().filter(|op| targets(op, table, &key)) {
            if let StagedOp::Insert { body: staged, .. } | StagedOp::Update { body: staged, .. } =
                last
            {
                *staged = body;
                return Ok(());
            }
        }

        let expected_version = expected_version(&state, table, &key)?;
        debug!(uow = %self.id, table = table.name, key = %key, expected_version, "Staged update");
        state.staged.push(StagedOp::Update {
            table,
            key,
            expected_version,
            body,
        });
        Ok(())
    }

    /// Stage a delete.
    ///
    /// Deleting a row whose insert is the most recent staged operation
    /// cancels the insert; an update in that position becomes the delete.
    /// Otherwise the delete is appended after everything already staged.
    pub(crate) fn stage_delete(&self, table: &'static TableDef, key: String) -> AppResult<()> {
        let mut state = self.open_state()?;

        if let Some(last) = state.staged.last().filter(|op| targets(op, table, &key)) {
            match last {
                StagedOp::Insert { .. } => {
                    state.staged.pop();
                    return Ok(());
                }
                StagedOp::Update {
                    expected_version, ..
                } => {
                    let expected_version = *expected_version;
                    if let Some(slot) = state.staged.last_mut() {
                        *slot = StagedOp::Delete {
                            table,
                            key,
                            expected_version,
                        };
                    }
                    return Ok(());
                }
                StagedOp::Delete { .. } => return Ok(()),
            }
        }

        if matches!(latest_op(&state, table, &key), Some(StagedOp::Delete { .. })) {
            return Ok(());
        }
        let expected_version = expected_version(&state, table, &key)?;
        debug!(uow = %self.id, table = table.name, key = %key, expected_version, "Staged delete");
        state.staged.push(StagedOp::Delete {
            table,
            key,
            expected_version,
        });
        Ok(())
    }

    pub(crate) fn has_changes(&self) -> bool {
        !self.state().staged.is_empty()
    }

    pub(crate) fn discard_changes(&self) {
        let mut state = self.state();
        if !state.staged.is_empty() {
            debug!(uow = %self.id, ops = state.staged.len(), "Discarded staged changes");
        }
        state.staged.clear();
    }

    pub(crate) fn transaction_state(&self) -> TransactionState {
        self.state().transaction
    }

    /// Flush every staged operation in one atomic batch.
    ///
    /// On failure the staged operations are kept and nothing is persisted.
    pub(crate) async fn save(&self) -> AppResult<u64> {
        let ops = {
            let state = self.open_state()?;
            if state.staged.is_empty() {
                return Ok(0);
            }
            state.staged.clone()
        };

        let affected = {
            let mut conn = self.connection().await?;
            conn.apply(&ops).await?
        };

        let mut state = self.state();
        let flushed = ops.len().min(state.staged.len());
        state.staged = state.staged.split_off(flushed);
        for op in &ops {
            let track_key = (op.table().name, op.key().to_string());
            match op {
                StagedOp::Insert { .. } => {
                    state.tracked.insert(track_key, 1);
                }
                StagedOp::Update {
                    expected_version, ..
                } => {
                    state.tracked.insert(track_key, expected_version + 1);
                }
                StagedOp::Delete { .. } => {
                    state.tracked.remove(&track_key);
                }
            }
        }
        info!(
            uow = %self.id,
            ops = ops.len(),
            affected,
            in_transaction = state.open_transaction().is_some(),
            "Saved staged changes"
        );
        Ok(affected)
    }

    pub(crate) async fn begin(&self) -> AppResult<Uuid> {
        if let Some(open) = self.open_state()?.open_transaction() {
            return Err(AppError::transaction_state(format!(
                "Transaction {open} is already open"
            )));
        }

        self.connection().await?.begin().await?;

        let id = Uuid::now_v7();
        let mut state = self.state();
        state.transaction = TransactionState::Open(id);
        state.tracked_at_begin = Some(state.tracked.clone());
        info!(uow = %self.id, transaction = %id, "Transaction opened");
        Ok(id)
    }

    fn expect_open(&self, id: Uuid, action: &str) -> AppResult<()> {
        let state = self.open_state()?;
        match state.transaction {
            TransactionState::Open(open) if open == id => Ok(()),
            other => Err(AppError::transaction_state(format!(
                "Cannot {action} transaction {id}: state is {other}"
            ))),
        }
    }

    pub(crate) async fn commit(&self, id: Uuid) -> AppResult<()> {
        self.expect_open(id, "commit")?;

        let pending = self.state().staged.len();
        if pending > 0 {
            warn!(
                uow = %self.id,
                transaction = %id,
                pending,
                "Committing with unsaved staged changes; they stay pending"
            );
        }

        let result = self.connection().await?.commit().await;

        let mut state = self.state();
        match result {
            Ok(()) => {
                state.transaction = TransactionState::Committed(id);
                state.tracked_at_begin = None;
                info!(uow = %self.id, transaction = %id, "Transaction committed");
                Ok(())
            }
            Err(err) => {
                state.roll_back_state(id);
                warn!(uow = %self.id, transaction = %id, error = %err, "Transaction commit failed");
                Err(err)
            }
        }
    }

    pub(crate) async fn rollback(&self, id: Uuid) -> AppResult<()> {
        self.expect_open(id, "roll back")?;

        let result = self.connection().await?.rollback().await;

        self.state().roll_back_state(id);
        info!(uow = %self.id, transaction = %id, "Transaction rolled back");
        result
    }

    /// Roll back transaction `id` from a synchronous drop path.
    pub(crate) fn abandon_transaction(&self, id: Uuid) {
        {
            let mut state = self.state();
            if state.transaction != TransactionState::Open(id) {
                return;
            }
            state.roll_back_state(id);
        }
        warn!(uow = %self.id, transaction = %id, "Transaction dropped without commit; rolling back");
        self.abandon_connection(false);
    }

    /// Close the context: roll back an open transaction and release the
    /// connection. Later operations fail.
    pub(crate) async fn close(&self) -> AppResult<()> {
        if !self.mark_closed() {
            return Ok(());
        }

        let mut guard = self.connection.lock().await;
        let result = match guard.as_mut() {
            Some(conn) if conn.in_transaction() => conn.rollback().await,
            _ => Ok(()),
        };
        *guard = None;
        self.rollback_pending.store(false, Ordering::SeqCst);
        info!(uow = %self.id, engine = %self.engine, "Unit of work closed");
        result
    }

    /// Synchronous counterpart of [`DbContext::close`] for drop paths.
    pub(crate) fn release(&self) {
        if self.mark_closed() {
            self.abandon_connection(true);
            debug!(uow = %self.id, "Unit of work released");
        }
    }

    /// Returns `false` when the context was already closed.
    fn mark_closed(&self) -> bool {
        let mut state = self.state();
        if state.closed {
            return false;
        }
        state.closed = true;
        if let Some(id) = state.open_transaction() {
            warn!(uow = %self.id, transaction = %id, "Closing with an open transaction; rolling back");
            state.roll_back_state(id);
        }
        if !state.staged.is_empty() {
            warn!(uow = %self.id, ops = state.staged.len(), "Closing with unsaved staged changes");
            state.staged.clear();
        }
        true
    }

    fn abandon_connection(&self, release: bool) {
        match self.connection.try_lock() {
            Ok(mut guard) => {
                if let Some(conn) = guard.as_mut() {
                    if conn.in_transaction() {
                        conn.abandon();
                    }
                }
                if release {
                    *guard = None;
                }
            }
            Err(_) => self.rollback_pending.store(true, Ordering::SeqCst),
        }
    }
}

fn targets(op: &StagedOp, table: &TableDef, key: &str) -> bool {
    op.table().name == table.name && op.key() == key
}

fn latest_op<'a>(state: &'a ContextState, table: &TableDef, key: &str) -> Option<&'a StagedOp> {
    state.staged.iter().rev().find(|op| targets(op, table, key))
}

/// The version a new update or delete of the row must expect: the one its
/// latest staged operation leaves behind, or the tracked one.
fn expected_version(state: &ContextState, table: &TableDef, key: &str) -> AppResult<u64> {
    match latest_op(state, table, key) {
        Some(StagedOp::Insert { .. }) => Ok(1),
        Some(StagedOp::Update {
            expected_version, ..
        }) => Ok(expected_version + 1),
        Some(StagedOp::Delete { .. }) => Err(AppError::concurrency_conflict(format!(
            "'{}' row '{key}' is staged for deletion",
            table.name
        ))),
        None => tracked_version(state, table, key),
    }
}

fn tracked_version(state: &ContextState, table: &TableDef, key: &str) -> AppResult<u64> {
    state
        .tracked
        .get(&(table.name, key.to_string()))
        .copied()
        .ok_or_else(|| {
            AppError::concurrency_conflict(format!(
                "'{}' row '{key}' is not tracked by this unit of work; load or attach it first",
                table.name
            ))
        })
}
