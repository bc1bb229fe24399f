//! Explicit transaction handles.

use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

use shipping_core::AppResult;

use crate::context::DbContext;

/// Lifecycle of the transaction on a unit of work.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TransactionState {
    /// No transaction was begun yet.
    #[default]
    NotStarted,
    /// A transaction is open. Saves are not durable until it commits.
    Open(Uuid),
    /// The last transaction committed.
    Committed(Uuid),
    /// The last transaction rolled back, explicitly or by being dropped.
    RolledBack(Uuid),
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotStarted => write!(f, "not started"),
            Self::Open(id) => write!(f, "open ({id})"),
            Self::Committed(id) => write!(f, "committed ({id})"),
            Self::RolledBack(id) => write!(f, "rolled back ({id})"),
        }
    }
}

/// A scoped transaction on a [`UnitOfWork`](super::UnitOfWork).
///
/// Every `save` made while the handle is alive joins the transaction.
/// `commit` and `rollback` consume the handle. Dropping it without either
/// rolls the transaction back.
#[must_use = "dropping a transaction rolls it back"]
pub struct Transaction {
    ctx: Arc<DbContext>,
    id: Uuid,
    finished: bool,
}

impl Transaction {
    pub(crate) fn new(ctx: Arc<DbContext>, id: Uuid) -> Self {
        Self {
            ctx,
            id,
            finished: false,
        }
    }

    /// Transaction identifier, as logged.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Make every write saved since `begin_transaction` durable.
    ///
    /// Staged operations that were never saved are not part of the commit;
    /// they stay pending on the unit of work.
    pub async fn commit(mut self) -> AppResult<()> {
        let result = self.ctx.commit(self.id).await;
        self.finished = true;
        result
    }

    /// Undo every write saved since `begin_transaction` and drop the
    /// pending staged operations.
    pub async fn rollback(mut self) -> AppResult<()> {
        let result = self.ctx.rollback(self.id).await;
        self.finished = true;
        result
    }
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .field("uow", &self.ctx.id())
            .field("finished", &self.finished)
            .finish()
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if !self.finished {
            self.ctx.abandon_transaction(self.id);
        }
    }
}
