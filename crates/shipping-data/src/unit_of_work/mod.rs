//! Unit of work: one storage connection, cached repositories, and
//! transaction scoping for one logical request.

mod transaction;

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;
use uuid::Uuid;

use shipping_core::traits::StorageEngine;
use shipping_core::{AppResult, Entity};

use crate::context::DbContext;
use crate::repository::GenericRepository;

pub use transaction::{Transaction, TransactionState};

/// Coordinates repositories and transactions over one storage connection.
///
/// A unit of work is request-scoped and must not be shared between
/// concurrent logical operations. Close it with [`UnitOfWork::close`];
/// dropping it instead rolls back an open transaction synchronously.
pub struct UnitOfWork {
    ctx: Arc<DbContext>,
    repositories: DashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl UnitOfWork {
    /// Open a unit of work with a fresh connection from `engine`.
    pub async fn open(engine: &dyn StorageEngine) -> AppResult<Self> {
        let connection = engine.connect().await?;
        let ctx = Arc::new(DbContext::new(engine.name(), connection));
        debug!(uow = %ctx.id(), engine = engine.name(), "Unit of work opened");
        Ok(Self {
            ctx,
            repositories: DashMap::new(),
        })
    }

    /// Unit of work identifier, as logged.
    pub fn id(&self) -> Uuid {
        self.ctx.id()
    }

    /// The repository for `T`, created on first request and cached for the
    /// lifetime of this unit of work.
    pub fn repository<T: Entity>(&self) -> Arc<GenericRepository<T>> {
        let cached = {
            let entry = self.repositories.entry(TypeId::of::<T>()).or_insert_with(|| {
                debug!(uow = %self.ctx.id(), table = T::table().name, "Created repository");
                Arc::new(GenericRepository::<T>::new(Arc::clone(&self.ctx)))
            });
            Arc::clone(&*entry)
        };
        cached
            .downcast::<GenericRepository<T>>()
            .unwrap_or_else(|_| Arc::new(GenericRepository::new(Arc::clone(&self.ctx))))
    }

    /// Flush every staged change across all repositories in one atomic
    /// batch. Returns the number of affected rows.
    ///
    /// Inside a transaction the writes become durable only on commit.
    pub async fn save(&self) -> AppResult<u64> {
        self.ctx.save().await
    }

    /// Open a transaction spanning later `save` calls.
    ///
    /// Fails with `TransactionState` while another transaction is open.
    pub async fn begin_transaction(&self) -> AppResult<Transaction> {
        let id = self.ctx.begin().await?;
        Ok(Transaction::new(Arc::clone(&self.ctx), id))
    }

    /// The state of the most recent transaction.
    pub fn transaction_state(&self) -> TransactionState {
        self.ctx.transaction_state()
    }

    /// Whether any staged change is waiting for `save`.
    pub fn has_changes(&self) -> bool {
        self.ctx.has_changes()
    }

    /// Drop every staged change without saving it.
    pub fn discard_changes(&self) {
        self.ctx.discard_changes();
    }

    /// Roll back an open transaction and release the connection.
    ///
    /// Repositories obtained from this unit of work fail afterwards.
    pub async fn close(self) -> AppResult<()> {
        self.ctx.close().await
    }
}

impl fmt::Debug for UnitOfWork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitOfWork")
            .field("ctx", &self.ctx)
            .field("repositories", &self.repositories.len())
            .finish()
    }
}

impl Drop for UnitOfWork {
    fn drop(&mut self) {
        self.ctx.release();
    }
}
