//! Generic repository over one entity type.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use shipping_core::specification::Query;
use shipping_core::traits::StoredRow;
use shipping_core::types::pagination::PageResponse;
use shipping_core::{AppError, AppResult, CountSpecification, Entity, QueryParams, Specification};

use crate::context::DbContext;

/// Row count above which an unfiltered `get_all` logs a warning.
const LARGE_RESULT_WARN: usize = 1000;

/// Typed read and staging operations for entity `T`.
///
/// A repository is a view over its unit of work. Reads go to storage
/// straight away; writes are staged and land on the next
/// [`UnitOfWork::save`](crate::UnitOfWork::save).
pub struct GenericRepository<T: Entity> {
    ctx: Arc<DbContext>,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> fmt::Debug for GenericRepository<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenericRepository")
            .field("table", &T::table().name)
            .field("uow", &self.ctx.id())
            .finish()
    }
}

impl<T: Entity> GenericRepository<T> {
    pub(crate) fn new(ctx: Arc<DbContext>) -> Self {
        Self {
            ctx,
            _entity: PhantomData,
        }
    }

    /// Find by primary key. A miss is `Ok(None)`.
    pub async fn get_by_id(&self, key: &T::Key) -> AppResult<Option<T>> {
        let table = T::table();
        let row = self
            .ctx
            .connection()
            .await?
            .fetch_by_key(table, &key.to_string())
            .await?;
        match row {
            Some(row) => {
                self.ctx.track(table, std::slice::from_ref(&row));
                Ok(Some(decode(row)?))
            }
            None => Ok(None),
        }
    }

    /// Find by primary key, turning a miss into `NotFound`.
    pub async fn require_by_id(&self, key: &T::Key) -> AppResult<T> {
        self.get_by_id(key).await?.ok_or_else(|| {
            AppError::not_found(format!("No '{}' row with key '{key}'", T::table().name))
        })
    }

    /// Every row, unfiltered and unpaged.
    pub async fn get_all(&self) -> AppResult<Vec<T>> {
        let rows = self.fetch(&Query::default()).await?;
        if rows.len() > LARGE_RESULT_WARN {
            warn!(
                table = T::table().name,
                rows = rows.len(),
                "Unbounded read returned a large result set"
            );
        }
        rows.into_iter().map(decode).collect()
    }

    /// Rows selected by `spec`: filter, includes, order, then page.
    pub async fn get_all_by_spec(&self, spec: &Specification<T>) -> AppResult<Vec<T>> {
        let rows = self.fetch(&spec.to_query()).await?;
        rows.into_iter().map(decode).collect()
    }

    /// The first row `spec` selects, if any.
    pub async fn get_by_spec(&self, spec: &Specification<T>) -> AppResult<Option<T>> {
        let rows = self.fetch(&spec.first_match_query()).await?;
        rows.into_iter().next().map(decode).transpose()
    }

    /// Number of rows matching the filter of `spec`.
    pub async fn get_count(&self, spec: &CountSpecification<T>) -> AppResult<u64> {
        let table = T::table();
        let count = self
            .ctx
            .connection()
            .await?
            .count(table, spec.criteria())
            .await?;
        debug!(table = table.name, count, "Counted rows");
        Ok(count)
    }

    /// One page of rows plus the total count, both built from `params`.
    pub async fn get_page<P>(&self, params: &P) -> AppResult<PageResponse<T>>
    where
        P: QueryParams<Entity = T>,
    {
        let spec = Specification::from_params(params)?;
        let page = params.paging().page_request();
        let items = self.get_all_by_spec(&spec).await?;
        let total = self.get_count(&spec.count_specification()).await?;
        Ok(PageResponse::new(items, page.page, page.page_size, total))
    }

    /// Stage an insert.
    pub fn add(&self, entity: &T) -> AppResult<()> {
        let (key, body) = encode(entity)?;
        self.ctx.stage_insert(T::table(), key, body)
    }

    /// Stage inserts in order.
    pub fn add_range<'a>(&self, entities: impl IntoIterator<Item = &'a T>) -> AppResult<()> {
        for entity in entities {
            self.add(entity)?;
        }
        Ok(())
    }

    /// Stage an update of a row this unit of work has read or attached.
    ///
    /// Fails with `ConcurrencyConflict` for an untracked entity.
    pub fn update(&self, entity: &T) -> AppResult<()> {
        let (key, body) = encode(entity)?;
        self.ctx.stage_update(T::table(), key, body)
    }

    /// Stage a delete of a row this unit of work has read or attached.
    pub fn delete(&self, entity: &T) -> AppResult<()> {
        self.ctx.stage_delete(T::table(), entity.key().to_string())
    }

    /// Stage deletes in order.
    pub fn delete_range<'a>(&self, entities: impl IntoIterator<Item = &'a T>) -> AppResult<()> {
        for entity in entities {
            self.delete(entity)?;
        }
        Ok(())
    }

    /// Start tracking an entity loaded elsewhere at its current stored
    /// version, so it can be updated or deleted here.
    pub async fn attach(&self, entity: &T) -> AppResult<()> {
        let table = T::table();
        let key = entity.key().to_string();
        let row = self
            .ctx
            .connection()
            .await?
            .fetch_by_key(table, &key)
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!("Cannot attach '{}' row '{key}': it does not exist", table.name))
            })?;
        self.ctx.track(table, std::slice::from_ref(&row));
        debug!(table = table.name, key = %key, version = row.version, "Attached entity");
        Ok(())
    }

    async fn fetch(&self, query: &Query) -> AppResult<Vec<StoredRow>> {
        let table = T::table();
        let rows = self.ctx.connection().await?.fetch(table, query).await?;
        self.ctx.track(table, &rows);
        Ok(rows)
    }
}

fn encode<T: Entity>(entity: &T) -> AppResult<(String, Value)> {
    let mut body = serde_json::to_value(entity)?;
    T::table().strip_navigations(&mut body);
    Ok((entity.key().to_string(), body))
}

fn decode<T: Entity>(row: StoredRow) -> AppResult<T> {
    Ok(serde_json::from_value(row.body)?)
}
