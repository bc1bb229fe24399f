//! Filter-only specifications used for pagination totals.

use std::fmt;
use std::marker::PhantomData;

use crate::result::AppResult;
use crate::specification::{QueryParams, Specification};
use crate::traits::entity::Entity;
use crate::types::filter::Criteria;

/// The filter half of a [`Specification`], used only to count rows.
///
/// There is no way to attach ordering, includes, or paging: none of them
/// change a count.
pub struct CountSpecification<T: Entity> {
    criteria: Option<Criteria>,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> CountSpecification<T> {
    /// Count every row.
    pub fn all() -> Self {
        Self {
            criteria: None,
            _entity: PhantomData,
        }
    }

    /// Count rows satisfying `criteria`.
    pub fn matching(criteria: impl Into<Criteria>) -> Self {
        Self {
            criteria: Some(criteria.into()),
            _entity: PhantomData,
        }
    }

    /// Build from the same parameter object as the paged specification.
    pub fn from_params<P>(params: &P) -> AppResult<Self>
    where
        P: QueryParams<Entity = T>,
    {
        Ok(Self {
            criteria: params.criteria()?,
            _entity: PhantomData,
        })
    }

    /// Mirror the filter of an existing specification.
    pub fn from_specification(spec: &Specification<T>) -> Self {
        Self {
            criteria: spec.criteria().cloned(),
            _entity: PhantomData,
        }
    }

    /// The filter, if any.
    pub fn criteria(&self) -> Option<&Criteria> {
        self.criteria.as_ref()
    }
}

impl<T: Entity> Default for CountSpecification<T> {
    fn default() -> Self {
        Self::all()
    }
}

impl<T: Entity> Clone for CountSpecification<T> {
    fn clone(&self) -> Self {
        Self {
            criteria: self.criteria.clone(),
            _entity: PhantomData,
        }
    }
}

impl<T: Entity> PartialEq for CountSpecification<T> {
    fn eq(&self, other: &Self) -> bool {
        self.criteria == other.criteria
    }
}

impl<T: Entity> fmt::Debug for CountSpecification<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CountSpecification")
            .field("table", &T::table().name)
            .field("criteria", &self.criteria)
            .finish()
    }
}
