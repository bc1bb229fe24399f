//! Query specifications.
//!
//! A [`Specification`] describes which rows of an entity to read, which
//! related rows to attach, in what order, and which page. A
//! [`CountSpecification`] carries only the filter and is used to compute
//! the total behind a paged listing. Building either never touches
//! storage; repositories evaluate them later.

pub mod builder;
pub mod count;
pub mod include;
pub mod params;
pub mod query;

use std::fmt;
use std::marker::PhantomData;

use tracing::debug;

pub use builder::CriteriaBuilder;
pub use count::CountSpecification;
pub use include::{Include, IncludeKind};
pub use params::{PagingParams, QueryParams};
pub use query::{Query, Window};

use crate::result::AppResult;
use crate::traits::entity::Entity;
use crate::types::filter::Criteria;
use crate::types::pagination::PageRequest;
use crate::types::sorting::SortField;

/// A composable description of filter, includes, ordering, and paging
/// for entity type `T`.
pub struct Specification<T: Entity> {
    criteria: Option<Criteria>,
    includes: Vec<Include>,
    order: Option<SortField>,
    window: Option<Window>,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> Specification<T> {
    /// Match every row, no ordering, no paging.
    pub fn all() -> Self {
        Self {
            criteria: None,
            includes: Vec::new(),
            order: None,
            window: None,
            _entity: PhantomData,
        }
    }

    /// Match rows satisfying `criteria`.
    pub fn matching(criteria: impl Into<Criteria>) -> Self {
        Self {
            criteria: Some(criteria.into()),
            ..Self::all()
        }
    }

    /// Build from a typed parameter object.
    ///
    /// The filter comes from [`QueryParams::criteria`], the ordering from
    /// the `sort` string (unknown fields are ignored), and the window from
    /// the page index and size.
    pub fn from_params<P>(params: &P) -> AppResult<Self>
    where
        P: QueryParams<Entity = T>,
    {
        let paging = params.paging();
        let mut spec = Self {
            criteria: params.criteria()?,
            order: paging
                .sort
                .as_deref()
                .and_then(|sort| resolve_sort(P::SORT_KEYS, sort)),
            window: Some(Window::from(paging.page_request())),
            ..Self::all()
        };
        for include in params.includes() {
            spec = spec.include(include);
        }
        Ok(spec)
    }

    /// Attach a related entity to every result. Repeats are ignored.
    pub fn include(mut self, include: Include) -> Self {
        if !self.includes.iter().any(|i| i.name == include.name) {
            self.includes.push(include);
        }
        self
    }

    /// Order ascending by `field`, replacing any previous ordering.
    pub fn order_by(mut self, field: impl Into<String>) -> Self {
        self.order = Some(SortField::asc(field));
        self
    }

    /// Order descending by `field`, replacing any previous ordering.
    pub fn order_by_descending(mut self, field: impl Into<String>) -> Self {
        self.order = Some(SortField::desc(field));
        self
    }

    /// Restrict results to one page.
    pub fn paginate(mut self, page: PageRequest) -> Self {
        self.window = Some(Window::from(page));
        self
    }

    /// The filter, if any.
    pub fn criteria(&self) -> Option<&Criteria> {
        self.criteria.as_ref()
    }

    /// The includes, in load order.
    pub fn includes(&self) -> &[Include] {
        &self.includes
    }

    /// The explicit ordering, if any.
    pub fn order(&self) -> Option<&SortField> {
        self.order.as_ref()
    }

    /// The paging window, if any.
    pub fn window(&self) -> Option<Window> {
        self.window
    }

    /// A count specification selecting exactly the rows this one filters.
    pub fn count_specification(&self) -> CountSpecification<T> {
        CountSpecification::from_specification(self)
    }

    /// The evaluated form handed to a storage engine.
    pub fn to_query(&self) -> Query {
        Query {
            criteria: self.criteria.clone(),
            includes: self.includes.clone(),
            order: self.order.clone(),
            window: self.window,
        }
    }

    /// The query for "first match": same pipeline, at most one row.
    pub fn first_match_query(&self) -> Query {
        let skip = self.window.map_or(0, |w| w.skip);
        Query {
            window: Some(Window::new(skip, 1)),
            ..self.to_query()
        }
    }
}

impl<T: Entity> Default for Specification<T> {
    fn default() -> Self {
        Self::all()
    }
}

impl<T: Entity> Clone for Specification<T> {
    fn clone(&self) -> Self {
        Self {
            criteria: self.criteria.clone(),
            includes: self.includes.clone(),
            order: self.order.clone(),
            window: self.window,
            _entity: PhantomData,
        }
    }
}

impl<T: Entity> fmt::Debug for Specification<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Specification")
            .field("table", &T::table().name)
            .field("criteria", &self.criteria)
            .field("includes", &self.includes.iter().map(|i| i.name).collect::<Vec<_>>())
            .field("order", &self.order)
            .field("window", &self.window)
            .finish()
    }
}

/// Map a `"{field}_{direction}"` sort string onto a whitelisted path.
fn resolve_sort(keys: &[(&str, &str)], sort: &str) -> Option<SortField> {
    let requested = SortField::parse(sort)?;
    let resolved = keys
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(&requested.field))
        .map(|(_, path)| SortField::new(*path, requested.direction));

    if resolved.is_none() {
        debug!(sort, "Ignoring unknown sort field");
    }
    resolved
}
