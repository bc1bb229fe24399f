//! The evaluated form of a specification handed to storage engines.

use std::ops::Range;

use crate::specification::Include;
use crate::types::filter::Criteria;
use crate::types::pagination::PageRequest;
use crate::types::sorting::SortField;

/// A pagination window. Skip and take are always set together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    /// Rows to skip.
    pub skip: u64,
    /// Maximum rows to return.
    pub take: u64,
}

impl Window {
    /// Create a window.
    pub fn new(skip: u64, take: u64) -> Self {
        Self { skip, take }
    }

    /// Index range of this window over `len` ordered rows.
    ///
    /// Never out of bounds: a window past the end is empty.
    pub fn bounds(&self, len: usize) -> Range<usize> {
        let skip = usize::try_from(self.skip).unwrap_or(usize::MAX);
        let take = usize::try_from(self.take).unwrap_or(usize::MAX);
        let start = skip.min(len);
        start..start.saturating_add(take).min(len)
    }
}

impl From<PageRequest> for Window {
    fn from(page: PageRequest) -> Self {
        Self::new(page.offset(), page.limit())
    }
}

/// Everything an engine needs to evaluate a read.
///
/// Engines apply the parts in a fixed order: criteria, includes, ordering
/// (explicit key, then primary key ascending), window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    /// Filter; `None` matches every row.
    pub criteria: Option<Criteria>,
    /// Related rows to attach, in order.
    pub includes: Vec<Include>,
    /// Explicit ordering key.
    pub order: Option<SortField>,
    /// Paging window.
    pub window: Option<Window>,
}

impl Query {
    /// Whether the ordering key points into an included relation.
    pub fn orders_by_include(&self) -> bool {
        self.order.as_ref().is_some_and(|order| {
            self.includes
                .iter()
                .any(|include| order.field.split('.').next() == Some(include.name))
        })
    }
}
