//! Typed query-parameter objects.

use serde::{Deserialize, Serialize};

use crate::result::AppResult;
use crate::specification::Include;
use crate::traits::entity::Entity;
use crate::types::filter::Criteria;
use crate::types::pagination::PageRequest;

/// Paging and sorting fields shared by every parameter object.
///
/// Deserializes from the camelCase query string used by the admin front
/// end: `pageIndex`, `pageSize`, `sort`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagingParams {
    /// 1-based page index (default 1).
    #[serde(default)]
    pub page_index: Option<u64>,
    /// Page size (default 10, clamped to 1..=100).
    #[serde(default)]
    pub page_size: Option<u64>,
    /// Sort string of the form `"{field}_{asc|desc}"`.
    #[serde(default)]
    pub sort: Option<String>,
}

impl PagingParams {
    /// Paging on page `page_index` of `page_size` rows.
    pub fn new(page_index: u64, page_size: u64) -> Self {
        Self {
            page_index: Some(page_index),
            page_size: Some(page_size),
            sort: None,
        }
    }

    /// Set the sort string.
    pub fn sorted(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    /// Resolve defaults and clamp into a page request.
    pub fn page_request(&self) -> PageRequest {
        PageRequest::from_optional(self.page_index, self.page_size)
    }
}

/// A parameter object that specifications can be built from.
///
/// [`QueryParams::criteria`] is the single source of the filter for both
/// the paged [`Specification`](crate::Specification) and its paired
/// [`CountSpecification`](crate::CountSpecification), so the two cannot
/// select different rows.
pub trait QueryParams: Send + Sync {
    /// The entity being listed.
    type Entity: Entity;

    /// Accepted sort names mapped to document paths.
    ///
    /// Names are matched case-insensitively. Anything else is ignored.
    const SORT_KEYS: &'static [(&'static str, &'static str)];

    /// Paging and sorting inputs.
    fn paging(&self) -> &PagingParams;

    /// The filter built from this object's fields.
    fn criteria(&self) -> AppResult<Option<Criteria>>;

    /// Related rows listings of this entity always attach.
    fn includes(&self) -> Vec<Include> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camel_case_wire_names() {
        let params: PagingParams =
            serde_json::from_str(r#"{"pageIndex": 2, "pageSize": 25, "sort": "name_desc"}"#)
                .expect("deserialize");
        assert_eq!(params.page_index, Some(2));
        assert_eq!(params.page_size, Some(25));
        assert_eq!(params.sort.as_deref(), Some("name_desc"));
    }

    #[test]
    fn test_defaults() {
        let params: PagingParams = serde_json::from_str("{}").expect("deserialize");
        assert_eq!(params.page_request(), PageRequest::new(1, 10));
    }
}
